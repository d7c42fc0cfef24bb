//! Graph representation: nodes, edges, sentinels.
//!
//! A [`Graph`] is the static shape behind a compiled workflow: node
//! transforms keyed by name, outgoing edges per node, the entry point, and
//! the state schema. It is usually built through
//! [`StateGraph`](crate::builder::StateGraph) rather than assembled by hand.
//!
//! Node *registration order* is recorded alongside the node map and is load
//! bearing: the engine executes frontiers and merges partial updates in
//! that order, which is what makes append-channel output deterministic
//! across parallel branches.

use crate::error::{GraphError, Result};
use crate::state::StateSchema;
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Node identifier.
pub type NodeId = String;

/// Virtual source of the entry edge.
pub const START: &str = "__start__";

/// Terminal sentinel: an edge or branch pointing here ends that path.
pub const END: &str = "__end__";

/// A node's transform: full state in, partial update out.
pub type NodeExecutor =
    Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// A conditional edge's router: pure function of the merged state,
/// returning a branch label.
pub type Router = Arc<dyn Fn(&Value) -> String + Send + Sync>;

/// A named node and its transform.
#[derive(Clone)]
pub struct NodeSpec {
    pub name: NodeId,
    pub executor: NodeExecutor,
}

impl std::fmt::Debug for NodeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeSpec").field("name", &self.name).finish()
    }
}

/// Outgoing transition from a node.
#[derive(Clone)]
pub enum Edge {
    /// Always taken. Several direct edges from one node form a fan-out.
    Direct(NodeId),
    /// Router-driven: the label returned by `router` is looked up in
    /// `branches`; an unmapped label aborts the run with
    /// [`GraphError::UnknownRoute`].
    Conditional {
        router: Router,
        branches: HashMap<String, NodeId>,
    },
}

impl std::fmt::Debug for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Edge::Direct(to) => f.debug_tuple("Direct").field(to).finish(),
            Edge::Conditional { branches, .. } => f
                .debug_struct("Conditional")
                .field("router", &"<fn>")
                .field("branches", branches)
                .finish(),
        }
    }
}

/// Static structure of one workflow.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: HashMap<NodeId, NodeSpec>,
    /// Node names in registration order; index = merge priority.
    order: Vec<NodeId>,
    edges: HashMap<NodeId, Vec<Edge>>,
    entry: Option<NodeId>,
    schema: StateSchema,
}

impl Graph {
    pub fn new(schema: StateSchema) -> Self {
        Self {
            schema,
            ..Self::default()
        }
    }

    pub fn add_node(&mut self, spec: NodeSpec) {
        if !self.nodes.contains_key(&spec.name) {
            self.order.push(spec.name.clone());
        }
        self.nodes.insert(spec.name.clone(), spec);
    }

    pub fn add_edge(&mut self, from: NodeId, edge: Edge) {
        self.edges.entry(from).or_default().push(edge);
    }

    pub fn set_entry(&mut self, node: NodeId) {
        self.entry = Some(node);
    }

    pub fn entry(&self) -> Option<&NodeId> {
        self.entry.as_ref()
    }

    pub fn schema(&self) -> &StateSchema {
        &self.schema
    }

    pub fn node(&self, name: &str) -> Option<&NodeSpec> {
        self.nodes.get(name)
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edges_from(&self, name: &str) -> &[Edge] {
        self.edges.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Merge priority of a node: its registration index.
    pub fn order_index(&self, name: &str) -> usize {
        self.order.iter().position(|n| n == name).unwrap_or(usize::MAX)
    }

    /// Sort a set of node names into registration order, dropping
    /// duplicates. Used to normalize frontiers.
    pub fn normalize_frontier(&self, names: &[NodeId]) -> Vec<NodeId> {
        let mut seen: Vec<NodeId> = Vec::new();
        for name in names {
            if !seen.contains(name) {
                seen.push(name.clone());
            }
        }
        seen.sort_by_key(|n| self.order_index(n));
        seen
    }

    /// Structural validation, run once at compile time.
    pub fn validate(&self) -> Result<()> {
        let entry = self
            .entry
            .as_ref()
            .ok_or_else(|| GraphError::Validation("no entry point declared".into()))?;

        if !self.has_node(entry) {
            return Err(GraphError::Validation(format!(
                "entry point '{entry}' is not a registered node"
            )));
        }

        for (from, edges) in &self.edges {
            if !self.has_node(from) && from != START {
                return Err(GraphError::Validation(format!(
                    "edge source '{from}' is not a registered node"
                )));
            }
            for edge in edges {
                match edge {
                    Edge::Direct(to) => {
                        if !self.has_node(to) && to != END {
                            return Err(GraphError::Validation(format!(
                                "edge target '{to}' is not a registered node"
                            )));
                        }
                    }
                    Edge::Conditional { branches, .. } => {
                        if branches.is_empty() {
                            return Err(GraphError::Validation(format!(
                                "conditional edge from '{from}' has no branches"
                            )));
                        }
                        for to in branches.values() {
                            if !self.has_node(to) && to != END {
                                return Err(GraphError::Validation(format!(
                                    "branch target '{to}' is not a registered node"
                                )));
                            }
                        }
                    }
                }
            }
        }

        // Every node must participate: be the entry or touch an edge.
        for name in &self.order {
            if name == entry {
                continue;
            }
            let connected = self.edges.contains_key(name)
                || self.edges.values().flatten().any(|edge| match edge {
                    Edge::Direct(to) => to == name,
                    Edge::Conditional { branches, .. } => {
                        branches.values().any(|to| to == name)
                    }
                });
            if !connected {
                return Err(GraphError::Validation(format!(
                    "node '{name}' is not connected to the graph"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(name: &str) -> NodeSpec {
        NodeSpec {
            name: name.to_string(),
            executor: Arc::new(|_| Box::pin(async { Ok(serde_json::json!({})) })),
        }
    }

    #[test]
    fn validate_requires_entry() {
        let graph = Graph::new(StateSchema::new());
        assert!(matches!(graph.validate(), Err(GraphError::Validation(_))));
    }

    #[test]
    fn validate_rejects_unknown_edge_target() {
        let mut graph = Graph::new(StateSchema::new());
        graph.add_node(noop("a"));
        graph.set_entry("a".into());
        graph.add_edge("a".into(), Edge::Direct("missing".into()));
        assert!(graph.validate().is_err());
    }

    #[test]
    fn validate_rejects_orphan_node() {
        let mut graph = Graph::new(StateSchema::new());
        graph.add_node(noop("a"));
        graph.add_node(noop("island"));
        graph.set_entry("a".into());
        graph.add_edge("a".into(), Edge::Direct(END.into()));
        assert!(graph.validate().is_err());
    }

    #[test]
    fn validate_accepts_end_targets() {
        let mut graph = Graph::new(StateSchema::new());
        graph.add_node(noop("a"));
        graph.set_entry("a".into());
        graph.add_edge("a".into(), Edge::Direct(END.into()));
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn normalize_frontier_uses_registration_order() {
        let mut graph = Graph::new(StateSchema::new());
        for name in ["planner", "market", "tech", "risk"] {
            graph.add_node(noop(name));
        }

        let frontier = graph.normalize_frontier(&[
            "risk".into(),
            "market".into(),
            "risk".into(),
            "tech".into(),
        ]);
        assert_eq!(frontier, vec!["market", "tech", "risk"]);
    }
}
