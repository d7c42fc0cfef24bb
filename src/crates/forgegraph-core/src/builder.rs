//! [`StateGraph`] - the graph construction API.
//!
//! Register channels, nodes, and edges; declare the entry point and the
//! interrupt set; then [`compile`](StateGraph::compile) into an immutable
//! [`CompiledGraph`](crate::compiled::CompiledGraph).
//!
//! ```rust,no_run
//! use forgegraph_core::{MergePolicy, StateGraph, END};
//! use serde_json::{json, Value};
//!
//! # fn build() -> forgegraph_core::Result<()> {
//! let mut graph = StateGraph::new();
//! graph
//!     .add_channel("documents", MergePolicy::Replace)
//!     .add_node("retrieve", |_state: Value| async move {
//!         Ok(json!({"documents": ["..."]}))
//!     })
//!     .add_node("generate", |_state: Value| async move {
//!         Ok(json!({"generation": "..."}))
//!     })
//!     .set_entry_point("retrieve")
//!     .add_conditional_edges(
//!         "retrieve",
//!         |state: &Value| {
//!             if state["documents"].as_array().is_some_and(|d| d.is_empty()) {
//!                 "done".to_string()
//!             } else {
//!                 "generate".to_string()
//!             }
//!         },
//!         [("generate", "generate"), ("done", END)],
//!     )
//!     .add_edge("generate", END);
//!
//! let compiled = graph.compile()?;
//! # Ok(())
//! # }
//! ```

use crate::compiled::CompiledGraph;
use crate::error::Result;
use crate::graph::{Edge, Graph, NodeExecutor, NodeId, NodeSpec, Router, START};
use crate::state::{MergePolicy, Reducer, StateSchema};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Mutable builder for a workflow graph.
#[derive(Default)]
pub struct StateGraph {
    schema: StateSchema,
    nodes: Vec<NodeSpec>,
    edges: Vec<(NodeId, Edge)>,
    entry: Option<NodeId>,
    interrupt_before: Vec<NodeId>,
}

impl StateGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a state channel and its merge policy. Channels never named
    /// here default to [`MergePolicy::Replace`].
    pub fn add_channel(&mut self, name: impl Into<String>, policy: MergePolicy) -> &mut Self {
        self.schema.add_channel(name, policy);
        self
    }

    /// Declare a channel with a custom reducer.
    pub fn add_channel_with_reducer(
        &mut self,
        name: impl Into<String>,
        reducer: Arc<dyn Reducer>,
    ) -> &mut Self {
        self.schema.add_channel_with_reducer(name, reducer);
        self
    }

    /// Register a node. The transform receives the full pre-superstep state
    /// and returns a partial update containing only the channels it writes
    /// (`{}` or `null` for none). Re-registering a name replaces the
    /// transform but keeps the original registration order.
    pub fn add_node<F, Fut>(&mut self, name: impl Into<NodeId>, node: F) -> &mut Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        let executor: NodeExecutor = Arc::new(move |state| Box::pin(node(state)));
        self.add_node_with_executor(name, executor)
    }

    /// Register a node from a pre-built executor (useful when the closure
    /// is assembled elsewhere).
    pub fn add_node_with_executor(
        &mut self,
        name: impl Into<NodeId>,
        executor: NodeExecutor,
    ) -> &mut Self {
        let name = name.into();
        self.nodes.push(NodeSpec { name, executor });
        self
    }

    /// Add an unconditional edge. Several edges from one node fan out to
    /// parallel branches. `from = START` is shorthand for
    /// [`set_entry_point`](Self::set_entry_point).
    pub fn add_edge(&mut self, from: impl Into<NodeId>, to: impl Into<NodeId>) -> &mut Self {
        let from = from.into();
        let to = to.into();
        if from == START {
            return self.set_entry_point(to);
        }
        self.edges.push((from, Edge::Direct(to)));
        self
    }

    /// Add a router-driven edge. `branches` maps each label the router may
    /// return to a destination node (or [`END`](crate::graph::END)).
    pub fn add_conditional_edges<R, B, L, T>(
        &mut self,
        from: impl Into<NodeId>,
        router: R,
        branches: B,
    ) -> &mut Self
    where
        R: Fn(&Value) -> String + Send + Sync + 'static,
        B: IntoIterator<Item = (L, T)>,
        L: Into<String>,
        T: Into<NodeId>,
    {
        let router: Router = Arc::new(router);
        let branches: HashMap<String, NodeId> = branches
            .into_iter()
            .map(|(label, to)| (label.into(), to.into()))
            .collect();
        self.edges
            .push((from.into(), Edge::Conditional { router, branches }));
        self
    }

    /// Declare where execution starts.
    pub fn set_entry_point(&mut self, node: impl Into<NodeId>) -> &mut Self {
        self.entry = Some(node.into());
        self
    }

    /// Declare nodes the engine must pause *before* executing. The paused
    /// run keeps them in `next` until an explicit resume.
    pub fn interrupt_before<I, T>(&mut self, nodes: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        T: Into<NodeId>,
    {
        self.interrupt_before.extend(nodes.into_iter().map(Into::into));
        self
    }

    /// Validate and freeze the graph.
    pub fn compile(self) -> Result<CompiledGraph> {
        let mut graph = Graph::new(self.schema);
        for spec in self.nodes {
            graph.add_node(spec);
        }
        for (from, edge) in self.edges {
            graph.add_edge(from, edge);
        }
        if let Some(entry) = self.entry {
            graph.set_entry(entry);
        }
        graph.validate()?;

        for node in &self.interrupt_before {
            if !graph.has_node(node) {
                return Err(crate::error::GraphError::Validation(format!(
                    "interrupt node '{node}' is not a registered node"
                )));
            }
        }

        Ok(CompiledGraph::new(graph, self.interrupt_before))
    }
}
