//! The compiled, executable form of a workflow graph.
//!
//! [`CompiledGraph`] is produced by [`StateGraph::compile`]
//! (crate::builder::StateGraph::compile) and is immutable: the node table,
//! edge table, schema, and interrupt set are frozen. Runtime concerns
//! (checkpointer, recursion limit, per-node timeout, node error policy)
//! attach afterwards through the `with_*` builders, so one graph definition
//! can serve many differently configured instances.
//!
//! Execution entry points live in [`execution`]: [`CompiledGraph::run`] for
//! thread-scoped, checkpointed execution with pause/resume, and
//! [`CompiledGraph::invoke`] for one-shot runs.

mod execution;

use crate::error::{GraphError, Result};
use crate::graph::{Graph, NodeId};
use forgegraph_checkpoint::{Checkpoint, CheckpointSource, Checkpointer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Default superstep ceiling; guards against routers that loop forever.
pub const DEFAULT_RECURSION_LIMIT: usize = 25;

/// Caller-supplied policy for failed nodes: given the node name, the error,
/// and the pre-superstep state, optionally return a fallback partial update
/// to merge in place of the node's output. Returning `None` aborts the run.
pub type NodeErrorHandler =
    Arc<dyn Fn(&str, &GraphError, &Value) -> Option<Value> + Send + Sync>;

/// How a `run()` finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Every branch reached a terminal node.
    Complete,
    /// Execution halted before an interrupt node; resume with
    /// `run(thread_id, None)`.
    Paused,
}

/// Outcome of one `run()` invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub status: RunStatus,
    /// Merged state at completion or at the pause point.
    pub state: Value,
    /// Nodes still pending (empty when complete).
    pub pending_nodes: Vec<NodeId>,
}

impl RunResult {
    pub(crate) fn complete(state: Value) -> Self {
        Self {
            status: RunStatus::Complete,
            state,
            pending_nodes: Vec::new(),
        }
    }

    pub(crate) fn paused(state: Value, pending_nodes: Vec<NodeId>) -> Self {
        Self {
            status: RunStatus::Paused,
            state,
            pending_nodes,
        }
    }

    /// True when the run is waiting on an external resume.
    pub fn is_paused(&self) -> bool {
        self.status == RunStatus::Paused
    }
}

/// Snapshot returned by [`CompiledGraph::get_state`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub state: Value,
    pub next: Vec<NodeId>,
}

/// An immutable, runnable workflow graph.
#[derive(Clone)]
pub struct CompiledGraph {
    pub(crate) graph: Arc<Graph>,
    pub(crate) interrupt_before: HashSet<NodeId>,
    pub(crate) checkpointer: Option<Arc<dyn Checkpointer>>,
    pub(crate) recursion_limit: usize,
    pub(crate) node_timeout: Option<Duration>,
    pub(crate) on_node_error: Option<NodeErrorHandler>,
    /// Thread ids with a run in flight; guards against caller reentrancy.
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl CompiledGraph {
    pub(crate) fn new(graph: Graph, interrupt_before: Vec<NodeId>) -> Self {
        Self {
            graph: Arc::new(graph),
            interrupt_before: interrupt_before.into_iter().collect(),
            checkpointer: None,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            node_timeout: None,
            on_node_error: None,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Attach a checkpoint store. Required for [`run`](Self::run),
    /// [`get_state`](Self::get_state), and
    /// [`update_state`](Self::update_state).
    pub fn with_checkpointer(mut self, checkpointer: Arc<dyn Checkpointer>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    /// Override the superstep ceiling (default
    /// [`DEFAULT_RECURSION_LIMIT`]).
    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    /// Bound each node execution. Unset by default: latency control is
    /// normally the node's own concern (its collaborator carries the
    /// timeout), this is the engine-level backstop.
    pub fn with_node_timeout(mut self, timeout: Duration) -> Self {
        self.node_timeout = Some(timeout);
        self
    }

    /// Install a fallback policy for failed nodes; see [`NodeErrorHandler`].
    pub fn with_node_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str, &GraphError, &Value) -> Option<Value> + Send + Sync + 'static,
    {
        self.on_node_error = Some(Arc::new(handler));
        self
    }

    /// The node where fresh runs begin.
    pub fn entry_point(&self) -> &str {
        self.graph
            .entry()
            .map(String::as_str)
            .expect("compiled graph always has an entry point")
    }

    /// Latest persisted state and pending nodes for a thread, for pollers
    /// deciding whether a run is paused and where.
    pub async fn get_state(&self, thread_id: &str) -> Result<Option<StateSnapshot>> {
        let checkpointer = self.require_checkpointer()?;
        Ok(checkpointer.get(thread_id).await?.map(|ckpt| StateSnapshot {
            state: ckpt.state,
            next: ckpt.next,
        }))
    }

    /// Merge `partial` into the persisted state as if `as_node` had just
    /// produced it, without executing that node's transform. `next` is left
    /// unchanged, so a subsequent `run(thread_id, None)` re-enters at the
    /// paused node and its routers see the injected values. This is how an
    /// external approver's decision becomes visible to the router guarding
    /// resumption.
    pub async fn update_state(
        &self,
        thread_id: &str,
        partial: Value,
        as_node: &str,
    ) -> Result<()> {
        let checkpointer = self.require_checkpointer()?;
        if !self.graph.has_node(as_node) {
            return Err(GraphError::Validation(format!(
                "cannot update state as unknown node '{as_node}'"
            )));
        }

        let Some(ckpt) = checkpointer.get(thread_id).await? else {
            return Err(GraphError::NoCheckpoint {
                thread_id: thread_id.to_string(),
            });
        };

        let mut state = ckpt.state;
        self.graph.schema().apply_as_node(&mut state, &partial, as_node)?;

        tracing::debug!(thread_id, as_node, "external state update");
        checkpointer
            .put(
                thread_id,
                Checkpoint::new(state, ckpt.next, ckpt.step, CheckpointSource::Update),
            )
            .await?;
        Ok(())
    }

    pub(crate) fn require_checkpointer(&self) -> Result<&Arc<dyn Checkpointer>> {
        self.checkpointer.as_ref().ok_or_else(|| {
            GraphError::Execution(
                "this operation requires a checkpointer; attach one with with_checkpointer()"
                    .into(),
            )
        })
    }

    /// Mark `thread_id` as running; the returned guard releases it on drop.
    pub(crate) fn acquire_thread(&self, thread_id: &str) -> Result<RunGuard> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !in_flight.insert(thread_id.to_string()) {
            return Err(GraphError::ConcurrentRun {
                thread_id: thread_id.to_string(),
            });
        }
        Ok(RunGuard {
            in_flight: Arc::clone(&self.in_flight),
            thread_id: thread_id.to_string(),
        })
    }
}

impl std::fmt::Debug for CompiledGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledGraph")
            .field("nodes", &self.graph.node_count())
            .field("interrupt_before", &self.interrupt_before)
            .field("recursion_limit", &self.recursion_limit)
            .finish()
    }
}

/// Releases the per-thread reentrancy slot when a run finishes or fails.
pub(crate) struct RunGuard {
    in_flight: Arc<Mutex<HashSet<String>>>,
    thread_id: String,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        in_flight.remove(&self.thread_id);
    }
}
