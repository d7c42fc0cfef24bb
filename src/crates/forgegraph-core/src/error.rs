//! Engine error taxonomy.
//!
//! Engine-level failures abort the whole run and leave the last persisted
//! checkpoint untouched: a failed superstep is never committed, so retrying
//! `run()` resumes from the last good state.

use crate::llm::CollaboratorError;
use crate::state::StateError;
use forgegraph_checkpoint::CheckpointError;
use serde_json::Value;
use thiserror::Error;

/// Errors produced while building or executing a graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The graph structure is malformed (unknown edge target, missing entry
    /// point, orphan node, …). Raised at compile time.
    #[error("graph validation failed: {0}")]
    Validation(String),

    /// A router returned a label with no registered destination. Fatal:
    /// carries the offending node and label.
    #[error("node '{node}' routed to unknown label '{label}'")]
    UnknownRoute { node: String, label: String },

    /// The superstep ceiling was exceeded, which almost always means a
    /// router is looping. Carries the last merged state for diagnosis; the
    /// checkpoint store still holds the last completed superstep.
    #[error("recursion limit of {limit} supersteps exceeded")]
    GraphRecursion { limit: usize, state: Box<Value> },

    /// A node's transform failed (or timed out) and no fallback update was
    /// supplied by the configured error handler.
    #[error("node '{node}' execution failed: {error}")]
    NodeExecution { node: String, error: String },

    /// `invoke()` hit an interrupt point. Only `run()` with a checkpointer
    /// can pause and later resume.
    #[error("execution interrupted before {nodes:?}; use run() with a checkpointer to pause")]
    Interrupted { nodes: Vec<String> },

    /// A second `run()` was issued for a thread id that already has a run
    /// in flight. Caller bug: serialize calls per thread.
    #[error("a run is already in flight for thread '{thread_id}'")]
    ConcurrentRun { thread_id: String },

    /// `run(thread_id, None)` was called but the thread has never been
    /// checkpointed, so there is nothing to resume.
    #[error("no checkpoint recorded for thread '{thread_id}'")]
    NoCheckpoint { thread_id: String },

    /// Checkpoint storage failed.
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    /// A state merge was rejected (non-object update, append onto a
    /// non-array, …).
    #[error(transparent)]
    State(#[from] StateError),

    /// An external collaborator (model, retriever, queue) failed and the
    /// node chose to propagate instead of degrading.
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    /// Anything else that stops execution.
    #[error("execution failed: {0}")]
    Execution(String),
}

impl GraphError {
    /// Convenience constructor used by node implementations.
    pub fn node_execution(node: impl Into<String>, error: impl std::fmt::Display) -> Self {
        GraphError::NodeExecution {
            node: node.into(),
            error: error.to_string(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_route_names_node_and_label() {
        let err = GraphError::UnknownRoute {
            node: "grade".into(),
            label: "retry".into(),
        };
        let text = err.to_string();
        assert!(text.contains("grade"));
        assert!(text.contains("retry"));
    }

    #[test]
    fn collaborator_errors_convert() {
        let err: GraphError = CollaboratorError::Network("connection reset".into()).into();
        assert!(matches!(err, GraphError::Collaborator(_)));
    }
}
