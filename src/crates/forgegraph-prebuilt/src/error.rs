//! Workflow-level errors.

use forgegraph_core::GraphError;
use thiserror::Error;

/// Errors raised while assembling or configuring a prebuilt workflow.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The underlying graph failed to build or validate.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// The factory was configured inconsistently.
    #[error("workflow configuration invalid: {0}")]
    Config(String),
}

/// Result alias for workflow factories.
pub type Result<T> = std::result::Result<T, WorkflowError>;
