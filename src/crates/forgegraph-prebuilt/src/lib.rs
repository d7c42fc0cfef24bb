//! # forgegraph-prebuilt - Ready-made agent workflows
//!
//! Four workflows assembled from [`forgegraph_core`] building blocks, each
//! a factory that wires channels, nodes, and edges and returns a compiled
//! graph. Collaborators (chat model, retriever, checkpoint store, file
//! access) are injected per factory call; nothing here owns a provider
//! client.
//!
//! - [`research`]: researcher/tools loop with a human approval gate that
//!   pauses the run until feedback is injected.
//! - [`swarm`]: planner fanning out to market/tech/risk analysts that
//!   converge on an aggregator (barrier), producing a strategy report.
//! - [`todo`]: reads a TODO file, gathers code context through sandboxed
//!   file tools, and proposes a fix for the top task.
//! - [`rag`]: corrective retrieval: retrieve, grade relevance, rewrite
//!   the query on empty grades (bounded), then generate.

pub mod error;
pub mod messages;
pub mod rag;
pub mod research;
pub mod swarm;
pub mod todo;
pub mod tools;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{Result, WorkflowError};
pub use messages::{ChatMessage, MessageRole};
pub use rag::{rag_graph, RagOptions};
pub use research::research_graph;
pub use swarm::swarm_graph;
pub use todo::todo_graph;
pub use tools::FileTools;
