//! # forgegraph-core - Workflow graph execution engine
//!
//! A small interpreter for stateful, multi-step agent workflows. Callers
//! declare nodes (async transforms over a shared JSON state), edges (static,
//! conditional, fan-out/fan-in), an entry point, and an interrupt set; the
//! engine executes the graph in synchronous supersteps, merging every node's
//! partial update through per-channel merge policies, checkpointing after
//! each superstep, and pausing indefinitely before interrupt nodes until an
//! explicit resume.
//!
//! ## Execution model
//!
//! Execution proceeds in *supersteps*: the whole frontier of scheduled nodes
//! runs (concurrently; every node sees the same pre-superstep state), their
//! partial updates merge in node-registration order, routers pick successors
//! from the merged state, and the resulting `(state, next)` snapshot is
//! persisted before the next round. Merge order is deterministic by
//! construction; completion order of the underlying futures never affects
//! the final state.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use forgegraph_core::{MergePolicy, StateGraph, END};
//! use serde_json::{json, Value};
//!
//! # async fn example() -> forgegraph_core::Result<()> {
//! let mut graph = StateGraph::new();
//! graph
//!     .add_channel("messages", MergePolicy::Append)
//!     .add_node("greet", |state: Value| async move {
//!         let name = state["name"].as_str().unwrap_or("world").to_string();
//!         Ok(json!({"messages": [format!("hello, {name}")]}))
//!     })
//!     .set_entry_point("greet")
//!     .add_edge("greet", END);
//!
//! let compiled = graph.compile()?;
//! let result = compiled.invoke(json!({"name": "ada"})).await?;
//! assert_eq!(result["messages"][0], "hello, ada");
//! # Ok(())
//! # }
//! ```
//!
//! Pause/resume, conditional routing, and fan-out are covered on
//! [`CompiledGraph`] and [`StateGraph`].
//!
//! ## Collaborators
//!
//! The engine consumes, but never implements, three external capabilities,
//! each injected as an `Arc<dyn …>` (no process-wide singletons):
//! [`ChatModel`](llm::ChatModel) for text generation,
//! [`Retriever`](retrieval::Retriever) for ranked snippet search, and
//! [`JobQueue`](jobs::JobQueue) for out-of-process runs.

pub mod builder;
pub mod compiled;
pub mod error;
pub mod graph;
pub mod jobs;
pub mod llm;
pub mod retrieval;
pub mod state;

pub use builder::StateGraph;
pub use compiled::{CompiledGraph, NodeErrorHandler, RunResult, RunStatus, StateSnapshot};
pub use error::{GraphError, Result};
pub use graph::{Edge, Graph, NodeExecutor, NodeId, NodeSpec, Router, END, START};
pub use jobs::{JobId, JobQueue, JobStatus, LocalJobQueue};
pub use llm::{ChatModel, CollaboratorError, GenerateRequest, GenerateResponse, TokenStream};
pub use retrieval::{Retriever, Snippet, StaticRetriever};
pub use state::{AppendReducer, MergePolicy, Reducer, ReplaceReducer, StateError, StateSchema};
