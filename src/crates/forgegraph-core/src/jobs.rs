//! Job-queue collaborator interface for out-of-process execution.
//!
//! A workflow run can be handed to a queue (`submit`) and observed by
//! polling (`poll`) instead of blocking the caller. The broker-backed
//! implementation belongs to the application; [`LocalJobQueue`] runs jobs
//! on the current tokio runtime so the submit/poll surface can be
//! exercised without any infrastructure.

use crate::compiled::CompiledGraph;
use crate::llm::{CollabResult, CollaboratorError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Opaque job identifier.
pub type JobId = String;

/// Observable lifecycle of a submitted job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    /// Still running (or queued).
    Pending,
    /// Finished; carries the serialized [`RunResult`](crate::RunResult).
    Success(Value),
    /// Failed; carries the error message.
    Failure(String),
}

/// Fire-and-poll execution of workflow runs.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue a run of the workflow for `thread_id` with `input`.
    async fn submit(&self, thread_id: &str, input: Value) -> CollabResult<JobId>;

    /// Current status of a previously submitted job.
    async fn poll(&self, job_id: &str) -> CollabResult<JobStatus>;
}

/// In-process queue: each job is a tokio task running
/// [`CompiledGraph::run`]. The graph must carry a checkpointer.
#[derive(Clone)]
pub struct LocalJobQueue {
    graph: Arc<CompiledGraph>,
    results: Arc<RwLock<HashMap<JobId, JobStatus>>>,
}

impl LocalJobQueue {
    pub fn new(graph: Arc<CompiledGraph>) -> Self {
        Self {
            graph,
            results: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl JobQueue for LocalJobQueue {
    async fn submit(&self, thread_id: &str, input: Value) -> CollabResult<JobId> {
        let job_id = Uuid::new_v4().to_string();
        self.results
            .write()
            .await
            .insert(job_id.clone(), JobStatus::Pending);

        let graph = Arc::clone(&self.graph);
        let results = Arc::clone(&self.results);
        let thread_id = thread_id.to_string();
        let id = job_id.clone();

        tokio::spawn(async move {
            let status = match graph.run(&thread_id, Some(input)).await {
                Ok(result) => match serde_json::to_value(&result) {
                    Ok(value) => JobStatus::Success(value),
                    Err(err) => JobStatus::Failure(err.to_string()),
                },
                Err(err) => JobStatus::Failure(err.to_string()),
            };
            results.write().await.insert(id, status);
        });

        Ok(job_id)
    }

    async fn poll(&self, job_id: &str) -> CollabResult<JobStatus> {
        self.results
            .read()
            .await
            .get(job_id)
            .cloned()
            .ok_or_else(|| CollaboratorError::Provider(format!("unknown job id '{job_id}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::StateGraph;
    use crate::graph::END;
    use forgegraph_checkpoint::InMemorySaver;
    use serde_json::json;
    use std::time::Duration;

    fn queue() -> LocalJobQueue {
        let mut graph = StateGraph::new();
        graph
            .add_node("work", |state: Value| async move {
                let topic = state["topic"].as_str().unwrap_or_default().to_string();
                Ok(json!({"result": format!("done: {topic}")}))
            })
            .set_entry_point("work")
            .add_edge("work", END);
        let compiled = graph
            .compile()
            .unwrap()
            .with_checkpointer(Arc::new(InMemorySaver::new()));
        LocalJobQueue::new(Arc::new(compiled))
    }

    #[tokio::test]
    async fn submit_then_poll_until_success() {
        let queue = queue();
        let job_id = queue.submit("job-thread", json!({"topic": "X"})).await.unwrap();

        let mut status = queue.poll(&job_id).await.unwrap();
        for _ in 0..50 {
            if status != JobStatus::Pending {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            status = queue.poll(&job_id).await.unwrap();
        }

        match status {
            JobStatus::Success(value) => {
                assert_eq!(value["status"], "complete");
                assert_eq!(value["state"]["result"], "done: X");
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn polling_unknown_job_is_an_error() {
        let queue = queue();
        let err = queue.poll("no-such-job").await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Provider(_)));
    }
}
