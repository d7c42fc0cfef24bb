//! The superstep executor.
//!
//! One invocation drives one workflow thread: load or initialize the
//! checkpoint, then loop (execute the whole frontier, merge partial
//! updates in registration order, route to the next frontier, persist)
//! until every branch terminates, an interrupt node is reached, or the
//! recursion limit trips.
//!
//! Frontier nodes run as concurrently polled futures over the same
//! pre-superstep state; nothing shared is written until the engine applies
//! the merges sequentially afterwards, so completion order is irrelevant to
//! the final state.

use super::{CompiledGraph, RunResult};
use crate::error::{GraphError, Result};
use crate::graph::{Edge, NodeId, END};
use forgegraph_checkpoint::{Checkpoint, CheckpointSource, Checkpointer};
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;

impl CompiledGraph {
    /// Execute one thread of this workflow.
    ///
    /// - No checkpoint for `thread_id` + `Some(input)`: fresh run from the
    ///   entry point.
    /// - Checkpoint present + `None`: resume from the persisted `next`
    ///   frontier (a completed thread returns its final state unchanged).
    /// - Checkpoint present + `Some(input)`: if the thread completed, start
    ///   it fresh from the input; otherwise merge the input into the stored
    ///   state and continue from the persisted frontier.
    /// - No checkpoint + `None`: [`GraphError::NoCheckpoint`], since there
    ///   is nothing to resume.
    ///
    /// Returns [`RunResult`] with `status = Paused` (not an error) when an
    /// interrupt node is reached; the paused nodes stay in the persisted
    /// `next` until a later `run(thread_id, None)`.
    ///
    /// Concurrent calls for the same `thread_id` are a caller error and
    /// fail fast with [`GraphError::ConcurrentRun`].
    #[tracing::instrument(skip(self, input))]
    pub async fn run(&self, thread_id: &str, input: Option<Value>) -> Result<RunResult> {
        let checkpointer = Arc::clone(self.require_checkpointer()?);
        let _guard = self.acquire_thread(thread_id)?;

        let existing = checkpointer.get(thread_id).await?;
        let entry = self.entry_point().to_string();

        let (state, frontier, step, resuming) = match (existing, input) {
            (None, Some(input)) => {
                tracing::info!("starting fresh run");
                let state = self.graph.schema().initial_state(&input)?;
                let frontier = vec![entry];
                checkpointer
                    .put(
                        thread_id,
                        Checkpoint::new(state.clone(), frontier.clone(), -1, CheckpointSource::Input),
                    )
                    .await?;
                (state, frontier, -1, false)
            }
            (None, None) => {
                return Err(GraphError::NoCheckpoint {
                    thread_id: thread_id.to_string(),
                })
            }
            (Some(ckpt), None) => {
                if ckpt.is_terminal() {
                    tracing::debug!("thread already complete, nothing to resume");
                    return Ok(RunResult::complete(ckpt.state));
                }
                tracing::info!(next = ?ckpt.next, "resuming from checkpoint");
                (ckpt.state, ckpt.next, ckpt.step, true)
            }
            (Some(ckpt), Some(input)) => {
                if ckpt.is_terminal() {
                    tracing::info!("previous run complete, starting fresh");
                    let state = self.graph.schema().initial_state(&input)?;
                    let frontier = vec![entry];
                    checkpointer
                        .put(
                            thread_id,
                            Checkpoint::new(
                                state.clone(),
                                frontier.clone(),
                                -1,
                                CheckpointSource::Input,
                            ),
                        )
                        .await?;
                    (state, frontier, -1, false)
                } else {
                    tracing::info!(next = ?ckpt.next, "merging input into in-flight thread");
                    let mut state = ckpt.state;
                    self.graph.schema().apply(&mut state, &input)?;
                    checkpointer
                        .put(
                            thread_id,
                            Checkpoint::new(
                                state.clone(),
                                ckpt.next.clone(),
                                ckpt.step,
                                CheckpointSource::Input,
                            ),
                        )
                        .await?;
                    (state, ckpt.next, ckpt.step, true)
                }
            }
        };

        let frontier = self.graph.normalize_frontier(&frontier);
        self.superstep_loop(state, frontier, step, resuming, Some((&checkpointer, thread_id)))
            .await
    }

    /// One-shot execution without persistence: run `input` through the
    /// graph and return the final state. Reaching an interrupt node is an
    /// error here ([`GraphError::Interrupted`]) since there is no
    /// checkpoint to resume from.
    #[tracing::instrument(skip(self, input), fields(node_count = self.graph.node_count()))]
    pub async fn invoke(&self, input: Value) -> Result<Value> {
        let state = self.graph.schema().initial_state(&input)?;
        let frontier = vec![self.entry_point().to_string()];
        let result = self.superstep_loop(state, frontier, -1, false, None).await?;
        match result.status {
            super::RunStatus::Complete => Ok(result.state),
            super::RunStatus::Paused => Err(GraphError::Interrupted {
                nodes: result.pending_nodes,
            }),
        }
    }

    /// Core loop shared by `run` and `invoke`.
    ///
    /// `resume_pass` suppresses the interrupt check for the first frontier
    /// of a resume: the pause happened *before* those nodes executed, so
    /// the resume must actually execute them.
    async fn superstep_loop(
        &self,
        mut state: Value,
        mut frontier: Vec<NodeId>,
        mut step: i64,
        mut resume_pass: bool,
        persist: Option<(&Arc<dyn Checkpointer>, &str)>,
    ) -> Result<RunResult> {
        let mut supersteps = 0usize;

        loop {
            if !resume_pass
                && frontier.iter().any(|node| self.interrupt_before.contains(node))
            {
                // The (state, frontier) pair reaching this point is always
                // already persisted: at initialization or at the end of the
                // superstep that produced it.
                tracing::info!(pending = ?frontier, "pausing before interrupt nodes");
                return Ok(RunResult::paused(state, frontier));
            }
            resume_pass = false;

            if supersteps >= self.recursion_limit {
                tracing::error!(limit = self.recursion_limit, "recursion limit exceeded");
                return Err(GraphError::GraphRecursion {
                    limit: self.recursion_limit,
                    state: Box::new(state),
                });
            }
            supersteps += 1;

            tracing::debug!(superstep = supersteps, frontier = ?frontier, "executing superstep");
            let partials = self.execute_frontier(&frontier, &state).await?;

            // Merge strictly in registration order (the frontier is kept
            // normalized), never in completion order.
            for (node, partial) in frontier.iter().zip(partials.iter()) {
                self.graph.schema().apply_as_node(&mut state, partial, node)?;
            }

            let next = self.route_frontier(&frontier, &state)?;
            step += 1;

            if let Some((checkpointer, thread_id)) = persist {
                checkpointer
                    .put(
                        thread_id,
                        Checkpoint::new(state.clone(), next.clone(), step, CheckpointSource::Loop),
                    )
                    .await?;
            }

            if next.is_empty() {
                tracing::info!(supersteps, "run complete");
                return Ok(RunResult::complete(state));
            }

            frontier = next;
        }
    }

    /// Execute every frontier node against the same pre-superstep state and
    /// collect their partial updates in frontier order.
    async fn execute_frontier(&self, frontier: &[NodeId], state: &Value) -> Result<Vec<Value>> {
        // A frontier normally comes from routing, but on resume it comes
        // from a checkpoint and may name nodes this graph no longer has.
        let mut executors = Vec::with_capacity(frontier.len());
        for name in frontier {
            let spec = self.graph.node(name).ok_or_else(|| {
                GraphError::Execution(format!(
                    "checkpoint references unknown node '{name}'"
                ))
            })?;
            executors.push(Arc::clone(&spec.executor));
        }

        let futures: Vec<_> = frontier
            .iter()
            .zip(executors)
            .map(|(name, executor)| {
                let node_state = state.clone();
                let timeout = self.node_timeout;
                async move {
                    match timeout {
                        Some(limit) => match tokio::time::timeout(limit, executor(node_state)).await
                        {
                            Ok(result) => result,
                            Err(_) => Err(GraphError::NodeExecution {
                                node: name.clone(),
                                error: format!("timed out after {limit:?}"),
                            }),
                        },
                        None => executor(node_state).await,
                    }
                }
            })
            .collect();

        let results = join_all(futures).await;

        let mut partials = Vec::with_capacity(results.len());
        for (node, result) in frontier.iter().zip(results) {
            match result {
                Ok(partial) => partials.push(partial),
                Err(err) => {
                    if let Some(handler) = &self.on_node_error {
                        if let Some(fallback) = handler(node, &err, state) {
                            tracing::warn!(node = %node, error = %err, "node failed, using fallback update");
                            partials.push(fallback);
                            continue;
                        }
                    }
                    tracing::error!(node = %node, error = %err, "node execution failed");
                    return Err(match err {
                        already @ GraphError::NodeExecution { .. } => already,
                        other => GraphError::NodeExecution {
                            node: node.clone(),
                            error: other.to_string(),
                        },
                    });
                }
            }
        }

        Ok(partials)
    }

    /// Resolve the outgoing edges of every executed node against the merged
    /// state. Duplicate successors collapse to one entry (the fan-in
    /// barrier); normalization keeps registration order.
    fn route_frontier(&self, frontier: &[NodeId], state: &Value) -> Result<Vec<NodeId>> {
        let mut targets: Vec<NodeId> = Vec::new();

        for node in frontier {
            for edge in self.graph.edges_from(node) {
                match edge {
                    Edge::Direct(to) => {
                        if to != END {
                            targets.push(to.clone());
                        }
                    }
                    Edge::Conditional { router, branches } => {
                        let label = router(state);
                        match branches.get(&label) {
                            Some(to) => {
                                if to != END {
                                    targets.push(to.clone());
                                }
                            }
                            None if label == END => {}
                            None => {
                                return Err(GraphError::UnknownRoute {
                                    node: node.clone(),
                                    label,
                                })
                            }
                        }
                    }
                }
            }
        }

        Ok(self.graph.normalize_frontier(&targets))
    }
}
