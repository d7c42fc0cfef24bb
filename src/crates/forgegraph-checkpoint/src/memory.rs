//! In-memory reference implementation of [`Checkpointer`].
//!
//! Snapshots live in a `RwLock<HashMap<thread_id, Vec<Checkpoint>>>`; the
//! newest entry of each vector is the latest snapshot. Cloning the saver
//! clones the `Arc`, so clones share storage; handy for handing one saver
//! to both the engine and a test harness.
//!
//! Nothing survives process exit. Production deployments that need
//! durability implement [`Checkpointer`] over a real store instead.

use crate::checkpoint::Checkpoint;
use crate::error::{CheckpointError, Result};
use crate::traits::Checkpointer;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type Storage = Arc<RwLock<HashMap<String, Vec<Checkpoint>>>>;

/// Thread-safe in-memory checkpoint store.
#[derive(Debug, Clone, Default)]
pub struct InMemorySaver {
    storage: Storage,
}

impl InMemorySaver {
    /// Create an empty saver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct threads with at least one snapshot.
    pub async fn thread_count(&self) -> usize {
        self.storage.read().await.len()
    }

    /// Total snapshots across all threads.
    pub async fn checkpoint_count(&self) -> usize {
        self.storage.read().await.values().map(Vec::len).sum()
    }

    /// Remove every snapshot. Useful between tests.
    pub async fn clear(&self) {
        self.storage.write().await.clear();
    }
}

fn validate_thread_id(thread_id: &str) -> Result<()> {
    if thread_id.is_empty() {
        return Err(CheckpointError::Invalid("thread_id must not be empty".into()));
    }
    Ok(())
}

#[async_trait]
impl Checkpointer for InMemorySaver {
    async fn put(&self, thread_id: &str, checkpoint: Checkpoint) -> Result<()> {
        validate_thread_id(thread_id)?;
        let mut storage = self.storage.write().await;
        storage.entry(thread_id.to_string()).or_default().push(checkpoint);
        Ok(())
    }

    async fn get(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        validate_thread_id(thread_id)?;
        let storage = self.storage.read().await;
        Ok(storage.get(thread_id).and_then(|entries| entries.last().cloned()))
    }

    async fn history(&self, thread_id: &str) -> Result<Vec<Checkpoint>> {
        validate_thread_id(thread_id)?;
        let storage = self.storage.read().await;
        Ok(storage.get(thread_id).cloned().unwrap_or_default())
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        validate_thread_id(thread_id)?;
        self.storage.write().await.remove(thread_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::CheckpointSource;
    use serde_json::json;

    fn ckpt(step: i64, next: Vec<&str>) -> Checkpoint {
        Checkpoint::new(
            json!({"step": step}),
            next.into_iter().map(String::from).collect(),
            step,
            CheckpointSource::Loop,
        )
    }

    #[tokio::test]
    async fn get_returns_latest() {
        let saver = InMemorySaver::new();
        saver.put("t1", ckpt(0, vec!["a"])).await.unwrap();
        saver.put("t1", ckpt(1, vec![])).await.unwrap();

        let latest = saver.get("t1").await.unwrap().unwrap();
        assert_eq!(latest.step, 1);
        assert!(latest.is_terminal());
    }

    #[tokio::test]
    async fn missing_thread_is_none() {
        let saver = InMemorySaver::new();
        assert!(saver.get("unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn threads_are_isolated() {
        let saver = InMemorySaver::new();
        saver.put("alice", ckpt(0, vec!["x"])).await.unwrap();
        saver.put("bob", ckpt(5, vec![])).await.unwrap();

        assert_eq!(saver.get("alice").await.unwrap().unwrap().step, 0);
        assert_eq!(saver.get("bob").await.unwrap().unwrap().step, 5);
        assert_eq!(saver.thread_count().await, 2);
    }

    #[tokio::test]
    async fn history_is_ordered_oldest_first() {
        let saver = InMemorySaver::new();
        for step in 0..3 {
            saver.put("t", ckpt(step, vec!["n"])).await.unwrap();
        }

        let history = saver.history("t").await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history.first().unwrap().step, 0);
        assert_eq!(history.last().unwrap().step, 2);
    }

    #[tokio::test]
    async fn delete_thread_removes_all_snapshots() {
        let saver = InMemorySaver::new();
        saver.put("t", ckpt(0, vec![])).await.unwrap();
        saver.delete_thread("t").await.unwrap();

        assert!(saver.get("t").await.unwrap().is_none());
        assert_eq!(saver.checkpoint_count().await, 0);
    }

    #[tokio::test]
    async fn empty_thread_id_rejected() {
        let saver = InMemorySaver::new();
        let err = saver.get("").await.unwrap_err();
        assert!(matches!(err, CheckpointError::Invalid(_)));
    }

    #[tokio::test]
    async fn clones_share_storage() {
        let saver = InMemorySaver::new();
        let clone = saver.clone();
        saver.put("t", ckpt(0, vec![])).await.unwrap();

        assert!(clone.get("t").await.unwrap().is_some());
    }
}
