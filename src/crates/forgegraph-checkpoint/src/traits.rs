//! The [`Checkpointer`] storage trait.
//!
//! Implement this trait to persist workflow snapshots in any backend
//! (SQLite, Postgres, Redis, object storage). The engine only ever needs
//! the *latest* snapshot per thread; `history` exists for inspection and
//! audit tooling.
//!
//! Implementations must be `Send + Sync`: one saver instance is shared by
//! every thread the engine drives. Snapshots for different thread ids are
//! fully independent.
//!
//! # Example: wrapping a key-value store
//!
//! ```rust,ignore
//! struct KvSaver { kv: Arc<KvClient>, codec: JsonSerializer }
//!
//! #[async_trait]
//! impl Checkpointer for KvSaver {
//!     async fn put(&self, thread_id: &str, checkpoint: Checkpoint) -> Result<()> {
//!         let bytes = self.codec.dumps(&checkpoint)?;
//!         self.kv.set(thread_id, bytes).await
//!             .map_err(|e| CheckpointError::Storage(e.to_string()))
//!     }
//!
//!     async fn get(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
//!         match self.kv.get(thread_id).await {
//!             Ok(Some(bytes)) => Ok(Some(self.codec.loads(&bytes)?)),
//!             Ok(None) => Ok(None),
//!             Err(e) => Err(CheckpointError::Storage(e.to_string())),
//!         }
//!     }
//! }
//! ```

use crate::checkpoint::Checkpoint;
use crate::error::Result;
use async_trait::async_trait;

/// Storage backend for workflow checkpoints, keyed by thread id.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Persist `checkpoint` as the latest snapshot for `thread_id`.
    async fn put(&self, thread_id: &str, checkpoint: Checkpoint) -> Result<()>;

    /// Load the latest snapshot for `thread_id`, or `None` when the thread
    /// has never been checkpointed.
    async fn get(&self, thread_id: &str) -> Result<Option<Checkpoint>>;

    /// All snapshots recorded for `thread_id`, oldest first. Backends that
    /// keep only the latest snapshot may return a single-element history.
    async fn history(&self, thread_id: &str) -> Result<Vec<Checkpoint>> {
        Ok(self.get(thread_id).await?.into_iter().collect())
    }

    /// Drop every snapshot recorded for `thread_id`.
    async fn delete_thread(&self, thread_id: &str) -> Result<()>;
}
