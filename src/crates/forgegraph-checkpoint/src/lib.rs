//! # forgegraph-checkpoint - Durable workflow state snapshots
//!
//! Persistence layer for the forgegraph execution engine. A [`Checkpoint`]
//! captures a workflow thread's merged state together with the set of nodes
//! still pending execution (`next`); the [`Checkpointer`] trait abstracts
//! where that snapshot lives so the engine never assumes a particular
//! backend.
//!
//! The crate ships one reference backend, [`InMemorySaver`], suitable for
//! tests and single-process deployments. Database- or file-backed savers
//! implement [`Checkpointer`] (and typically one of the [`serializer`]
//! codecs) without any engine changes.
//!
//! ## Model
//!
//! - One thread id ↔ one logical workflow instance.
//! - The engine writes a checkpoint after every superstep; `next` empty
//!   means the run is complete.
//! - External callers may rewrite `state` between runs (human feedback
//!   injection) while `next` keeps pointing at the paused node.

pub mod checkpoint;
pub mod error;
pub mod memory;
pub mod serializer;
pub mod traits;

pub use checkpoint::{Checkpoint, CheckpointSource};
pub use error::{CheckpointError, Result};
pub use memory::InMemorySaver;
pub use serializer::{BincodeSerializer, JsonSerializer, Serializer};
pub use traits::Checkpointer;
