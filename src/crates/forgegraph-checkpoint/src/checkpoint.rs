//! Checkpoint data structures.
//!
//! A [`Checkpoint`] is the unit of persistence for a workflow thread: the
//! merged channel state after a superstep plus the frontier of nodes still
//! pending (`next`). The engine writes one after every superstep; resume
//! loads the latest one and picks up from `next`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Where a checkpoint came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointSource {
    /// Written when a run was initialized from caller input.
    Input,
    /// Written by the engine at the end of a superstep.
    Loop,
    /// Written by an external state injection (`update_state`).
    Update,
}

/// Snapshot of a workflow thread at a superstep boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Checkpoint format version.
    pub v: u32,

    /// Unique id of this snapshot.
    pub id: String,

    /// Creation time.
    pub ts: DateTime<Utc>,

    /// Superstep counter at the time of the snapshot. `-1` for the initial
    /// input checkpoint, `0` after the first superstep, and so on.
    pub step: i64,

    /// Provenance of the snapshot.
    pub source: CheckpointSource,

    /// Merged workflow state: a JSON object mapping channel names to values.
    pub state: Value,

    /// Node names scheduled for the next superstep. Empty means the run
    /// reached a terminal state.
    pub next: Vec<String>,
}

impl Checkpoint {
    /// Current checkpoint format version.
    pub const CURRENT_VERSION: u32 = 1;

    /// Create a checkpoint for the given state and pending frontier.
    pub fn new(state: Value, next: Vec<String>, step: i64, source: CheckpointSource) -> Self {
        Self {
            v: Self::CURRENT_VERSION,
            id: Uuid::new_v4().to_string(),
            ts: Utc::now(),
            step,
            source,
            state,
            next,
        }
    }

    /// True when no node is pending, i.e. the run completed.
    pub fn is_terminal(&self) -> bool {
        self.next.is_empty()
    }

    /// Derive a follow-up snapshot with fresh id and timestamp, keeping the
    /// step counter for the caller to adjust.
    pub fn successor(&self, state: Value, next: Vec<String>, source: CheckpointSource) -> Self {
        Self::new(state, next, self.step + 1, source)
    }
}
