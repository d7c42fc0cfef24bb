//! Mergeable workflow state.
//!
//! The shared state of a run is a JSON object mapping *channels* to values.
//! Nodes never mutate state directly; they return partial updates (only the
//! channels they write) and the engine folds those through each channel's
//! [`Reducer`]. Two policies cover the workflows in this crate family:
//!
//! - [`MergePolicy::Replace`]: the delta overwrites the current value
//!   (scalars such as a report string, a retry counter).
//! - [`MergePolicy::Append`]: the delta is concatenated onto the current
//!   array (message history, parallel analyst outputs).
//!
//! A channel's policy is fixed when the graph compiles and holds for the
//! life of every run. Channels not named in a partial update are untouched.
//! Applying N partials in a fixed order is deterministic; the engine
//! supplies node-registration order as that fixed order.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while merging partial updates.
#[derive(Debug, Error)]
pub enum StateError {
    /// A partial update (or run input) was not a JSON object.
    #[error("partial update must be a JSON object, got {0}")]
    InvalidUpdate(String),

    /// A channel value did not match what its reducer expects.
    #[error("channel '{channel}' expects {expected}, got {got}")]
    TypeMismatch {
        channel: String,
        expected: &'static str,
        got: String,
    },
}

/// Result alias for state operations.
pub type Result<T> = std::result::Result<T, StateError>;

/// Declared merge behavior for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// New value overwrites the old one. Default for undeclared channels.
    Replace,
    /// New items are concatenated onto the existing array, preserving order.
    Append,
}

/// Combines the current value of one channel with a node-produced delta.
pub trait Reducer: Send + Sync {
    /// Merge `delta` into `current` (absent on first write) and return the
    /// channel's new value.
    fn reduce(&self, channel: &str, current: Option<&Value>, delta: &Value) -> Result<Value>;
}

/// Last write wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplaceReducer;

impl Reducer for ReplaceReducer {
    fn reduce(&self, _channel: &str, _current: Option<&Value>, delta: &Value) -> Result<Value> {
        Ok(delta.clone())
    }
}

/// Order-preserving concatenation onto an array channel.
///
/// An array delta is concatenated element-wise; any other delta is pushed
/// as a single element. The current value must be an array (or absent/null,
/// which starts a fresh one).
#[derive(Debug, Clone, Copy, Default)]
pub struct AppendReducer;

impl Reducer for AppendReducer {
    fn reduce(&self, channel: &str, current: Option<&Value>, delta: &Value) -> Result<Value> {
        let mut items = match current {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(existing)) => existing.clone(),
            Some(other) => {
                return Err(StateError::TypeMismatch {
                    channel: channel.to_string(),
                    expected: "an array",
                    got: type_name(other).to_string(),
                })
            }
        };

        match delta {
            Value::Array(new_items) => items.extend(new_items.iter().cloned()),
            other => items.push(other.clone()),
        }

        Ok(Value::Array(items))
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Per-channel merge policies for one graph, fixed at compile time.
#[derive(Clone, Default)]
pub struct StateSchema {
    reducers: HashMap<String, Arc<dyn Reducer>>,
    append_channels: Vec<String>,
}

impl StateSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a channel with one of the built-in policies.
    pub fn add_channel(&mut self, name: impl Into<String>, policy: MergePolicy) {
        let name = name.into();
        let reducer: Arc<dyn Reducer> = match policy {
            MergePolicy::Replace => Arc::new(ReplaceReducer),
            MergePolicy::Append => {
                self.append_channels.push(name.clone());
                Arc::new(AppendReducer)
            }
        };
        self.reducers.insert(name, reducer);
    }

    /// Declare a channel with a caller-provided reducer.
    pub fn add_channel_with_reducer(&mut self, name: impl Into<String>, reducer: Arc<dyn Reducer>) {
        self.reducers.insert(name.into(), reducer);
    }

    /// Reducer for `channel`; undeclared channels replace.
    fn reducer_for(&self, channel: &str) -> Arc<dyn Reducer> {
        self.reducers
            .get(channel)
            .cloned()
            .unwrap_or_else(|| Arc::new(ReplaceReducer))
    }

    /// Names of declared channels.
    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.reducers.keys().map(String::as_str)
    }

    /// Build the state for a fresh run: append channels start as empty
    /// arrays, then `input` is merged like any partial update.
    pub fn initial_state(&self, input: &Value) -> Result<Value> {
        let mut state = Value::Object(Map::new());
        if let Value::Object(map) = &mut state {
            for channel in &self.append_channels {
                map.insert(channel.clone(), Value::Array(Vec::new()));
            }
        }
        self.apply(&mut state, input)?;
        Ok(state)
    }

    /// Merge one partial update into `state`. `update` may be `null` (no-op)
    /// or a JSON object naming only the channels it writes.
    pub fn apply(&self, state: &mut Value, update: &Value) -> Result<()> {
        let entries = match update {
            Value::Null => return Ok(()),
            Value::Object(map) => map,
            other => return Err(StateError::InvalidUpdate(type_name(other).to_string())),
        };

        let target = match state {
            Value::Object(map) => map,
            other => return Err(StateError::InvalidUpdate(type_name(other).to_string())),
        };

        // serde_json's default map is ordered by key, so iterating the
        // update is deterministic regardless of how it was constructed.
        for (channel, delta) in entries {
            let merged = self
                .reducer_for(channel)
                .reduce(channel, target.get(channel), delta)?;
            target.insert(channel.clone(), merged);
        }

        Ok(())
    }

    /// Merge a partial update attributed to a node. Identical merge
    /// semantics to [`apply`](Self::apply); the attribution feeds tracing.
    pub fn apply_as_node(&self, state: &mut Value, update: &Value, node: &str) -> Result<()> {
        tracing::trace!(node, "applying state update");
        self.apply(state, update)
    }
}

impl std::fmt::Debug for StateSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut channels: Vec<&String> = self.reducers.keys().collect();
        channels.sort();
        f.debug_struct("StateSchema").field("channels", &channels).finish()
    }
}
