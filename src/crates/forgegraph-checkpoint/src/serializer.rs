//! Pluggable serialization for byte-oriented checkpoint backends.
//!
//! [`InMemorySaver`](crate::memory::InMemorySaver) stores typed values and
//! needs no codec; backends that persist to disk, a database column, or a
//! network store pick one of these (or bring their own).
//!
//! [`JsonSerializer`] handles every checkpoint, including the free-form
//! JSON `state` payload, and is the codec to use for [`Checkpoint`]
//! (crate::checkpoint::Checkpoint). [`BincodeSerializer`] is denser but
//! limited to self-describing-free types: it cannot decode
//! `serde_json::Value`, so it suits backends that store strongly typed
//! sidecar records (metrics, audit rows) next to JSON-encoded checkpoints.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Encode/decode values for storage.
pub trait Serializer: Send + Sync {
    /// Serialize a value to bytes.
    fn dumps<T: Serialize>(&self, value: &T) -> Result<Vec<u8>>;

    /// Deserialize a value from bytes.
    fn loads<T: for<'de> Deserialize<'de>>(&self, data: &[u8]) -> Result<T>;
}

/// Human-readable JSON codec; the default for checkpoint records.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn dumps<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn loads<T: for<'de> Deserialize<'de>>(&self, data: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(data)?)
    }
}

/// Compact binary codec for typed payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeSerializer;

impl Serializer for BincodeSerializer {
    fn dumps<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(bincode::serialize(value)?)
    }

    fn loads<T: for<'de> Deserialize<'de>>(&self, data: &[u8]) -> Result<T> {
        Ok(bincode::deserialize(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::{Checkpoint, CheckpointSource};
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct AuditRow {
        thread_id: String,
        step: i64,
    }

    #[test]
    fn json_round_trips_a_full_checkpoint() {
        let codec = JsonSerializer;
        let ckpt = Checkpoint::new(
            json!({"messages": ["a", "b"], "retry_count": 2}),
            vec!["grade".into()],
            4,
            CheckpointSource::Loop,
        );

        let restored: Checkpoint = codec.loads(&codec.dumps(&ckpt).unwrap()).unwrap();
        assert_eq!(restored.id, ckpt.id);
        assert_eq!(restored.state, ckpt.state);
        assert_eq!(restored.next, ckpt.next);
    }

    #[test]
    fn bincode_round_trips_typed_records() {
        let codec = BincodeSerializer;
        let row = AuditRow {
            thread_id: "t-1".into(),
            step: 7,
        };

        let restored: AuditRow = codec.loads(&codec.dumps(&row).unwrap()).unwrap();
        assert_eq!(restored, row);
    }
}
