//! Counters describing what a recorder did with the commands it was given.

use serde::Serialize;

/// Recorder statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecorderStats {
    /// Commands handed to the encoder, replays included.
    pub commands_encoded: u64,
    /// Persistent commands added to the replay storage.
    pub commands_stored: u64,
    /// Non-persistent commands discarded while off.
    pub commands_dropped: u64,
    /// Node-tag sets dropped as repeats.
    pub tags_suppressed: u64,
    /// ExitNode commands generated by autoflush.
    pub exits_synthesized: u64,
    /// Live items re-announced on `turn_on`.
    pub items_replayed: u64,
    /// Number of storage replays performed.
    pub replays: u64,
}
