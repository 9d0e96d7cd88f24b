//! Pipetrace: compact trace recording for cycle-level hardware simulators.
//!
//! A simulator describes its structure (nodes, edges between them, clock
//! domains) and then, cycle by cycle, the items flowing through it: items
//! are created, moved over edges, enter and leave node slots and carry tags.
//! The [`Recorder`] turns these calls into a delta-encoded binary stream (or
//! a line-oriented text form) that [`TraceReader`] decodes back.

pub mod cli;
pub mod engine;
pub mod format;
pub mod graph;
pub mod index;
pub mod recorder;
pub mod types;

// Re-export commonly used types at the crate root
pub use format::{AsciiEncoder, BinaryEncoder, TraceDecoder, TraceEncoder, TraceReader};
pub use recorder::{Recorder, RecorderConfig, RecorderStats};
pub use types::{
    ClockId, ClockPhase, ClockSpec, Command, CommandCode, EdgeId, EdgeSpec, Instance, ItemId,
    NodeId, NodeSpec, TagValue, TraceError, TraceResult, DEFAULT_CLOCK, EMBEDDED_ARCHIVE_MAGIC,
    FORMAT_MAJOR, FORMAT_MINOR, INVALID_ITEM,
};
