//! The encoder interface shared by the binary and text encoders.

use std::path::Path;

use crate::types::{Command, TraceResult};

/// Turns commands into bytes on an owned sink.
///
/// An encoder and its writer travel together: swapping encoders swaps
/// sinks. Replay code only ever sees `&mut dyn TraceEncoder`.
pub trait TraceEncoder: Send {
    /// Open `path` as a fresh stream, reset all per-stream state and write
    /// the version command.
    fn begin(&mut self, path: &Path, compressed: bool) -> TraceResult<()>;

    /// Encode one command.
    fn encode(&mut self, command: &Command) -> TraceResult<()>;

    /// Whether `begin` has opened a sink that is still open.
    fn is_open(&self) -> bool;

    /// Push buffered bytes to the sink.
    fn flush(&mut self) -> TraceResult<()>;

    /// Flush and release the sink.
    fn close(&mut self) -> TraceResult<()>;

    /// Bytes produced so far (before compression).
    fn bytes_written(&self) -> u64;

    /// Short name of the encoding, for logs.
    fn name(&self) -> &'static str;
}
