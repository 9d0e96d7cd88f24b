//! Buffered trace writer over a plain or LZ4-compressed file sink.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use lz4_flex::frame::FrameEncoder;
use log::{debug, info, warn};

use crate::types::error::{TraceError, TraceResult};

use super::compression::{compress_stream, finish_stream};

/// The open output of a writer.
enum Sink {
    Plain(File),
    Compressed(FrameEncoder<File>),
}

impl Sink {
    fn write_all(&mut self, data: &[u8]) -> TraceResult<()> {
        match self {
            Sink::Plain(file) => file.write_all(data)?,
            Sink::Compressed(encoder) => encoder.write_all(data)?,
        }
        Ok(())
    }

    fn flush(&mut self) -> TraceResult<()> {
        match self {
            Sink::Plain(file) => file.flush()?,
            Sink::Compressed(encoder) => encoder.flush()?,
        }
        Ok(())
    }

    fn finish(self) -> TraceResult<()> {
        match self {
            Sink::Plain(mut file) => file.flush()?,
            Sink::Compressed(encoder) => finish_stream(encoder)?.flush()?,
        }
        Ok(())
    }
}

/// Batches small writes into a fixed-size buffer before they reach the sink.
///
/// A capacity of 0 makes the writer unbuffered.
pub struct TraceWriter {
    buffer: Vec<u8>,
    capacity: usize,
    sink: Option<Sink>,
    path: Option<PathBuf>,
    bytes_written: u64,
}

impl TraceWriter {
    /// Create a writer with no open sink.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            capacity,
            sink: None,
            path: None,
            bytes_written: 0,
        }
    }

    /// Bind the writer to a new file, closing the previous sink first.
    pub fn open(&mut self, path: &Path, compressed: bool) -> TraceResult<()> {
        self.close()?;
        let file = File::create(path)?;
        self.sink = Some(if compressed {
            Sink::Compressed(compress_stream(file))
        } else {
            Sink::Plain(file)
        });
        self.path = Some(path.to_path_buf());
        info!(
            "Opened trace sink {} (compressed: {}, buffer: {} bytes)",
            path.display(),
            compressed,
            self.capacity
        );
        Ok(())
    }

    /// Whether a sink is currently open.
    pub fn is_open(&self) -> bool {
        self.sink.is_some()
    }

    /// Path of the open sink, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Total bytes accepted since creation (before compression).
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Queue `data` for the sink.
    pub fn write(&mut self, data: &[u8]) -> TraceResult<()> {
        let sink = self.sink.as_mut().ok_or(TraceError::SinkClosed)?;
        if self.buffer.len() + data.len() > self.capacity {
            if !self.buffer.is_empty() {
                sink.write_all(&self.buffer)?;
                self.buffer.clear();
            }
            if data.len() > self.capacity {
                sink.write_all(data)?;
                self.bytes_written += data.len() as u64;
                return Ok(());
            }
        }
        self.buffer.extend_from_slice(data);
        self.bytes_written += data.len() as u64;
        Ok(())
    }

    /// Push buffered bytes to the sink. No-op without an open sink.
    pub fn flush(&mut self) -> TraceResult<()> {
        let Some(sink) = self.sink.as_mut() else {
            return Ok(());
        };
        if !self.buffer.is_empty() {
            debug!("Flushing {} buffered trace bytes", self.buffer.len());
            sink.write_all(&self.buffer)?;
            self.buffer.clear();
        }
        sink.flush()
    }

    /// Flush, finish the compressed frame and release the sink.
    pub fn close(&mut self) -> TraceResult<()> {
        self.flush()?;
        if let Some(sink) = self.sink.take() {
            sink.finish()?;
            if let Some(path) = self.path.take() {
                info!("Closed trace sink {}", path.display());
            }
        }
        Ok(())
    }
}

impl Drop for TraceWriter {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close trace sink: {}", e);
        }
    }
}
