//! LZ4 frame compression for trace streams.

use std::io::{Read, Write};

use lz4_flex::frame::{FrameDecoder, FrameEncoder};

use crate::types::error::{TraceError, TraceResult};

/// Magic bytes that open every LZ4 frame.
pub const LZ4_FRAME_MAGIC: [u8; 4] = [0x04, 0x22, 0x4D, 0x18];

/// Wrap a sink in an LZ4 frame encoder.
pub fn compress_stream<W: Write>(sink: W) -> FrameEncoder<W> {
    FrameEncoder::new(sink)
}

/// Finish an LZ4 frame, returning the inner sink.
pub fn finish_stream<W: Write>(encoder: FrameEncoder<W>) -> TraceResult<W> {
    encoder
        .finish()
        .map_err(|e| TraceError::Compression(e.to_string()))
}

/// Whether `data` starts with an LZ4 frame.
pub fn is_compressed(data: &[u8]) -> bool {
    data.len() >= LZ4_FRAME_MAGIC.len() && data[..4] == LZ4_FRAME_MAGIC
}

/// Decompress a complete LZ4 frame stream.
pub fn decompress_stream(data: &[u8]) -> TraceResult<Vec<u8>> {
    let mut decoder = FrameDecoder::new(data);
    let mut out = Vec::with_capacity(data.len() * 4);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| TraceError::Compression(e.to_string()))?;
    Ok(out)
}
