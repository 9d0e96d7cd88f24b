//! Trace encoding: wire format, text format, buffered output and reading.

pub mod ascii;
pub mod binary;
pub mod compression;
pub mod encoder;
pub mod reader;
pub mod width;
pub mod writer;

pub use ascii::AsciiEncoder;
pub use binary::BinaryEncoder;
pub use encoder::TraceEncoder;
pub use reader::{TraceDecoder, TraceReader};
pub use width::Width;
pub use writer::TraceWriter;
