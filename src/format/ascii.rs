//! Line-oriented text encoder.
//!
//! One line per command with absolute ids and inline names. There is no
//! interning and no cycle de-duplication, so the output is much larger than
//! the binary form but readable with any pager.

use std::fmt::Write as _;
use std::path::Path;

use log::debug;

use crate::types::{Command, TraceResult, FORMAT_MAJOR, FORMAT_MINOR};

use super::encoder::TraceEncoder;
use super::writer::TraceWriter;

/// Encoder producing one text line per command.
pub struct AsciiEncoder {
    writer: TraceWriter,
    line: String,
}

impl AsciiEncoder {
    /// Create an encoder whose writer buffers `buffer_size` bytes.
    pub fn new(buffer_size: usize) -> Self {
        Self {
            writer: TraceWriter::new(buffer_size),
            line: String::with_capacity(128),
        }
    }
}

fn list(values: &[u32]) -> String {
    let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(","))
}

/// Render `command` as a single line without the trailing newline.
pub fn render(command: &Command) -> String {
    match command {
        Command::Version { major, minor } => format!("version {}.{}", major, minor),
        Command::NewNode {
            id,
            name,
            parent,
            instance,
        } => {
            let parent = parent.map_or_else(|| "-".to_string(), |p| p.to_string());
            format!(
                "newnode {} name={:?} parent={} instance={}",
                id, name, parent, instance
            )
        }
        Command::NewEdge {
            id,
            source,
            destination,
            bandwidth,
            latency,
            name,
        } => format!(
            "newedge {} name={:?} source={} destination={} bandwidth={} latency={}",
            id, name, source, destination, bandwidth, latency
        ),
        Command::NewItem { id } => format!("newitem {}", id),
        Command::DeleteItem { id } => format!("deleteitem {}", id),
        Command::MoveItems {
            edge,
            items,
            positions,
        } => {
            let mut line = format!("moveitems edge={} items={}", edge, list(items));
            if !positions.is_empty() {
                let _ = write!(line, " pos={}", list(positions));
            }
            line
        }
        Command::EnterNode {
            node,
            item,
            position,
        } => format!("enternode node={} item={} pos={}", node, item, list(position)),
        Command::ExitNode {
            node,
            item,
            position,
        } => format!("exitnode node={} item={} pos={}", node, item, list(position)),
        Command::SetNodeLayout { node, dimensions } => {
            format!("setnodelayout node={} dims={}", node, list(dimensions))
        }
        Command::SetItemTag { item, tag, value } => {
            format!("setitemtag item={} tag={:?} value={}", item, tag, value)
        }
        Command::SetNodeTag {
            node,
            tag,
            value,
            position,
        } => {
            let mut line = format!("setnodetag node={} tag={:?} value={}", node, tag, value);
            if !position.is_empty() {
                let _ = write!(line, " pos={}", list(position));
            }
            line
        }
        Command::SetCycleTag { tag, value } => {
            format!("setcycletag tag={:?} value={}", tag, value)
        }
        Command::SetTagDescription { tag, description } => {
            format!("settagdescription tag={:?} description={:?}", tag, description)
        }
        Command::SetNodeInputBandwidth { node, bandwidth } => {
            format!("setnodeinputbandwidth node={} bandwidth={}", node, bandwidth)
        }
        Command::SetNodeOutputBandwidth { node, bandwidth } => {
            format!("setnodeoutputbandwidth node={} bandwidth={}", node, bandwidth)
        }
        Command::NewClock {
            id,
            frequency,
            skew,
            divisions,
            name,
        } => format!(
            "newclock {} name={:?} frequency={} skew={} divisions={}",
            id, name, frequency, skew, divisions
        ),
        Command::SetNodeClock { node, clock } => {
            format!("setnodeclock node={} clock={}", node, clock)
        }
        Command::Cycle { cycle } => format!("cycle {}", cycle),
        Command::CycleWithClock {
            clock,
            cycle,
            phase,
        } => format!(
            "cyclewithclock clock={} cycle={} phase={}",
            clock,
            cycle,
            phase.name()
        ),
        Command::Comment { magic, text } => {
            format!("comment magic={:#010x} text={:?}", magic, text)
        }
        Command::CommentBin { magic, data } => {
            let mut hex = String::with_capacity(data.len() * 2);
            for byte in data {
                let _ = write!(hex, "{:02x}", byte);
            }
            format!(
                "commentbin magic={:#010x} len={} data={}",
                magic,
                data.len(),
                hex
            )
        }
        Command::StartActivity { cycle } => format!("startactivity {}", cycle),
        Command::DefineTag { id, name } => format!("newtag {} name={:?}", id, name),
        Command::DefineString { id, value } => {
            format!("newstringvalue {} value={:?}", id, value)
        }
    }
}

impl TraceEncoder for AsciiEncoder {
    fn begin(&mut self, path: &Path, compressed: bool) -> TraceResult<()> {
        self.writer.open(path, compressed)?;
        self.encode(&Command::Version {
            major: FORMAT_MAJOR,
            minor: FORMAT_MINOR,
        })
    }

    fn encode(&mut self, command: &Command) -> TraceResult<()> {
        if matches!(
            command,
            Command::DefineTag { .. } | Command::DefineString { .. }
        ) {
            debug!("Ignoring {} command in text mode", command.name());
            return Ok(());
        }
        self.line.clear();
        self.line.push_str(&render(command));
        self.line.push('\n');
        self.writer.write(self.line.as_bytes())
    }

    fn is_open(&self) -> bool {
        self.writer.is_open()
    }

    fn flush(&mut self) -> TraceResult<()> {
        self.writer.flush()
    }

    fn close(&mut self) -> TraceResult<()> {
        self.writer.close()
    }

    fn bytes_written(&self) -> u64 {
        self.writer.bytes_written()
    }

    fn name(&self) -> &'static str {
        "ascii"
    }
}
