//! Bit-packed binary encoder.
//!
//! Every command starts with a header byte: the low 6 bits hold the
//! [`CommandCode`], the high 2 bits a [`Width`] selector whose meaning
//! depends on the command (usually the width of the main id delta). Some
//! commands add a second header byte of small packed fields. Item, node and
//! edge ids travel as signed deltas from the previous id of the same kind.
//! Tag names and string values are interned: a `NEWTAG` / `NEWSTRINGVALUE`
//! definition precedes their first use, later uses carry only the id.

use std::path::Path;

use log::debug;

use crate::index::InternTable;
use crate::types::{
    ClockId, ClockPhase, Command, CommandCode, TagValue, TraceResult, FORMAT_MAJOR, FORMAT_MINOR,
    STRING_TABLE_CAPACITY, TAG_TABLE_CAPACITY,
};

use super::encoder::TraceEncoder;
use super::width::{header, DeltaCursors, WireBuf, Width};
use super::writer::TraceWriter;

/// Encoder producing the compact binary wire format.
pub struct BinaryEncoder {
    writer: TraceWriter,
    cursors: DeltaCursors,
    tags: InternTable,
    strings: InternTable,
    last_clock_cycle: Option<(ClockId, u64, ClockPhase)>,
    skipped_cycles: u64,
    buf: Vec<u8>,
}

impl BinaryEncoder {
    /// Create an encoder whose writer buffers `buffer_size` bytes.
    pub fn new(buffer_size: usize) -> Self {
        Self {
            writer: TraceWriter::new(buffer_size),
            cursors: DeltaCursors::default(),
            tags: InternTable::new(TAG_TABLE_CAPACITY),
            strings: InternTable::new(STRING_TABLE_CAPACITY),
            last_clock_cycle: None,
            skipped_cycles: 0,
            buf: Vec::with_capacity(64),
        }
    }

    /// Number of tag names evicted from the interning table.
    pub fn tag_evictions(&self) -> u64 {
        self.tags.evictions()
    }

    /// Number of string values evicted from the interning table.
    pub fn string_evictions(&self) -> u64 {
        self.strings.evictions()
    }

    /// Number of repeated clocked cycles that were not written.
    pub fn skipped_cycles(&self) -> u64 {
        self.skipped_cycles
    }

    fn tag_id(&mut self, tag: &str) -> TraceResult<u8> {
        let (id, is_new) = self.tags.get_mapping(tag.as_bytes());
        if is_new {
            let mut def = Vec::with_capacity(4 + tag.len());
            def.put_u8(header(CommandCode::NewTag as u8, Width::W8));
            def.put_u8(id as u8);
            def.put_short_bytes(tag.as_bytes());
            self.writer.write(&def)?;
        }
        Ok(id as u8)
    }

    fn string_id(&mut self, value: &str) -> TraceResult<u16> {
        let (id, is_new) = self.strings.get_mapping(value.as_bytes());
        if is_new {
            let mut def = Vec::with_capacity(5 + value.len());
            def.put_u8(header(CommandCode::NewStringValue as u8, Width::W8));
            def.put_u16(id as u16);
            def.put_short_bytes(value.as_bytes());
            self.writer.write(&def)?;
        }
        Ok(id as u16)
    }

    /// Build the bytes of `command` into `buf`. Returns false when nothing
    /// should be written.
    fn encode_into(&mut self, command: &Command, buf: &mut Vec<u8>) -> TraceResult<bool> {
        match command {
            Command::Version { major, minor } => {
                buf.put_u8(header(CommandCode::Version as u8, Width::W8));
                buf.put_u16(*major);
                buf.put_u16(*minor);
            }
            Command::NewNode {
                id,
                name,
                parent,
                instance,
            } => {
                let delta = self.cursors.node_delta(*id);
                let w = Width::for_signed(delta);
                buf.put_u8(header(CommandCode::NewNode as u8, w));
                buf.put_u8(parent.is_some() as u8);
                buf.put_signed(w, delta as i64);
                if let Some(parent) = parent {
                    buf.put_u16(*parent);
                }
                buf.put_u16(*instance);
                buf.put_short_bytes(name.as_bytes());
            }
            Command::NewEdge {
                id,
                source,
                destination,
                bandwidth,
                latency,
                name,
            } => {
                let delta = self.cursors.edge_delta(*id);
                let w = Width::for_signed(delta);
                buf.put_u8(header(CommandCode::NewEdge as u8, w));
                buf.put_signed(w, delta as i64);
                buf.put_u16(*source);
                buf.put_u16(*destination);
                buf.put_u32(*bandwidth);
                buf.put_u32(*latency);
                buf.put_short_bytes(name.as_bytes());
            }
            Command::NewItem { id } | Command::DeleteItem { id } => {
                let code = match command {
                    Command::NewItem { .. } => CommandCode::NewItem,
                    _ => CommandCode::DeleteItem,
                };
                let delta = self.cursors.item_delta(*id);
                let w = Width::for_signed(delta);
                buf.put_u8(header(code as u8, w));
                buf.put_signed(w, delta as i64);
            }
            Command::MoveItems {
                edge,
                items,
                positions,
            } => {
                let edge_delta = self.cursors.edge_delta(*edge);
                let ew = Width::for_signed(edge_delta);

                // One width for the whole item list: the widest step delta.
                let mut last = self.cursors.item;
                let mut iw = Width::W8;
                for &item in items {
                    iw = iw.max(Width::for_signed(item.wrapping_sub(last) as i32));
                    last = item;
                }
                let pw = Width::covering(positions.iter().map(|&p| p as u64));
                let has_positions = !positions.is_empty();

                buf.put_u8(header(CommandCode::MoveItems as u8, iw));
                buf.put_u8(ew as u8 | (has_positions as u8) << 2 | (pw as u8) << 3);
                buf.put_signed(ew, edge_delta as i64);
                buf.put_u16(items.len() as u16);
                for &item in items {
                    let delta = self.cursors.item_delta(item);
                    buf.put_signed(iw, delta as i64);
                }
                for &position in positions {
                    buf.put_unsigned(pw, position as u64);
                }
            }
            Command::EnterNode {
                node,
                item,
                position,
            }
            | Command::ExitNode {
                node,
                item,
                position,
            } => {
                let code = match command {
                    Command::EnterNode { .. } => CommandCode::EnterNode,
                    _ => CommandCode::ExitNode,
                };
                let node_delta = self.cursors.node_delta(*node);
                let nw = Width::for_signed(node_delta);
                let item_delta = self.cursors.item_delta(*item);
                let iw = Width::for_signed(item_delta);
                let pw = Width::covering(position.iter().map(|&p| p as u64));

                buf.put_u8(header(code as u8, iw));
                buf.put_u8(nw as u8 | (pw as u8) << 2 | (position.len() as u8) << 4);
                buf.put_signed(nw, node_delta as i64);
                buf.put_signed(iw, item_delta as i64);
                put_positions(buf, pw, position);
            }
            Command::SetNodeLayout { node, dimensions } => {
                let delta = self.cursors.node_delta(*node);
                let w = Width::for_signed(delta);
                buf.put_u8(header(CommandCode::SetNodeLayout as u8, w));
                buf.put_u8(dimensions.len() as u8);
                buf.put_signed(w, delta as i64);
                for &size in dimensions {
                    buf.put_u32(size);
                }
            }
            Command::SetItemTag { item, tag, value } => {
                let tag_id = self.tag_id(tag)?;
                match value {
                    TagValue::Int(v) => {
                        let delta = self.cursors.item_delta(*item);
                        let iw = Width::for_signed(delta);
                        let vw = Width::for_unsigned(*v);
                        buf.put_u8(header(CommandCode::SetItemTagValue as u8, iw));
                        buf.put_u8(vw as u8);
                        buf.put_u8(tag_id);
                        buf.put_signed(iw, delta as i64);
                        buf.put_unsigned(vw, *v);
                    }
                    TagValue::Str(s) => {
                        let string_id = self.string_id(s)?;
                        let delta = self.cursors.item_delta(*item);
                        let iw = Width::for_signed(delta);
                        buf.put_u8(header(CommandCode::SetItemTagString as u8, iw));
                        buf.put_u8(tag_id);
                        buf.put_u16(string_id);
                        buf.put_signed(iw, delta as i64);
                    }
                    TagValue::Set(values) => {
                        let delta = self.cursors.item_delta(*item);
                        let iw = Width::for_signed(delta);
                        let vw = Width::covering(values.iter().copied());
                        buf.put_u8(header(CommandCode::SetItemTagSet as u8, iw));
                        buf.put_u8(vw as u8);
                        buf.put_u8(tag_id);
                        buf.put_u8(values.len() as u8);
                        buf.put_signed(iw, delta as i64);
                        for &v in values {
                            buf.put_unsigned(vw, v);
                        }
                    }
                }
            }
            Command::SetNodeTag {
                node,
                tag,
                value,
                position,
            } => {
                let tag_id = self.tag_id(tag)?;
                let string_id = match value {
                    TagValue::Str(s) => Some(self.string_id(s)?),
                    _ => None,
                };
                let delta = self.cursors.node_delta(*node);
                let nw = Width::for_signed(delta);
                let pw = Width::covering(position.iter().map(|&p| p as u64));
                let (code, vw) = match value {
                    TagValue::Int(v) => (CommandCode::SetNodeTagValue, Width::for_unsigned(*v)),
                    TagValue::Str(_) => (CommandCode::SetNodeTagString, Width::W8),
                    TagValue::Set(values) => (
                        CommandCode::SetNodeTagSet,
                        Width::covering(values.iter().copied()),
                    ),
                };

                buf.put_u8(header(code as u8, nw));
                buf.put_u8(vw as u8 | (position.len() as u8) << 2 | (pw as u8) << 6);
                buf.put_u8(tag_id);
                if let Some(string_id) = string_id {
                    buf.put_u16(string_id);
                }
                if let TagValue::Set(values) = value {
                    buf.put_u8(values.len() as u8);
                }
                buf.put_signed(nw, delta as i64);
                put_positions(buf, pw, position);
                match value {
                    TagValue::Int(v) => buf.put_unsigned(vw, *v),
                    TagValue::Set(values) => {
                        for &v in values {
                            buf.put_unsigned(vw, v);
                        }
                    }
                    TagValue::Str(_) => {}
                }
            }
            Command::SetCycleTag { tag, value } => {
                let tag_id = self.tag_id(tag)?;
                match value {
                    TagValue::Int(v) => {
                        let vw = Width::for_unsigned(*v);
                        buf.put_u8(header(CommandCode::SetCycleTagValue as u8, vw));
                        buf.put_u8(tag_id);
                        buf.put_unsigned(vw, *v);
                    }
                    TagValue::Str(s) => {
                        let string_id = self.string_id(s)?;
                        buf.put_u8(header(CommandCode::SetCycleTagString as u8, Width::W8));
                        buf.put_u8(tag_id);
                        buf.put_u16(string_id);
                    }
                    TagValue::Set(values) => {
                        let vw = Width::covering(values.iter().copied());
                        buf.put_u8(header(CommandCode::SetCycleTagSet as u8, vw));
                        buf.put_u8(tag_id);
                        buf.put_u8(values.len() as u8);
                        for &v in values {
                            buf.put_unsigned(vw, v);
                        }
                    }
                }
            }
            Command::SetTagDescription { tag, description } => {
                let tag_id = self.tag_id(tag)?;
                buf.put_u8(header(CommandCode::SetTagDescription as u8, Width::W8));
                buf.put_u8(tag_id);
                buf.put_short_bytes(description.as_bytes());
            }
            Command::SetNodeInputBandwidth { node, bandwidth }
            | Command::SetNodeOutputBandwidth { node, bandwidth } => {
                let code = match command {
                    Command::SetNodeInputBandwidth { .. } => CommandCode::SetNodeInputBandwidth,
                    _ => CommandCode::SetNodeOutputBandwidth,
                };
                let delta = self.cursors.node_delta(*node);
                let w = Width::for_signed(delta);
                buf.put_u8(header(code as u8, w));
                buf.put_signed(w, delta as i64);
                buf.put_u32(*bandwidth);
            }
            Command::NewClock {
                id,
                frequency,
                skew,
                divisions,
                name,
            } => {
                buf.put_u8(header(CommandCode::NewClock as u8, Width::W8));
                buf.put_u16(*id);
                buf.put_u64(*frequency);
                buf.put_u16(*skew);
                buf.put_u16(*divisions);
                buf.put_short_bytes(name.as_bytes());
            }
            Command::SetNodeClock { node, clock } => {
                let delta = self.cursors.node_delta(*node);
                let w = Width::for_signed(delta);
                buf.put_u8(header(CommandCode::SetNodeClock as u8, w));
                buf.put_signed(w, delta as i64);
                buf.put_u16(*clock);
            }
            Command::Cycle { cycle } | Command::StartActivity { cycle } => {
                let code = match command {
                    Command::Cycle { .. } => CommandCode::Cycle,
                    _ => CommandCode::StartActivity,
                };
                let w = Width::for_unsigned(*cycle);
                buf.put_u8(header(code as u8, w));
                buf.put_unsigned(w, *cycle);
            }
            Command::CycleWithClock {
                clock,
                cycle,
                phase,
            } => {
                let key = (*clock, *cycle, *phase);
                if self.last_clock_cycle == Some(key) {
                    self.skipped_cycles += 1;
                    return Ok(false);
                }
                self.last_clock_cycle = Some(key);
                let w = Width::for_unsigned(*cycle);
                buf.put_u8(header(CommandCode::CycleWithClock as u8, w));
                buf.put_u16(*clock);
                buf.put_u8(*phase as u8);
                buf.put_unsigned(w, *cycle);
            }
            Command::Comment { magic, text } => {
                buf.put_u8(header(CommandCode::Comment as u8, Width::W8));
                buf.put_u32(*magic);
                buf.put_long_bytes(text.as_bytes());
            }
            Command::CommentBin { magic, data } => {
                buf.put_u8(header(CommandCode::CommentBin as u8, Width::W8));
                buf.put_u32(*magic);
                buf.put_long_bytes(data);
            }
            Command::DefineTag { .. } | Command::DefineString { .. } => {
                // The encoder owns the interning tables and emits its own.
                debug!("Ignoring explicit {} command", command.name());
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn put_positions(buf: &mut Vec<u8>, width: Width, position: &[u32]) {
    for &p in position {
        buf.put_unsigned(width, p as u64);
    }
}

impl TraceEncoder for BinaryEncoder {
    fn begin(&mut self, path: &Path, compressed: bool) -> TraceResult<()> {
        self.writer.open(path, compressed)?;
        self.cursors.reset();
        self.tags.clear();
        self.strings.clear();
        self.last_clock_cycle = None;
        self.encode(&Command::Version {
            major: FORMAT_MAJOR,
            minor: FORMAT_MINOR,
        })
    }

    fn encode(&mut self, command: &Command) -> TraceResult<()> {
        let mut buf = std::mem::take(&mut self.buf);
        buf.clear();
        let result = match self.encode_into(command, &mut buf) {
            Ok(true) => self.writer.write(&buf),
            Ok(false) => Ok(()),
            Err(e) => Err(e),
        };
        self.buf = buf;
        result
    }

    fn is_open(&self) -> bool {
        self.writer.is_open()
    }

    fn flush(&mut self) -> TraceResult<()> {
        self.writer.flush()
    }

    fn close(&mut self) -> TraceResult<()> {
        if self.tags.evictions() > 0 || self.strings.evictions() > 0 {
            debug!(
                "Interning evictions: {} tags, {} strings",
                self.tags.evictions(),
                self.strings.evictions()
            );
        }
        self.writer.close()
    }

    fn bytes_written(&self) -> u64 {
        self.writer.bytes_written()
    }

    fn name(&self) -> &'static str {
        "binary"
    }
}
