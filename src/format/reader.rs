//! Decodes binary traces back into commands.

use std::collections::HashMap;
use std::path::Path;

use memmap2::Mmap;

use crate::types::error::{TraceError, TraceResult};
use crate::types::{ClockPhase, Command, CommandCode, TagValue, FORMAT_MAJOR};

use super::compression::{decompress_stream, is_compressed};
use super::width::{DeltaCursors, Width};

/// Reader for binary trace files.
pub struct TraceReader;

impl TraceReader {
    /// Memory-map a trace file and decode every command in it.
    pub fn read_from_file(path: &Path) -> TraceResult<Vec<Command>> {
        let file = std::fs::File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Err(TraceError::MissingVersion);
        }
        let mmap = unsafe { Mmap::map(&file)? };
        Self::decode(&mmap)
    }

    /// Decode a complete trace, plain or LZ4-compressed.
    pub fn decode(data: &[u8]) -> TraceResult<Vec<Command>> {
        if is_compressed(data) {
            let plain = decompress_stream(data)?;
            return TraceDecoder::new(&plain).collect();
        }
        TraceDecoder::new(data).collect()
    }
}

/// Bounds-checked little-endian cursor over a byte slice.
struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    fn bytes(&mut self, n: usize) -> TraceResult<&'a [u8]> {
        if self.pos + n > self.data.len() {
            return Err(TraceError::Truncated);
        }
        let start = self.pos;
        self.pos += n;
        Ok(&self.data[start..self.pos])
    }

    fn u8(&mut self) -> TraceResult<u8> {
        Ok(self.bytes(1)?[0])
    }

    fn u16(&mut self) -> TraceResult<u16> {
        let b = self.bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> TraceResult<u32> {
        let b = self.bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> TraceResult<u64> {
        let lo = self.u32()? as u64;
        let hi = self.u32()? as u64;
        Ok(lo | hi << 32)
    }

    fn signed(&mut self, width: Width) -> TraceResult<i64> {
        Ok(match width {
            Width::W8 => self.u8()? as i8 as i64,
            Width::W16 => self.u16()? as i16 as i64,
            Width::W32 => self.u32()? as i32 as i64,
            Width::W64 => self.u64()? as i64,
        })
    }

    fn unsigned(&mut self, width: Width) -> TraceResult<u64> {
        Ok(match width {
            Width::W8 => self.u8()? as u64,
            Width::W16 => self.u16()? as u64,
            Width::W32 => self.u32()? as u64,
            Width::W64 => self.u64()?,
        })
    }

    fn text(&mut self, len: usize) -> TraceResult<String> {
        let offset = self.pos as u64;
        let bytes = self.bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| TraceError::InvalidUtf8(offset))
    }

    fn short_text(&mut self) -> TraceResult<String> {
        let len = self.u16()? as usize;
        self.text(len)
    }
}

/// Streaming decoder yielding one command at a time.
///
/// Stops after the first error.
pub struct TraceDecoder<'a> {
    cursor: ByteCursor<'a>,
    cursors: DeltaCursors,
    tags: HashMap<u8, String>,
    strings: HashMap<u16, String>,
    seen_version: bool,
    failed: bool,
}

impl<'a> TraceDecoder<'a> {
    /// Create a decoder over uncompressed trace bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: ByteCursor { data, pos: 0 },
            cursors: DeltaCursors::default(),
            tags: HashMap::new(),
            strings: HashMap::new(),
            seen_version: false,
            failed: false,
        }
    }

    /// Byte offset of the next command.
    pub fn offset(&self) -> usize {
        self.cursor.pos
    }

    fn tag(&mut self) -> TraceResult<String> {
        let id = self.cursor.u8()?;
        self.tags.get(&id).cloned().ok_or(TraceError::UndefinedTag(id))
    }

    fn string(&mut self) -> TraceResult<String> {
        let id = self.cursor.u16()?;
        self.strings
            .get(&id)
            .cloned()
            .ok_or(TraceError::UndefinedString(id))
    }

    fn item(&mut self, width: Width) -> TraceResult<u32> {
        let delta = self.cursor.signed(width)?;
        Ok(self.cursors.apply_item(delta))
    }

    fn node(&mut self, width: Width) -> TraceResult<u16> {
        let delta = self.cursor.signed(width)?;
        Ok(self.cursors.apply_node(delta))
    }

    fn edge(&mut self, width: Width) -> TraceResult<u16> {
        let delta = self.cursor.signed(width)?;
        Ok(self.cursors.apply_edge(delta))
    }

    fn positions(&mut self, width: Width, count: usize) -> TraceResult<Vec<u32>> {
        (0..count)
            .map(|_| self.cursor.unsigned(width).map(|p| p as u32))
            .collect()
    }

    fn values(&mut self, width: Width, count: usize) -> TraceResult<Vec<u64>> {
        (0..count).map(|_| self.cursor.unsigned(width)).collect()
    }

    fn next_command(&mut self) -> TraceResult<Command> {
        let offset = self.cursor.pos as u64;
        let h0 = self.cursor.u8()?;
        let raw = h0 & CommandCode::MASK;
        let w = Width::from_bits(h0 >> 6);
        let code = CommandCode::from_u8(raw).ok_or(TraceError::UnknownCommand {
            code: raw,
            offset,
        })?;

        if !self.seen_version && code != CommandCode::Version {
            return Err(TraceError::MissingVersion);
        }

        let command = match code {
            CommandCode::Version => {
                let major = self.cursor.u16()?;
                let minor = self.cursor.u16()?;
                if major != FORMAT_MAJOR {
                    return Err(TraceError::UnsupportedVersion { major, minor });
                }
                self.seen_version = true;
                Command::Version { major, minor }
            }
            CommandCode::Cycle => Command::Cycle {
                cycle: self.cursor.unsigned(w)?,
            },
            CommandCode::StartActivity => Command::StartActivity {
                cycle: self.cursor.unsigned(w)?,
            },
            CommandCode::NewItem => Command::NewItem { id: self.item(w)? },
            CommandCode::DeleteItem => Command::DeleteItem { id: self.item(w)? },
            CommandCode::MoveItems => {
                let h1 = self.cursor.u8()?;
                let edge = self.edge(Width::from_bits(h1))?;
                let has_positions = h1 & 0x4 != 0;
                let pw = Width::from_bits(h1 >> 3);
                let count = self.cursor.u16()? as usize;
                let items = (0..count)
                    .map(|_| self.item(w))
                    .collect::<TraceResult<Vec<_>>>()?;
                let positions = if has_positions {
                    self.positions(pw, count)?
                } else {
                    Vec::new()
                };
                Command::MoveItems {
                    edge,
                    items,
                    positions,
                }
            }
            CommandCode::EnterNode | CommandCode::ExitNode => {
                let h1 = self.cursor.u8()?;
                let node = self.node(Width::from_bits(h1))?;
                let item = self.item(w)?;
                let position = self.positions(Width::from_bits(h1 >> 2), (h1 >> 4) as usize)?;
                if code == CommandCode::EnterNode {
                    Command::EnterNode {
                        node,
                        item,
                        position,
                    }
                } else {
                    Command::ExitNode {
                        node,
                        item,
                        position,
                    }
                }
            }
            CommandCode::NewNode => {
                let h1 = self.cursor.u8()?;
                let id = self.node(w)?;
                let parent = if h1 & 0x1 != 0 {
                    Some(self.cursor.u16()?)
                } else {
                    None
                };
                let instance = self.cursor.u16()?;
                let name = self.cursor.short_text()?;
                Command::NewNode {
                    id,
                    name,
                    parent,
                    instance,
                }
            }
            CommandCode::NewEdge => {
                let id = self.edge(w)?;
                let source = self.cursor.u16()?;
                let destination = self.cursor.u16()?;
                let bandwidth = self.cursor.u32()?;
                let latency = self.cursor.u32()?;
                let name = self.cursor.short_text()?;
                Command::NewEdge {
                    id,
                    source,
                    destination,
                    bandwidth,
                    latency,
                    name,
                }
            }
            CommandCode::SetNodeLayout => {
                let dims = (self.cursor.u8()? & 0xF) as usize;
                let node = self.node(w)?;
                let dimensions = (0..dims)
                    .map(|_| self.cursor.u32())
                    .collect::<TraceResult<Vec<_>>>()?;
                Command::SetNodeLayout { node, dimensions }
            }
            CommandCode::SetItemTagValue => {
                let vw = Width::from_bits(self.cursor.u8()?);
                let tag = self.tag()?;
                let item = self.item(w)?;
                let value = TagValue::Int(self.cursor.unsigned(vw)?);
                Command::SetItemTag { item, tag, value }
            }
            CommandCode::SetItemTagString => {
                let tag = self.tag()?;
                let value = TagValue::Str(self.string()?);
                let item = self.item(w)?;
                Command::SetItemTag { item, tag, value }
            }
            CommandCode::SetItemTagSet => {
                let vw = Width::from_bits(self.cursor.u8()?);
                let tag = self.tag()?;
                let count = self.cursor.u8()? as usize;
                let item = self.item(w)?;
                let value = TagValue::Set(self.values(vw, count)?);
                Command::SetItemTag { item, tag, value }
            }
            CommandCode::SetNodeTagValue
            | CommandCode::SetNodeTagString
            | CommandCode::SetNodeTagSet => {
                let h1 = self.cursor.u8()?;
                let vw = Width::from_bits(h1);
                let dims = ((h1 >> 2) & 0xF) as usize;
                let pw = Width::from_bits(h1 >> 6);
                let tag = self.tag()?;
                let string = if code == CommandCode::SetNodeTagString {
                    Some(self.string()?)
                } else {
                    None
                };
                let count = if code == CommandCode::SetNodeTagSet {
                    self.cursor.u8()? as usize
                } else {
                    0
                };
                let node = self.node(w)?;
                let position = self.positions(pw, dims)?;
                let value = match (code, string) {
                    (_, Some(s)) => TagValue::Str(s),
                    (CommandCode::SetNodeTagSet, None) => TagValue::Set(self.values(vw, count)?),
                    _ => TagValue::Int(self.cursor.unsigned(vw)?),
                };
                Command::SetNodeTag {
                    node,
                    tag,
                    value,
                    position,
                }
            }
            CommandCode::SetCycleTagValue => {
                let tag = self.tag()?;
                let value = TagValue::Int(self.cursor.unsigned(w)?);
                Command::SetCycleTag { tag, value }
            }
            CommandCode::SetCycleTagString => {
                let tag = self.tag()?;
                let value = TagValue::Str(self.string()?);
                Command::SetCycleTag { tag, value }
            }
            CommandCode::SetCycleTagSet => {
                let tag = self.tag()?;
                let count = self.cursor.u8()? as usize;
                let value = TagValue::Set(self.values(w, count)?);
                Command::SetCycleTag { tag, value }
            }
            CommandCode::Comment => {
                let magic = self.cursor.u32()?;
                let len = self.cursor.u32()? as usize;
                let text = self.cursor.text(len)?;
                Command::Comment { magic, text }
            }
            CommandCode::CommentBin => {
                let magic = self.cursor.u32()?;
                let len = self.cursor.u32()? as usize;
                let data = self.cursor.bytes(len)?.to_vec();
                Command::CommentBin { magic, data }
            }
            CommandCode::SetNodeInputBandwidth => {
                let node = self.node(w)?;
                let bandwidth = self.cursor.u32()?;
                Command::SetNodeInputBandwidth { node, bandwidth }
            }
            CommandCode::SetNodeOutputBandwidth => {
                let node = self.node(w)?;
                let bandwidth = self.cursor.u32()?;
                Command::SetNodeOutputBandwidth { node, bandwidth }
            }
            CommandCode::SetTagDescription => {
                let tag = self.tag()?;
                let description = self.cursor.short_text()?;
                Command::SetTagDescription { tag, description }
            }
            CommandCode::NewClock => {
                let id = self.cursor.u16()?;
                let frequency = self.cursor.u64()?;
                let skew = self.cursor.u16()?;
                let divisions = self.cursor.u16()?;
                let name = self.cursor.short_text()?;
                Command::NewClock {
                    id,
                    frequency,
                    skew,
                    divisions,
                    name,
                }
            }
            CommandCode::SetNodeClock => {
                let node = self.node(w)?;
                let clock = self.cursor.u16()?;
                Command::SetNodeClock { node, clock }
            }
            CommandCode::CycleWithClock => {
                let clock = self.cursor.u16()?;
                let phase_offset = self.cursor.pos as u64;
                let raw_phase = self.cursor.u8()?;
                let phase = ClockPhase::from_u8(raw_phase).ok_or(TraceError::InvalidPhase {
                    phase: raw_phase,
                    offset: phase_offset,
                })?;
                let cycle = self.cursor.unsigned(w)?;
                Command::CycleWithClock {
                    clock,
                    cycle,
                    phase,
                }
            }
            CommandCode::NewTag => {
                let id = self.cursor.u8()?;
                let name = self.cursor.short_text()?;
                self.tags.insert(id, name.clone());
                Command::DefineTag { id, name }
            }
            CommandCode::NewStringValue => {
                let id = self.cursor.u16()?;
                let value = self.cursor.short_text()?;
                self.strings.insert(id, value.clone());
                Command::DefineString { id, value }
            }
        };
        Ok(command)
    }
}

impl Iterator for TraceDecoder<'_> {
    type Item = TraceResult<Command>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if self.cursor.pos >= self.cursor.data.len() {
            if !self.seen_version {
                self.failed = true;
                return Some(Err(TraceError::MissingVersion));
            }
            return None;
        }
        let result = self.next_command();
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}
