//! Value widths, delta cursors and little-endian byte building.

use crate::types::{EdgeId, ItemId, NodeId};

/// Width selector stored in two header bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Width {
    W8 = 0,
    W16 = 1,
    W32 = 2,
    W64 = 3,
}

impl Width {
    /// Decode the two low bits of `bits`.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x3 {
            0 => Width::W8,
            1 => Width::W16,
            2 => Width::W32,
            _ => Width::W64,
        }
    }

    /// Number of bytes a value of this width occupies.
    pub fn bytes(self) -> usize {
        match self {
            Width::W8 => 1,
            Width::W16 => 2,
            Width::W32 => 4,
            Width::W64 => 8,
        }
    }

    /// Smallest width holding a signed delta. Deltas never need 64 bits.
    pub fn for_signed(value: i32) -> Self {
        if i8::try_from(value).is_ok() {
            Width::W8
        } else if i16::try_from(value).is_ok() {
            Width::W16
        } else {
            Width::W32
        }
    }

    /// Smallest width holding an unsigned value.
    pub fn for_unsigned(value: u64) -> Self {
        if value <= u8::MAX as u64 {
            Width::W8
        } else if value <= u16::MAX as u64 {
            Width::W16
        } else if value <= u32::MAX as u64 {
            Width::W32
        } else {
            Width::W64
        }
    }

    /// Smallest width holding every value of the iterator (W8 when empty).
    pub fn covering<I: IntoIterator<Item = u64>>(values: I) -> Self {
        values
            .into_iter()
            .map(Width::for_unsigned)
            .max()
            .unwrap_or(Width::W8)
    }
}

/// Build a header byte from a command code and a width.
pub fn header(code: u8, width: Width) -> u8 {
    (code & 0x3F) | ((width as u8) << 6)
}

/// Per-kind "last id" cursors used for delta encoding.
///
/// Encoder and reader keep identical cursors; both start at 0 on every new
/// stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeltaCursors {
    pub item: ItemId,
    pub node: NodeId,
    pub edge: EdgeId,
}

impl DeltaCursors {
    /// Delta to `id` from the last item, advancing the cursor.
    ///
    /// Item ids span 32 bits, so deltas wrap modulo 2^32.
    pub fn item_delta(&mut self, id: ItemId) -> i32 {
        let delta = id.wrapping_sub(self.item) as i32;
        self.item = id;
        delta
    }

    /// Delta to `id` from the last node, advancing the cursor.
    pub fn node_delta(&mut self, id: NodeId) -> i32 {
        let delta = id as i32 - self.node as i32;
        self.node = id;
        delta
    }

    /// Delta to `id` from the last edge, advancing the cursor.
    pub fn edge_delta(&mut self, id: EdgeId) -> i32 {
        let delta = id as i32 - self.edge as i32;
        self.edge = id;
        delta
    }

    /// Apply an item delta read from the wire.
    pub fn apply_item(&mut self, delta: i64) -> ItemId {
        self.item = self.item.wrapping_add(delta as i32 as u32);
        self.item
    }

    /// Apply a node delta read from the wire.
    pub fn apply_node(&mut self, delta: i64) -> NodeId {
        self.node = (self.node as i64 + delta) as NodeId;
        self.node
    }

    /// Apply an edge delta read from the wire.
    pub fn apply_edge(&mut self, delta: i64) -> EdgeId {
        self.edge = (self.edge as i64 + delta) as EdgeId;
        self.edge
    }

    /// Reset all cursors to 0.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Little-endian appends onto a byte buffer.
pub trait WireBuf {
    fn put_u8(&mut self, value: u8);
    fn put_u16(&mut self, value: u16);
    fn put_u32(&mut self, value: u32);
    fn put_u64(&mut self, value: u64);
    fn put_signed(&mut self, width: Width, value: i64);
    fn put_unsigned(&mut self, width: Width, value: u64);
    /// u16 length prefix followed by the bytes.
    fn put_short_bytes(&mut self, bytes: &[u8]);
    /// u32 length prefix followed by the bytes.
    fn put_long_bytes(&mut self, bytes: &[u8]);
}

impl WireBuf for Vec<u8> {
    fn put_u8(&mut self, value: u8) {
        self.push(value);
    }

    fn put_u16(&mut self, value: u16) {
        self.extend_from_slice(&value.to_le_bytes());
    }

    fn put_u32(&mut self, value: u32) {
        self.extend_from_slice(&value.to_le_bytes());
    }

    fn put_u64(&mut self, value: u64) {
        self.extend_from_slice(&value.to_le_bytes());
    }

    fn put_signed(&mut self, width: Width, value: i64) {
        match width {
            Width::W8 => self.extend_from_slice(&(value as i8).to_le_bytes()),
            Width::W16 => self.extend_from_slice(&(value as i16).to_le_bytes()),
            Width::W32 => self.extend_from_slice(&(value as i32).to_le_bytes()),
            Width::W64 => self.extend_from_slice(&value.to_le_bytes()),
        }
    }

    fn put_unsigned(&mut self, width: Width, value: u64) {
        match width {
            Width::W8 => self.push(value as u8),
            Width::W16 => self.extend_from_slice(&(value as u16).to_le_bytes()),
            Width::W32 => self.extend_from_slice(&(value as u32).to_le_bytes()),
            Width::W64 => self.extend_from_slice(&value.to_le_bytes()),
        }
    }

    fn put_short_bytes(&mut self, bytes: &[u8]) {
        self.put_u16(bytes.len() as u16);
        self.extend_from_slice(bytes);
    }

    fn put_long_bytes(&mut self, bytes: &[u8]) {
        self.put_u32(bytes.len() as u32);
        self.extend_from_slice(bytes);
    }
}
