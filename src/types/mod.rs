//! All data types for the pipetrace library.

pub mod builder;
pub mod command;
pub mod error;
pub mod tag;

pub use builder::{ClockSpec, EdgeSpec, Instance, NodeSpec};
pub use command::{ClockPhase, Command, CommandCode};
pub use error::{TraceError, TraceResult};
pub use tag::TagValue;

/// Identifier of a node in the simulated structure.
pub type NodeId = u16;

/// Identifier of an edge between two nodes.
pub type EdgeId = u16;

/// Identifier of a dynamic item. Id 0 is reserved as invalid.
pub type ItemId = u32;

/// Identifier of a clock domain. Domain 0 always exists.
pub type ClockId = u16;

/// The reserved invalid item id.
pub const INVALID_ITEM: ItemId = 0;

/// The implicit clock domain used by the single-clock API.
pub const DEFAULT_CLOCK: ClockId = 0;

/// Wire format major version written in every `VERSION` command.
pub const FORMAT_MAJOR: u16 = 4;

/// Wire format minor version written in every `VERSION` command.
pub const FORMAT_MINOR: u16 = 0;

/// Maximum length of node, edge and clock names, in bytes.
pub const MAX_NAME_LEN: usize = 1024;

/// Maximum length of a tag name, in bytes.
pub const MAX_TAG_NAME_LEN: usize = 255;

/// Maximum length of a string tag value or tag description, in bytes.
pub const MAX_TAG_STRING_LEN: usize = 4096;

/// Maximum number of elements in a set-valued tag.
pub const MAX_TAG_SET_LEN: usize = 255;

/// Maximum number of dimensions of a node layout or position vector.
pub const MAX_DIMENSIONS: usize = 15;

/// Maximum number of items moved by a single `MoveItems` command.
pub const MAX_MOVE_ITEMS: usize = u16::MAX as usize;

/// Capacity of the tag-name interning table.
pub const TAG_TABLE_CAPACITY: usize = 256;

/// Capacity of the string-value interning table.
pub const STRING_TABLE_CAPACITY: usize = 65_536;

/// Magic number reserved for an archive blob embedded via `COMMENTBIN`.
pub const EMBEDDED_ARCHIVE_MAGIC: u32 = 0x4152_4348; // "ARCH"

/// Default size of the writer's output buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;
