//! Error types for the pipetrace library.

use thiserror::Error;

use super::{ClockId, EdgeId, NodeId};

/// All errors that can occur while recording or reading a trace.
///
/// Everything except `Io` and `Compression` is a caller-contract violation:
/// the simulator's bookkeeping is already inconsistent and the run should
/// stop.
#[derive(Error, Debug)]
pub enum TraceError {
    /// A node, edge or clock name exceeds the maximum length.
    #[error("Name exceeds maximum length: {len} > {max}")]
    NameTooLong { len: usize, max: usize },

    /// A tag name exceeds the maximum length.
    #[error("Tag name exceeds maximum length: {len} > {max}")]
    TagNameTooLong { len: usize, max: usize },

    /// A string tag value or description exceeds the maximum length.
    #[error("Tag string exceeds maximum length: {len} > {max}")]
    TagStringTooLong { len: usize, max: usize },

    /// A set-valued tag has too many elements.
    #[error("Tag set has too many elements: {len} > {max}")]
    TagSetTooLong { len: usize, max: usize },

    /// Item id 0 was used.
    #[error("Item id 0 is reserved and cannot be used")]
    InvalidItem,

    /// A node id was referenced before being created.
    #[error("Node ID {0} not found")]
    NodeNotFound(NodeId),

    /// An edge id was referenced before being created.
    #[error("Edge ID {0} not found")]
    EdgeNotFound(EdgeId),

    /// A clock id was referenced before being created.
    #[error("Clock ID {0} not found")]
    ClockNotFound(ClockId),

    /// A node id was defined twice.
    #[error("Node ID {0} already defined")]
    DuplicateNode(NodeId),

    /// An edge id was defined twice.
    #[error("Edge ID {0} already defined")]
    DuplicateEdge(EdgeId),

    /// All ids of a 16-bit identifier space are taken.
    #[error("No free {0} ids left")]
    IdSpaceExhausted(&'static str),

    /// The layout of a node was set more than once.
    #[error("Layout of node {0} already set")]
    LayoutAlreadySet(NodeId),

    /// A layout has no dimensions or a zero-sized dimension.
    #[error("Invalid layout for node {0}: every dimension must be non-zero")]
    InvalidLayout(NodeId),

    /// An autoflush node was used before its layout was set.
    #[error("Autoflush node {0} has no layout")]
    MissingLayout(NodeId),

    /// Too many dimensions in a layout or position vector.
    #[error("Too many dimensions: {got} > {max}")]
    TooManyDimensions { got: usize, max: usize },

    /// A position vector does not match the node layout.
    #[error("Position dimension mismatch on node {node}: expected {expected}, got {got}")]
    DimensionMismatch {
        node: NodeId,
        expected: usize,
        got: usize,
    },

    /// A position coordinate is outside the node layout.
    #[error("Position {position} out of range on node {node} (dimension {dimension} has size {size})")]
    PositionOutOfRange {
        node: NodeId,
        dimension: usize,
        position: u32,
        size: u32,
    },

    /// ExitNode on an autoflush node that was not created relaxed.
    #[error("ExitNode not allowed on autoflush node {0}")]
    ExitOnAutoflush(NodeId),

    /// ExitNode does not match the item occupying the slot.
    #[error("ExitNode of item {item} on node {node} does not match occupant {occupant}")]
    ExitMismatch {
        node: NodeId,
        item: u32,
        occupant: u32,
    },

    /// MoveItems carries too many items, or positions do not pair with items.
    #[error("Invalid MoveItems on edge {edge}: {reason}")]
    InvalidMove { edge: EdgeId, reason: &'static str },

    /// A comment used a magic number reserved by the recorder.
    #[error("Comment magic {0:#x} is reserved")]
    ReservedMagic(u32),

    /// The output sink is not open.
    #[error("Trace sink is not open")]
    SinkClosed,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Compression error.
    #[error("Compression error: {0}")]
    Compression(String),

    /// Trace is empty or truncated.
    #[error("Trace is empty or truncated")]
    Truncated,

    /// Unknown command code at a given offset.
    #[error("Unknown command code {code} at offset {offset}")]
    UnknownCommand { code: u8, offset: u64 },

    /// The trace does not start with a version command.
    #[error("Trace does not start with a VERSION command")]
    MissingVersion,

    /// Unsupported trace format version.
    #[error("Unsupported format version: {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },

    /// A clock phase byte other than 0 or 1.
    #[error("Invalid clock phase {phase} at offset {offset}")]
    InvalidPhase { phase: u8, offset: u64 },

    /// A tag id was used before its definition.
    #[error("Tag id {0} used before definition")]
    UndefinedTag(u8),

    /// A string id was used before its definition.
    #[error("String id {0} used before definition")]
    UndefinedString(u16),

    /// Text in the trace is not valid UTF-8.
    #[error("Invalid UTF-8 at offset {0}")]
    InvalidUtf8(u64),
}

/// Convenience result type for pipetrace operations.
pub type TraceResult<T> = Result<T, TraceError>;
