//! The command model: every event the recorder can put in a trace.

use serde::Serialize;

use super::{ClockId, EdgeId, ItemId, NodeId, TagValue};

/// Wire code of a command (low 6 bits of its first byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum CommandCode {
    Cycle = 0,
    NewItem = 1,
    MoveItems = 2,
    DeleteItem = 3,
    EnterNode = 4,
    ExitNode = 5,
    NewNode = 6,
    NewEdge = 7,
    SetNodeLayout = 8,
    SetItemTagValue = 9,
    SetItemTagString = 10,
    SetItemTagSet = 11,
    SetNodeTagValue = 12,
    SetNodeTagString = 13,
    SetNodeTagSet = 14,
    SetCycleTagValue = 15,
    SetCycleTagString = 16,
    SetCycleTagSet = 17,
    Comment = 18,
    CommentBin = 19,
    SetNodeInputBandwidth = 20,
    SetNodeOutputBandwidth = 21,
    SetTagDescription = 22,
    NewClock = 23,
    SetNodeClock = 24,
    CycleWithClock = 25,
    StartActivity = 26,
    NewTag = 27,
    NewStringValue = 28,
    Version = 29,
}

impl CommandCode {
    /// Mask selecting the command code bits of a header byte.
    pub const MASK: u8 = 0x3F;

    /// Convert a u8 value to a CommandCode, returning None for invalid values.
    pub fn from_u8(value: u8) -> Option<Self> {
        use CommandCode::*;
        let code = match value {
            0 => Cycle,
            1 => NewItem,
            2 => MoveItems,
            3 => DeleteItem,
            4 => EnterNode,
            5 => ExitNode,
            6 => NewNode,
            7 => NewEdge,
            8 => SetNodeLayout,
            9 => SetItemTagValue,
            10 => SetItemTagString,
            11 => SetItemTagSet,
            12 => SetNodeTagValue,
            13 => SetNodeTagString,
            14 => SetNodeTagSet,
            15 => SetCycleTagValue,
            16 => SetCycleTagString,
            17 => SetCycleTagSet,
            18 => Comment,
            19 => CommentBin,
            20 => SetNodeInputBandwidth,
            21 => SetNodeOutputBandwidth,
            22 => SetTagDescription,
            23 => NewClock,
            24 => SetNodeClock,
            25 => CycleWithClock,
            26 => StartActivity,
            27 => NewTag,
            28 => NewStringValue,
            29 => Version,
            _ => return None,
        };
        Some(code)
    }
}

/// Phase of a clock edge reported with a multi-clock cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ClockPhase {
    High = 0,
    Low = 1,
}

impl ClockPhase {
    /// Convert a u8 value to a ClockPhase, returning None for invalid values.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::High),
            1 => Some(Self::Low),
            _ => None,
        }
    }

    /// Return a human-readable name for this phase.
    pub fn name(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Low => "low",
        }
    }
}

/// One logical trace command.
///
/// Commands own their payloads, so a stored command is independent of the
/// buffers the caller passed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Version {
        major: u16,
        minor: u16,
    },
    NewNode {
        id: NodeId,
        name: String,
        parent: Option<NodeId>,
        instance: u16,
    },
    NewEdge {
        id: EdgeId,
        source: NodeId,
        destination: NodeId,
        bandwidth: u32,
        latency: u32,
        name: String,
    },
    NewItem {
        id: ItemId,
    },
    DeleteItem {
        id: ItemId,
    },
    MoveItems {
        edge: EdgeId,
        items: Vec<ItemId>,
        /// Empty, or one position per item.
        positions: Vec<u32>,
    },
    EnterNode {
        node: NodeId,
        item: ItemId,
        position: Vec<u32>,
    },
    ExitNode {
        node: NodeId,
        item: ItemId,
        position: Vec<u32>,
    },
    SetNodeLayout {
        node: NodeId,
        dimensions: Vec<u32>,
    },
    SetItemTag {
        item: ItemId,
        tag: String,
        value: TagValue,
    },
    SetNodeTag {
        node: NodeId,
        tag: String,
        value: TagValue,
        /// Empty for a tag on the whole node.
        position: Vec<u32>,
    },
    SetCycleTag {
        tag: String,
        value: TagValue,
    },
    SetTagDescription {
        tag: String,
        description: String,
    },
    SetNodeInputBandwidth {
        node: NodeId,
        bandwidth: u32,
    },
    SetNodeOutputBandwidth {
        node: NodeId,
        bandwidth: u32,
    },
    NewClock {
        id: ClockId,
        frequency: u64,
        skew: u16,
        divisions: u16,
        name: String,
    },
    SetNodeClock {
        node: NodeId,
        clock: ClockId,
    },
    Cycle {
        cycle: u64,
    },
    CycleWithClock {
        clock: ClockId,
        cycle: u64,
        phase: ClockPhase,
    },
    Comment {
        magic: u32,
        text: String,
    },
    CommentBin {
        magic: u32,
        data: Vec<u8>,
    },
    StartActivity {
        cycle: u64,
    },
    /// Wire-only: binds a tag id to its name.
    DefineTag {
        id: u8,
        name: String,
    },
    /// Wire-only: binds a string id to its value.
    DefineString {
        id: u16,
        value: String,
    },
}

impl Command {
    /// Return a short lowercase name for this command.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Version { .. } => "version",
            Command::NewNode { .. } => "newnode",
            Command::NewEdge { .. } => "newedge",
            Command::NewItem { .. } => "newitem",
            Command::DeleteItem { .. } => "deleteitem",
            Command::MoveItems { .. } => "moveitems",
            Command::EnterNode { .. } => "enternode",
            Command::ExitNode { .. } => "exitnode",
            Command::SetNodeLayout { .. } => "setnodelayout",
            Command::SetItemTag { .. } => "setitemtag",
            Command::SetNodeTag { .. } => "setnodetag",
            Command::SetCycleTag { .. } => "setcycletag",
            Command::SetTagDescription { .. } => "settagdescription",
            Command::SetNodeInputBandwidth { .. } => "setnodeinputbandwidth",
            Command::SetNodeOutputBandwidth { .. } => "setnodeoutputbandwidth",
            Command::NewClock { .. } => "newclock",
            Command::SetNodeClock { .. } => "setnodeclock",
            Command::Cycle { .. } => "cycle",
            Command::CycleWithClock { .. } => "cyclewithclock",
            Command::Comment { .. } => "comment",
            Command::CommentBin { .. } => "commentbin",
            Command::StartActivity { .. } => "startactivity",
            Command::DefineTag { .. } => "newtag",
            Command::DefineString { .. } => "newstringvalue",
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_code_roundtrip() {
        for val in 0u8..=29 {
            let code = CommandCode::from_u8(val).unwrap();
            assert_eq!(code as u8, val);
        }
        assert!(CommandCode::from_u8(30).is_none());
        assert!(CommandCode::from_u8(CommandCode::MASK).is_none());
    }

    #[test]
    fn test_clock_phase() {
        assert_eq!(ClockPhase::from_u8(0), Some(ClockPhase::High));
        assert_eq!(ClockPhase::from_u8(1), Some(ClockPhase::Low));
        assert!(ClockPhase::from_u8(2).is_none());
        assert_eq!(ClockPhase::Low.name(), "low");
    }
}
