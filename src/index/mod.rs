//! Lookup structures used by the encoder and the command storage.

pub mod instance_index;
pub mod intern;

pub use instance_index::InstanceIndex;
pub use intern::InternTable;
