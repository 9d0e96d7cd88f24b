//! Replay buffer of persistent commands.

use log::debug;

use crate::format::TraceEncoder;
use crate::index::InstanceIndex;
use crate::types::{Command, TraceResult};

/// Persistent commands kept so a trace opened later still describes the
/// whole structure.
///
/// `all` holds every stored command for the life of the recorder and is
/// replayed into a freshly opened sink. `partial` holds only what was stored
/// while the recorder was off since the last `turn_on`, and is replayed into
/// a sink that already saw everything before it.
#[derive(Default)]
pub struct CommandStorage {
    all: Vec<Command>,
    partial: Vec<Command>,
    instances: InstanceIndex,
}

impl CommandStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `command` to the full list, and to the partial list when
    /// `also_partial` is set.
    pub fn store(&mut self, command: Command, also_partial: bool) {
        if also_partial {
            self.partial.push(command.clone());
        }
        self.all.push(command);
    }

    /// Replay every stored command in order.
    pub fn dump_all(&self, encoder: &mut dyn TraceEncoder) -> TraceResult<usize> {
        debug!("Replaying {} stored commands", self.all.len());
        replay(&self.all, encoder)
    }

    /// Replay the commands stored while off.
    pub fn dump_partial(&self, encoder: &mut dyn TraceEncoder) -> TraceResult<usize> {
        debug!("Replaying {} commands stored while off", self.partial.len());
        replay(&self.partial, encoder)
    }

    pub fn clear_partial(&mut self) {
        self.partial.clear();
    }

    /// Note that a node named `name` has instance `instance`.
    pub fn index_node(&mut self, name: &str, instance: u16) {
        self.instances.record(name, instance);
    }

    /// One plus the highest instance seen for `name`, or 0.
    pub fn instance_for(&self, name: &str) -> u16 {
        self.instances.next_instance(name)
    }

    /// Number of commands in the full list.
    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// Number of commands waiting in the partial list.
    pub fn partial_len(&self) -> usize {
        self.partial.len()
    }
}

fn replay(commands: &[Command], encoder: &mut dyn TraceEncoder) -> TraceResult<usize> {
    for command in commands {
        encoder.encode(command)?;
    }
    Ok(commands.len())
}
