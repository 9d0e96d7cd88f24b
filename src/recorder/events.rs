//! Per-cycle calls: items, moves, occupancy, tags, cycles and comments.

use log::debug;

use crate::engine::{EnterAction, FlushedExit};
use crate::types::tag::{validate_description, validate_tag_name};
use crate::types::{
    ClockId, ClockPhase, Command, EdgeId, ItemId, NodeId, TagValue, TraceError, TraceResult,
    DEFAULT_CLOCK, EMBEDDED_ARCHIVE_MAGIC, INVALID_ITEM, MAX_MOVE_ITEMS,
};

use super::Recorder;

fn check_item(item: ItemId) -> TraceResult<()> {
    if item == INVALID_ITEM {
        return Err(TraceError::InvalidItem);
    }
    Ok(())
}

impl Recorder {
    /// Create an item with the next id. Ids wrap around and never reuse 0.
    pub fn new_item(&mut self, persistent: bool) -> TraceResult<ItemId> {
        let id = self.next_item;
        self.dispatch(Command::NewItem { id }, persistent)?;
        self.next_item = match id.wrapping_add(1) {
            INVALID_ITEM => 1,
            next => next,
        };
        Ok(id)
    }

    /// Create an item with an explicit id.
    pub fn new_item_with_id(&mut self, id: ItemId, persistent: bool) -> TraceResult<()> {
        check_item(id)?;
        self.dispatch(Command::NewItem { id }, persistent)?;
        Ok(())
    }

    /// Retire an item.
    pub fn delete_item(&mut self, id: ItemId, persistent: bool) -> TraceResult<()> {
        check_item(id)?;
        self.dispatch(Command::DeleteItem { id }, persistent)?;
        Ok(())
    }

    /// Move a group of items over `edge` in this cycle.
    pub fn move_items(
        &mut self,
        edge: EdgeId,
        items: &[ItemId],
        persistent: bool,
    ) -> TraceResult<()> {
        self.move_items_with_positions(edge, items, &[], persistent)
    }

    /// Move a group of items over `edge`, each on a lane below the edge
    /// bandwidth. `positions` is empty or pairs with `items`.
    pub fn move_items_with_positions(
        &mut self,
        edge: EdgeId,
        items: &[ItemId],
        positions: &[u32],
        persistent: bool,
    ) -> TraceResult<()> {
        let info = self.topology.edge(edge)?;
        if items.len() > MAX_MOVE_ITEMS {
            return Err(TraceError::InvalidMove {
                edge,
                reason: "too many items",
            });
        }
        if !positions.is_empty() && positions.len() != items.len() {
            return Err(TraceError::InvalidMove {
                edge,
                reason: "positions do not pair with items",
            });
        }
        if positions.iter().any(|&p| p >= info.bandwidth) {
            return Err(TraceError::InvalidMove {
                edge,
                reason: "position beyond edge bandwidth",
            });
        }
        if items.contains(&INVALID_ITEM) {
            return Err(TraceError::InvalidItem);
        }
        if items.is_empty() {
            return Ok(());
        }

        let command = Command::MoveItems {
            edge,
            items: items.to_vec(),
            positions: positions.to_vec(),
        };
        self.dispatch(command, persistent)?;
        if let Some(bandwidth) = self.bandwidth.as_mut() {
            bandwidth.add(edge, items.len());
        }
        Ok(())
    }

    pub fn move_item(&mut self, edge: EdgeId, item: ItemId, persistent: bool) -> TraceResult<()> {
        self.move_items_with_positions(edge, &[item], &[], persistent)
    }

    /// Put `item` into a slot of `node`.
    ///
    /// On autoflush nodes an item already in the slot is not re-announced,
    /// and a different occupant is exited first. An occupant the current
    /// sink never saw is neither skipped nor exited.
    pub fn enter_node(
        &mut self,
        node: NodeId,
        item: ItemId,
        position: &[u32],
        persistent: bool,
    ) -> TraceResult<()> {
        check_item(item)?;
        self.topology.check_position(node, position)?;

        let Some(occupancy) = self.autoflush.get(node) else {
            let command = Command::EnterNode {
                node,
                item,
                position: position.to_vec(),
            };
            self.dispatch(command, persistent)?;
            return Ok(());
        };

        let slot = occupancy.layout().flatten(position);
        let announced = match occupancy.plan_enter(slot, item) {
            EnterAction::AlreadyPresent => true,
            EnterAction::Enter => {
                let command = Command::EnterNode {
                    node,
                    item,
                    position: position.to_vec(),
                };
                self.dispatch(command, persistent)?
            }
            EnterAction::Replace {
                evicted,
                persistent: evicted_persistent,
            } => {
                let exit = Command::ExitNode {
                    node,
                    item: evicted,
                    position: position.to_vec(),
                };
                self.dispatch(exit, evicted_persistent)?;
                self.stats.exits_synthesized += 1;
                let command = Command::EnterNode {
                    node,
                    item,
                    position: position.to_vec(),
                };
                self.dispatch(command, persistent)?
            }
        };
        if let Some(occupancy) = self.autoflush.get_mut(node) {
            occupancy.commit_enter(slot, item, persistent, announced);
        }
        Ok(())
    }

    /// Take `item` out of a slot of `node`. Autoflush nodes only accept
    /// this when created relaxed.
    pub fn exit_node(
        &mut self,
        node: NodeId,
        item: ItemId,
        position: &[u32],
        persistent: bool,
    ) -> TraceResult<()> {
        check_item(item)?;
        self.topology.check_position(node, position)?;

        let slot = match self.autoflush.get(node) {
            Some(occupancy) => {
                let slot = occupancy.layout().flatten(position);
                occupancy.check_exit(node, slot, item)?;
                Some(slot)
            }
            None => None,
        };

        let command = Command::ExitNode {
            node,
            item,
            position: position.to_vec(),
        };
        self.dispatch(command, persistent)?;

        if let (Some(slot), Some(occupancy)) = (slot, self.autoflush.get_mut(node)) {
            occupancy.commit_exit(slot);
        }
        Ok(())
    }

    /// [`enter_node`](Self::enter_node) for one-dimensional nodes.
    pub fn enter_node_slot(
        &mut self,
        node: NodeId,
        item: ItemId,
        slot: u32,
        persistent: bool,
    ) -> TraceResult<()> {
        self.enter_node(node, item, &[slot], persistent)
    }

    /// [`exit_node`](Self::exit_node) for one-dimensional nodes.
    pub fn exit_node_slot(
        &mut self,
        node: NodeId,
        item: ItemId,
        slot: u32,
        persistent: bool,
    ) -> TraceResult<()> {
        self.exit_node(node, item, &[slot], persistent)
    }

    /// Tag the whole node. With autocompression on, a value equal to the
    /// last one set for this node and tag is dropped.
    pub fn set_node_tag(
        &mut self,
        node: NodeId,
        tag: &str,
        value: impl Into<TagValue>,
        persistent: bool,
    ) -> TraceResult<()> {
        validate_tag_name(tag)?;
        let value = value.into();
        value.validate()?;
        self.topology.node(node)?;

        let autocompress = self.config.autocompress;
        if autocompress && self.tag_cache.is_repeat(node, tag, &value) {
            self.stats.tags_suppressed += 1;
            return Ok(());
        }
        let command = Command::SetNodeTag {
            node,
            tag: tag.to_string(),
            value: value.clone(),
            position: Vec::new(),
        };
        if self.dispatch(command, persistent)? && autocompress {
            self.tag_cache.update(node, tag, &value);
        }
        Ok(())
    }

    /// Tag one slot of a node. Never deduplicated.
    pub fn set_node_tag_at(
        &mut self,
        node: NodeId,
        position: &[u32],
        tag: &str,
        value: impl Into<TagValue>,
        persistent: bool,
    ) -> TraceResult<()> {
        validate_tag_name(tag)?;
        let value = value.into();
        value.validate()?;
        self.topology.check_position(node, position)?;

        let command = Command::SetNodeTag {
            node,
            tag: tag.to_string(),
            value,
            position: position.to_vec(),
        };
        self.dispatch(command, persistent)?;
        Ok(())
    }

    /// Tag an item.
    pub fn set_item_tag(
        &mut self,
        item: ItemId,
        tag: &str,
        value: impl Into<TagValue>,
        persistent: bool,
    ) -> TraceResult<()> {
        check_item(item)?;
        validate_tag_name(tag)?;
        let value = value.into();
        value.validate()?;
        let command = Command::SetItemTag {
            item,
            tag: tag.to_string(),
            value,
        };
        self.dispatch(command, persistent)?;
        Ok(())
    }

    /// Tag the current cycle.
    pub fn set_cycle_tag(
        &mut self,
        tag: &str,
        value: impl Into<TagValue>,
        persistent: bool,
    ) -> TraceResult<()> {
        validate_tag_name(tag)?;
        let value = value.into();
        value.validate()?;
        let command = Command::SetCycleTag {
            tag: tag.to_string(),
            value,
        };
        self.dispatch(command, persistent)?;
        Ok(())
    }

    /// Attach a human-readable description to a tag name.
    pub fn set_tag_description(
        &mut self,
        tag: &str,
        description: &str,
        persistent: bool,
    ) -> TraceResult<()> {
        validate_tag_name(tag)?;
        validate_description(description)?;
        let command = Command::SetTagDescription {
            tag: tag.to_string(),
            description: description.to_string(),
        };
        self.dispatch(command, persistent)?;
        Ok(())
    }

    /// Start cycle `cycle` on the single-clock timeline.
    ///
    /// Autoflush nodes of every clock domain are flushed first.
    pub fn cycle(&mut self, cycle: u64, persistent: bool) -> TraceResult<()> {
        let exits = self.autoflush.close_cycle(|_| true);
        self.emit_flushed(exits)?;
        if let Some(bandwidth) = self.bandwidth.as_mut() {
            bandwidth.close_cycle();
        }
        self.dispatch(Command::Cycle { cycle }, persistent)?;
        self.current_cycle = cycle;
        Ok(())
    }

    /// Start cycle `cycle` of clock domain `clock`.
    ///
    /// Only autoflush nodes attached to `clock` are flushed. Repeating the
    /// previous clocked cycle exactly does nothing.
    pub fn cycle_with_clock(
        &mut self,
        clock: ClockId,
        cycle: u64,
        phase: ClockPhase,
        persistent: bool,
    ) -> TraceResult<()> {
        if !self.topology.has_clock(clock) {
            return Err(TraceError::ClockNotFound(clock));
        }
        let key = (clock, cycle, phase);
        if self.last_clock_cycle == Some(key) {
            debug!("Skipping repeated cycle {} of clock {}", cycle, clock);
            return Ok(());
        }

        let topology = &self.topology;
        let exits = self.autoflush.close_cycle(|node| {
            topology
                .node(node)
                .map(|info| info.clock == clock)
                .unwrap_or(clock == DEFAULT_CLOCK)
        });
        self.emit_flushed(exits)?;
        if let Some(bandwidth) = self.bandwidth.as_mut() {
            bandwidth.close_cycle();
        }
        let command = Command::CycleWithClock {
            clock,
            cycle,
            phase,
        };
        self.dispatch(command, persistent)?;
        self.last_clock_cycle = Some(key);
        self.current_cycle = cycle;
        Ok(())
    }

    fn emit_flushed(&mut self, exits: Vec<(NodeId, FlushedExit)>) -> TraceResult<()> {
        for (node, exit) in exits {
            let command = Command::ExitNode {
                node,
                item: exit.item,
                position: exit.position,
            };
            self.dispatch(command, exit.persistent)?;
            self.stats.exits_synthesized += 1;
        }
        Ok(())
    }

    /// Free-form text comment. The embedded-archive magic is reserved.
    pub fn comment(&mut self, magic: u32, text: &str, persistent: bool) -> TraceResult<()> {
        if magic == EMBEDDED_ARCHIVE_MAGIC {
            return Err(TraceError::ReservedMagic(magic));
        }
        let command = Command::Comment {
            magic,
            text: text.to_string(),
        };
        self.dispatch(command, persistent)?;
        Ok(())
    }

    /// Binary comment. The embedded-archive magic is reserved.
    pub fn comment_bin(&mut self, magic: u32, data: &[u8], persistent: bool) -> TraceResult<()> {
        if magic == EMBEDDED_ARCHIVE_MAGIC {
            return Err(TraceError::ReservedMagic(magic));
        }
        let command = Command::CommentBin {
            magic,
            data: data.to_vec(),
        };
        self.dispatch(command, persistent)?;
        Ok(())
    }

    /// Mark the first cycle of interest, preceded by the embedded archive
    /// if one was set.
    pub fn start_activity(&mut self, first_cycle: u64, persistent: bool) -> TraceResult<()> {
        if let Some(archive) = self.embedded_archive.clone() {
            let command = Command::CommentBin {
                magic: EMBEDDED_ARCHIVE_MAGIC,
                data: archive,
            };
            self.dispatch(command, persistent)?;
            self.embedded_archive = None;
        }
        self.dispatch(
            Command::StartActivity { cycle: first_cycle },
            persistent,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::RecorderConfig;
    use super::*;
    use crate::format::TraceReader;
    use crate::types::{EdgeSpec, NodeSpec};
    use tempfile::tempdir;

    #[test]
    fn test_item_ids_skip_zero() {
        let dir = tempdir().unwrap();
        let mut rec = Recorder::new(RecorderConfig::new(dir.path().join("t.ptr")));
        rec.next_item = u32::MAX;
        assert_eq!(rec.new_item(false).unwrap(), u32::MAX);
        assert_eq!(rec.new_item(false).unwrap(), 1);
        assert!(matches!(
            rec.delete_item(0, false),
            Err(TraceError::InvalidItem)
        ));
    }

    #[test]
    fn test_move_validation() {
        let dir = tempdir().unwrap();
        let mut rec = Recorder::new(RecorderConfig::new(dir.path().join("t.ptr")));
        rec.new_node(NodeSpec::new("a")).unwrap();
        rec.new_node(NodeSpec::new("b")).unwrap();
        let edge = rec.new_edge(EdgeSpec::new(0, 1, "ab").bandwidth(2)).unwrap();

        assert!(matches!(
            rec.move_items(5, &[1], false),
            Err(TraceError::EdgeNotFound(5))
        ));
        assert!(matches!(
            rec.move_items_with_positions(edge, &[1, 2], &[0], false),
            Err(TraceError::InvalidMove { .. })
        ));
        assert!(matches!(
            rec.move_items_with_positions(edge, &[1], &[2], false),
            Err(TraceError::InvalidMove { .. })
        ));
        assert!(matches!(
            rec.move_items(edge, &[0], false),
            Err(TraceError::InvalidItem)
        ));
        rec.move_items_with_positions(edge, &[1, 2], &[0, 1], false)
            .unwrap();
    }

    #[test]
    fn test_reserved_magic() {
        let dir = tempdir().unwrap();
        let mut rec = Recorder::new(RecorderConfig::new(dir.path().join("t.ptr")));
        assert!(matches!(
            rec.comment(EMBEDDED_ARCHIVE_MAGIC, "x", false),
            Err(TraceError::ReservedMagic(_))
        ));
        assert!(matches!(
            rec.comment_bin(EMBEDDED_ARCHIVE_MAGIC, b"x", false),
            Err(TraceError::ReservedMagic(_))
        ));
        rec.comment(1, "hello", false).unwrap();
    }

    #[test]
    fn test_archive_precedes_start_activity() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.ptr");
        let mut rec = Recorder::new(RecorderConfig::new(&path));
        rec.set_embedded_archive(b"config".to_vec());
        rec.turn_on().unwrap();
        rec.start_activity(100, false).unwrap();
        rec.start_activity(200, false).unwrap();
        rec.close().unwrap();

        let commands = TraceReader::read_from_file(&path).unwrap();
        assert_eq!(
            &commands[1..],
            &[
                Command::CommentBin {
                    magic: EMBEDDED_ARCHIVE_MAGIC,
                    data: b"config".to_vec(),
                },
                Command::StartActivity { cycle: 100 },
                Command::StartActivity { cycle: 200 },
            ]
        );
    }

    #[test]
    fn test_tag_limits() {
        let dir = tempdir().unwrap();
        let mut rec = Recorder::new(RecorderConfig::new(dir.path().join("t.ptr")));
        let long_tag = "t".repeat(256);
        assert!(matches!(
            rec.set_cycle_tag(&long_tag, 1u8, false),
            Err(TraceError::TagNameTooLong { .. })
        ));
        let big_set = vec![0u64; 256];
        assert!(matches!(
            rec.set_cycle_tag("s", big_set, false),
            Err(TraceError::TagSetTooLong { .. })
        ));
        assert!(matches!(
            rec.set_tag_description("s", &"d".repeat(5000), false),
            Err(TraceError::TagStringTooLong { .. })
        ));
    }
}
