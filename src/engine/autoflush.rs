//! Occupancy tracking for autoflush nodes.
//!
//! An autoflush node expects its occupants to be re-entered every cycle. A
//! slot entered in one cycle and not re-entered by the next processed cycle
//! boundary is vacated with a synthetic ExitNode, so the simulator never has
//! to report exits for such nodes.
//!
//! Occupants also remember whether their EnterNode reached the current
//! sink. An occupant the sink never saw is announced by its next enter and
//! is vacated silently.

use std::collections::{BTreeMap, BTreeSet};

use crate::graph::Layout;
use crate::types::{ItemId, NodeId, TraceError, TraceResult};

/// What an EnterNode on an autoflush slot turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnterAction {
    /// The slot is empty, or its occupant is unknown to the sink: emit
    /// the enter.
    Enter,
    /// The same item is already there: emit nothing.
    AlreadyPresent,
    /// Another item is there: emit its exit, then the enter.
    Replace { evicted: ItemId, persistent: bool },
}

/// A synthetic exit produced at a cycle boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushedExit {
    pub item: ItemId,
    pub position: Vec<u32>,
    pub persistent: bool,
}

#[derive(Debug, Clone, Copy)]
struct Occupant {
    item: ItemId,
    persistent: bool,
    /// Whether the current sink holds this occupant's EnterNode.
    announced: bool,
}

/// Slot contents of one autoflush node plus the two-generation entry sets.
#[derive(Debug)]
pub struct Occupancy {
    layout: Layout,
    relaxed: bool,
    contents: BTreeMap<u64, Occupant>,
    /// Slots entered during the previous cycle.
    previous: BTreeSet<u64>,
    /// Slots entered during the current cycle.
    current: BTreeSet<u64>,
}

impl Occupancy {
    pub fn new(layout: Layout, relaxed: bool) -> Self {
        Self {
            layout,
            relaxed,
            contents: BTreeMap::new(),
            previous: BTreeSet::new(),
            current: BTreeSet::new(),
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Item currently in `slot`, if any.
    pub fn occupant(&self, slot: u64) -> Option<ItemId> {
        self.contents.get(&slot).map(|o| o.item)
    }

    /// Decide how an enter of `item` into `slot` is emitted.
    pub fn plan_enter(&self, slot: u64, item: ItemId) -> EnterAction {
        match self.contents.get(&slot) {
            None => EnterAction::Enter,
            Some(o) if !o.announced => EnterAction::Enter,
            Some(o) if o.item == item => EnterAction::AlreadyPresent,
            Some(o) => EnterAction::Replace {
                evicted: o.item,
                persistent: o.persistent,
            },
        }
    }

    /// Record `item` in `slot` for the current cycle. `announced` tells
    /// whether its EnterNode was encoded or stored.
    pub fn commit_enter(&mut self, slot: u64, item: ItemId, persistent: bool, announced: bool) {
        self.contents.insert(
            slot,
            Occupant {
                item,
                persistent,
                announced,
            },
        );
        self.current.insert(slot);
    }

    /// A fresh sink starts with the full replay, which only carries
    /// persistent enters. Every other occupant must be entered again.
    pub fn reset_announcements(&mut self) {
        for occupant in self.contents.values_mut() {
            occupant.announced &= occupant.persistent;
        }
    }

    /// Check that `item` may explicitly leave `slot`.
    pub fn check_exit(&self, node: NodeId, slot: u64, item: ItemId) -> TraceResult<()> {
        if !self.relaxed {
            return Err(TraceError::ExitOnAutoflush(node));
        }
        match self.occupant(slot) {
            Some(occupant) if occupant == item => Ok(()),
            occupant => Err(TraceError::ExitMismatch {
                node,
                item,
                occupant: occupant.unwrap_or(0),
            }),
        }
    }

    /// Clear `slot` after an explicit exit.
    pub fn commit_exit(&mut self, slot: u64) {
        self.contents.remove(&slot);
        self.previous.remove(&slot);
        self.current.remove(&slot);
    }

    /// Vacate slots entered last cycle but not this one, then start a new
    /// generation. Exits come out in ascending slot order.
    pub fn close_cycle(&mut self) -> Vec<FlushedExit> {
        let stale: Vec<u64> = self.previous.difference(&self.current).copied().collect();
        let mut exits = Vec::with_capacity(stale.len());
        for slot in stale {
            match self.contents.remove(&slot) {
                Some(occupant) if occupant.announced => exits.push(FlushedExit {
                    item: occupant.item,
                    position: self.layout.unflatten(slot),
                    persistent: occupant.persistent,
                }),
                _ => {}
            }
        }
        self.previous = std::mem::take(&mut self.current);
        exits
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}

/// Occupancy of every autoflush node that has a layout.
#[derive(Debug, Default)]
pub struct AutoflushTable {
    nodes: BTreeMap<NodeId, Occupancy>,
}

impl AutoflushTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `node` once its layout is known.
    pub fn register(&mut self, node: NodeId, layout: Layout, relaxed: bool) {
        self.nodes.insert(node, Occupancy::new(layout, relaxed));
    }

    pub fn get(&self, node: NodeId) -> Option<&Occupancy> {
        self.nodes.get(&node)
    }

    pub fn get_mut(&mut self, node: NodeId) -> Option<&mut Occupancy> {
        self.nodes.get_mut(&node)
    }

    /// Forget which occupants the sink has seen. Called when a new sink
    /// is begun.
    pub fn reset_announcements(&mut self) {
        for occupancy in self.nodes.values_mut() {
            occupancy.reset_announcements();
        }
    }

    /// Close the cycle on every tracked node accepted by `in_domain`, in
    /// ascending node order.
    pub fn close_cycle<F>(&mut self, in_domain: F) -> Vec<(NodeId, FlushedExit)>
    where
        F: Fn(NodeId) -> bool,
    {
        let mut exits = Vec::new();
        for (&node, occupancy) in self.nodes.iter_mut() {
            if in_domain(node) {
                exits.extend(occupancy.close_cycle().into_iter().map(|e| (node, e)));
            }
        }
        exits
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occupancy(relaxed: bool) -> Occupancy {
        Occupancy::new(Layout::new(0, &[4]).unwrap(), relaxed)
    }

    #[test]
    fn test_exit_after_one_idle_cycle() {
        let mut occ = occupancy(false);
        occ.commit_enter(2, 7, false, true);
        // End of the cycle the item entered in.
        assert!(occ.close_cycle().is_empty());
        // Not re-entered during the next cycle.
        let exits = occ.close_cycle();
        assert_eq!(
            exits,
            vec![FlushedExit {
                item: 7,
                position: vec![2],
                persistent: false,
            }]
        );
        assert!(occ.is_empty());
    }

    #[test]
    fn test_reentered_item_stays() {
        let mut occ = occupancy(false);
        for _ in 0..5 {
            let action = occ.plan_enter(1, 9);
            assert!(matches!(action, EnterAction::Enter | EnterAction::AlreadyPresent));
            occ.commit_enter(1, 9, true, true);
            assert!(occ.close_cycle().is_empty());
        }
        assert_eq!(occ.occupant(1), Some(9));
    }

    #[test]
    fn test_replace() {
        let mut occ = occupancy(false);
        occ.commit_enter(0, 1, false, true);
        assert_eq!(
            occ.plan_enter(0, 2),
            EnterAction::Replace {
                evicted: 1,
                persistent: false,
            }
        );
        occ.commit_enter(0, 2, false, true);
        assert_eq!(occ.occupant(0), Some(2));
    }

    #[test]
    fn test_exit_rules() {
        let strict = occupancy(false);
        assert!(matches!(
            strict.check_exit(3, 0, 1),
            Err(TraceError::ExitOnAutoflush(3))
        ));

        let mut relaxed = occupancy(true);
        relaxed.commit_enter(0, 5, false, true);
        assert!(matches!(
            relaxed.check_exit(3, 0, 6),
            Err(TraceError::ExitMismatch {
                item: 6,
                occupant: 5,
                ..
            })
        ));
        relaxed.check_exit(3, 0, 5).unwrap();
        relaxed.commit_exit(0);
        assert!(relaxed.close_cycle().is_empty());
        assert!(relaxed.close_cycle().is_empty());
    }

    #[test]
    fn test_unannounced_occupant() {
        let mut occ = occupancy(false);
        occ.commit_enter(0, 3, false, true);
        occ.commit_enter(1, 4, true, true);
        occ.reset_announcements();

        // The persistent occupant was replayed, the other one was not.
        assert_eq!(occ.plan_enter(0, 3), EnterAction::Enter);
        assert_eq!(occ.plan_enter(0, 8), EnterAction::Enter);
        assert_eq!(occ.plan_enter(1, 4), EnterAction::AlreadyPresent);

        occ.close_cycle();
        // Slot 0 is vacated without an exit, slot 1 is exited.
        let exits = occ.close_cycle();
        assert_eq!(exits.len(), 1);
        assert_eq!(exits[0].item, 4);
        assert!(occ.is_empty());
    }

    #[test]
    fn test_table_domain_filter() {
        let mut table = AutoflushTable::new();
        table.register(1, Layout::new(1, &[2]).unwrap(), false);
        table.register(2, Layout::new(2, &[2]).unwrap(), false);
        table.get_mut(1).unwrap().commit_enter(0, 10, false, true);
        table.get_mut(2).unwrap().commit_enter(1, 20, false, true);
        table.close_cycle(|_| true);

        let exits = table.close_cycle(|node| node == 2);
        assert_eq!(exits.len(), 1);
        assert_eq!(exits[0].0, 2);
        assert_eq!(exits[0].1.item, 20);
        assert_eq!(table.get(1).unwrap().occupant(0), Some(10));
    }
}
