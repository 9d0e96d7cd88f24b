//! Per-edge bandwidth watermarks.

use std::collections::HashMap;

use crate::types::EdgeId;

/// Counts items moved on each edge per cycle and keeps the highest count
/// seen for each edge.
#[derive(Debug, Default)]
pub struct EdgeBandwidth {
    current: HashMap<EdgeId, u32>,
    max: HashMap<EdgeId, u32>,
}

impl EdgeBandwidth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account `count` items moved on `edge` in the current cycle.
    pub fn add(&mut self, edge: EdgeId, count: usize) {
        let slot = self.current.entry(edge).or_insert(0);
        *slot = slot.saturating_add(count as u32);
    }

    /// Fold the current cycle into the watermarks and reset the counters.
    pub fn close_cycle(&mut self) {
        for (edge, count) in self.current.drain() {
            let max = self.max.entry(edge).or_insert(0);
            *max = (*max).max(count);
        }
    }

    /// Highest per-cycle count seen on `edge`, counting the open cycle.
    pub fn max(&self, edge: EdgeId) -> Option<u32> {
        let closed = self.max.get(&edge).copied();
        let open = self.current.get(&edge).copied();
        closed.max(open)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watermark() {
        let mut bw = EdgeBandwidth::new();
        assert_eq!(bw.max(0), None);
        bw.add(0, 2);
        bw.add(0, 1);
        bw.close_cycle();
        bw.add(0, 1);
        bw.close_cycle();
        assert_eq!(bw.max(0), Some(3));
        bw.add(0, 5);
        assert_eq!(bw.max(0), Some(5));
        assert_eq!(bw.max(1), None);
    }
}
