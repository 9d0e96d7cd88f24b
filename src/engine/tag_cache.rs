//! Last value of each whole-node tag, for dropping repeated sets.

use std::collections::HashMap;

use crate::types::{NodeId, TagValue};

/// `tag name -> node -> last value` for tags set on a whole node.
#[derive(Debug, Default)]
pub struct NodeTagCache {
    values: HashMap<String, HashMap<NodeId, TagValue>>,
}

impl NodeTagCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `value` equals what `node` last had for `tag`.
    pub fn is_repeat(&self, node: NodeId, tag: &str, value: &TagValue) -> bool {
        self.values
            .get(tag)
            .and_then(|nodes| nodes.get(&node))
            .is_some_and(|last| last == value)
    }

    /// Remember `value` as the latest for `node` / `tag`.
    pub fn update(&mut self, node: NodeId, tag: &str, value: &TagValue) {
        match self.values.get_mut(tag) {
            Some(nodes) => {
                nodes.insert(node, value.clone());
            }
            None => {
                let mut nodes = HashMap::new();
                nodes.insert(node, value.clone());
                self.values.insert(tag.to_string(), nodes);
            }
        }
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Number of distinct tag names cached.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_detection() {
        let mut cache = NodeTagCache::new();
        let five = TagValue::from(5u32);
        assert!(!cache.is_repeat(1, "x", &five));
        cache.update(1, "x", &five);
        assert!(cache.is_repeat(1, "x", &five));
        assert!(!cache.is_repeat(2, "x", &five));
        assert!(!cache.is_repeat(1, "x", &TagValue::from(6u32)));
        assert!(!cache.is_repeat(1, "y", &five));
        cache.clear();
        assert!(!cache.is_repeat(1, "x", &five));
    }
}
