//! Index of node instance numbers by node name.

use std::collections::HashMap;

/// Highest instance number recorded for each node name.
#[derive(Debug, Default)]
pub struct InstanceIndex {
    highest: HashMap<String, u16>,
}

impl InstanceIndex {
    /// Create a new, empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `name` has an instance `instance`.
    pub fn record(&mut self, name: &str, instance: u16) {
        match self.highest.get_mut(name) {
            Some(highest) => *highest = (*highest).max(instance),
            None => {
                self.highest.insert(name.to_string(), instance);
            }
        }
    }

    /// One more than the highest instance recorded for `name`, or 0.
    pub fn next_instance(&self, name: &str) -> u16 {
        self.highest
            .get(name)
            .map(|&i| i.saturating_add(1))
            .unwrap_or(0)
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.highest.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.highest.is_empty()
    }
}
