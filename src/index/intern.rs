//! Capacity-bounded LRU interning of byte strings to small integer ids.

use std::collections::HashMap;

/// One table entry. The slot index doubles as the entry's id.
struct Slot {
    key: Vec<u8>,
    /// Towards the most recently used end.
    prev: Option<usize>,
    /// Towards the least recently used end.
    next: Option<usize>,
}

/// Maps byte strings to ids in `0..capacity`, evicting the least recently
/// used entry when full. An evicted entry's id is handed to the newcomer.
pub struct InternTable {
    capacity: usize,
    map: HashMap<Vec<u8>, usize>,
    slots: Vec<Slot>,
    head: Option<usize>,
    tail: Option<usize>,
    evictions: u64,
}

impl InternTable {
    /// Create an empty table. A zero capacity is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            map: HashMap::new(),
            slots: Vec::new(),
            head: None,
            tail: None,
            evictions: 0,
        }
    }

    /// Return the id for `key` and whether it was just assigned.
    ///
    /// A hit promotes the entry to most recently used. A miss takes the next
    /// unused id, or the id of the evicted least recently used entry when the
    /// table is full.
    pub fn get_mapping(&mut self, key: &[u8]) -> (u32, bool) {
        if let Some(&idx) = self.map.get(key) {
            self.unlink(idx);
            self.push_front(idx);
            return (idx as u32, false);
        }

        let idx = match self.tail {
            Some(lru) if self.slots.len() >= self.capacity => {
                self.unlink(lru);
                let old = std::mem::replace(&mut self.slots[lru].key, key.to_vec());
                self.map.remove(&old);
                self.evictions += 1;
                lru
            }
            _ => {
                self.slots.push(Slot {
                    key: key.to_vec(),
                    prev: None,
                    next: None,
                });
                self.slots.len() - 1
            }
        };
        self.map.insert(key.to_vec(), idx);
        self.push_front(idx);
        (idx as u32, true)
    }

    /// Look up `key` without touching recency.
    pub fn lookup(&self, key: &[u8]) -> Option<u32> {
        self.map.get(key).map(|&idx| idx as u32)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of evictions since creation.
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Forget every entry; ids restart at 0.
    pub fn clear(&mut self) {
        self.map.clear();
        self.slots.clear();
        self.head = None;
        self.tail = None;
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.slots[idx].prev, self.slots[idx].next);
        match prev {
            Some(p) => self.slots[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].prev = prev,
            None => self.tail = prev,
        }
        self.slots[idx].prev = None;
        self.slots[idx].next = None;
    }

    fn push_front(&mut self, idx: usize) {
        self.slots[idx].next = self.head;
        self.slots[idx].prev = None;
        if let Some(h) = self.head {
            self.slots[h].prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }
}
