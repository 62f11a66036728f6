//! Resident-resource list in least-recently-used order.
//!
//! Resources enter at the tail when they are loaded (eagerly at open time or
//! on first access) and move back to the tail when used again. The front is
//! the next eviction candidate. Eviction itself is left to the owner.

use resfile_format::ResourceId;
use std::collections::VecDeque;

/// LRU list of resident resource ids, most recently used at the back.
#[derive(Debug, Default, Clone)]
pub struct LruList {
    entries: VecDeque<ResourceId>,
}

impl LruList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `id` at the tail, removing an earlier occurrence.
    pub fn append_tail(&mut self, id: ResourceId) {
        self.remove(id);
        self.entries.push_back(id);
    }

    /// Record a use of `id`; ids not in the list are ignored.
    pub fn touch(&mut self, id: ResourceId) {
        if self.remove(id) {
            self.entries.push_back(id);
        }
    }

    /// Unlink `id`, returning whether it was present.
    pub fn remove(&mut self, id: ResourceId) -> bool {
        match self.entries.iter().position(|&e| e == id) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Least recently used id.
    pub fn front(&self) -> Option<ResourceId> {
        self.entries.front().copied()
    }

    /// Most recently used id.
    pub fn back(&self) -> Option<ResourceId> {
        self.entries.back().copied()
    }

    /// Ids from least to most recently used.
    pub fn iter(&self) -> impl Iterator<Item = ResourceId> + '_ {
        self.entries.iter().copied()
    }

    /// Whether `id` is in the list.
    pub fn contains(&self, id: ResourceId) -> bool {
        self.entries.contains(&id)
    }

    /// Get the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
