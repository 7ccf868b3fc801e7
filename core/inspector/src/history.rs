//! Fixed-capacity, insertion-ordered history of occurrence records.
//!
//! A pure eviction cache: pushes always succeed and the chronologically
//! oldest item is silently dropped once capacity is reached. There are no
//! error conditions.

use std::collections::VecDeque;

pub struct BoundedHistory<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedHistory<T> {
    /// Creates a buffer retaining at most `capacity` items. A capacity of
    /// zero is clamped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends an item, evicting the oldest one at capacity. O(1).
    pub fn push(&mut self, item: T) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Materializes an oldest-first snapshot of the retained items.
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.items.iter().cloned().collect()
    }
}
