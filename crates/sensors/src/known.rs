//! Bounded memory of permanently excluded subfolders

use std::collections::{HashSet, VecDeque};

/// Subfolders that never need to be looked at again
///
/// Entries are evicted oldest first once `capacity` is reached. The set
/// starts empty on every process start.
#[derive(Debug, Clone)]
pub struct KnownContents {
    capacity: usize,
    entries: HashSet<String>,
    order: VecDeque<String>,
}

impl KnownContents {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashSet::new(),
            order: VecDeque::new(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains(name)
    }

    /// Remember a name, evicting the oldest entry when full
    pub fn insert(&mut self, name: impl Into<String>) {
        let name = name.into();
        if self.entries.contains(&name) {
            return;
        }
        while self.order.len() >= self.capacity {
            match self.order.pop_front() {
                Some(evicted) => {
                    self.entries.remove(&evicted);
                }
                None => break,
            }
        }
        self.entries.insert(name.clone());
        self.order.push_back(name);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
