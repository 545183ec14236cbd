//! Watch descriptor bookkeeping
//!
//! The kernel only hands back descriptors; this table remembers which path
//! and mask each one was registered with. It is not synchronized, the owning
//! session keeps it behind a lock.

use crate::event::WatchDescriptor;
use crate::mask::EventMask;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// What a descriptor was registered with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEntry {
    pub path: PathBuf,
    pub mask: EventMask,
}

/// Descriptor -> registration map
#[derive(Debug, Default)]
pub struct WatchTable {
    entries: HashMap<WatchDescriptor, WatchEntry>,
}

impl WatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a registration, returning the entry it replaced
    pub fn insert(
        &mut self,
        wd: WatchDescriptor,
        path: PathBuf,
        mask: EventMask,
    ) -> Option<WatchEntry> {
        self.entries.insert(wd, WatchEntry { path, mask })
    }

    pub fn remove(&mut self, wd: WatchDescriptor) -> Option<WatchEntry> {
        self.entries.remove(&wd)
    }

    pub fn lookup(&self, wd: WatchDescriptor) -> Option<&WatchEntry> {
        self.entries.get(&wd)
    }

    /// Descriptor registered for exactly this path
    pub fn find_by_path(&self, path: &Path) -> Option<WatchDescriptor> {
        self.entries
            .iter()
            .find(|(_, entry)| entry.path == path)
            .map(|(wd, _)| *wd)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (WatchDescriptor, &WatchEntry)> {
        self.entries.iter().map(|(wd, entry)| (*wd, entry))
    }
}
