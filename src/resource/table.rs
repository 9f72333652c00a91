//! Virtual path → local path table.

use std::path::{Path, PathBuf};

use rustc_hash::{FxHashMap, FxHashSet};

use super::ResourceEntry;

/// Resolved manifest, immutable once built.
///
/// Lookups are exact-match: suffix and ignore filtering already happened
/// while parsing.
#[derive(Debug, Default, Clone)]
pub struct ResourceTable {
    entries: Vec<ResourceEntry>,
    index: FxHashMap<String, usize>,
}

impl ResourceTable {
    /// Build from parsed entries. A repeated virtual path replaces the
    /// earlier entry in place.
    pub fn from_entries(entries: Vec<ResourceEntry>) -> Self {
        let mut table = Self {
            entries: Vec::with_capacity(entries.len()),
            index: FxHashMap::default(),
        };
        for entry in entries {
            match table.index.get(&entry.virtual_path) {
                Some(&idx) => {
                    crate::debug!("manifest"; "duplicate {}, keeping {}", entry.virtual_path, entry.local_path.display());
                    table.entries[idx] = entry;
                }
                None => {
                    table.index.insert(entry.virtual_path.clone(), table.entries.len());
                    table.entries.push(entry);
                }
            }
        }
        table
    }

    /// Local file behind `virtual_path`, if mapped.
    #[inline]
    pub fn lookup(&self, virtual_path: &str) -> Option<&Path> {
        self.get(virtual_path).map(|e| e.local_path.as_path())
    }

    #[inline]
    pub fn get(&self, virtual_path: &str) -> Option<&ResourceEntry> {
        self.index.get(virtual_path).map(|&idx| &self.entries[idx])
    }

    pub fn entries(&self) -> &[ResourceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Local paths that should be watched: every non-ignored entry, once,
    /// in manifest order.
    pub fn watch_set(&self) -> Vec<PathBuf> {
        let mut seen = FxHashSet::default();
        self.entries
            .iter()
            .filter(|e| !e.ignored)
            .filter(|e| seen.insert(e.local_path.as_path()))
            .map(|e| e.local_path.clone())
            .collect()
    }
}
