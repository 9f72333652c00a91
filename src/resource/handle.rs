//! Atomic table swap and the path interceptor.
//!
//! Uses `arc-swap` so the interceptor reads lock-free while a re-parse
//! replaces the whole table in one store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;

use super::{ResourceTable, canonicalize};

/// Owner side of the table. Only the hot reloader holds one.
pub struct SharedTable {
    inner: Arc<ArcSwap<ResourceTable>>,
}

impl SharedTable {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(ResourceTable::default())),
        }
    }

    /// Replace the table. Readers see either the old or the new one.
    pub fn install(&self, table: ResourceTable) {
        self.inner.store(Arc::new(table));
    }

    #[inline]
    pub fn current(&self) -> Arc<ResourceTable> {
        self.inner.load_full()
    }

    /// Read-only view for the runtime's loader.
    pub fn interceptor(&self) -> Interceptor {
        Interceptor {
            table: Arc::clone(&self.inner),
        }
    }
}

impl Default for SharedTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Answers "which path should actually be opened?" for every resource load.
///
/// Cheap to clone; all clones see the latest installed table.
#[derive(Clone)]
pub struct Interceptor {
    table: Arc<ArcSwap<ResourceTable>>,
}

/// Outcome of [`Interceptor::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved<'a> {
    /// Mapped virtual path: open this file instead.
    Redirected(PathBuf),
    /// Not in the table: load as requested.
    Unchanged(&'a str),
}

impl Interceptor {
    /// Resolve a requested path against the current table.
    pub fn resolve<'a>(&self, path: &'a str) -> Resolved<'a> {
        match self.lookup(path) {
            Some(local) => Resolved::Redirected(local),
            None => Resolved::Unchanged(path),
        }
    }

    /// Local file for a virtual path, if mapped.
    pub fn lookup(&self, virtual_path: &str) -> Option<PathBuf> {
        let table = self.table.load();
        if let Some(local) = table.lookup(virtual_path) {
            return Some(local.to_path_buf());
        }
        let canonical = canonicalize(virtual_path)?;
        table.lookup(&canonical).map(Path::to_path_buf)
    }
}
