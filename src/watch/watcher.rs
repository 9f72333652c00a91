//! The OS file-watch capability.

use std::path::Path;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use super::types::FileChange;

/// Register and unregister individual files with the platform watcher.
///
/// Change notifications are delivered to the callback given when the
/// watcher is constructed, on the watcher's own thread.
pub trait FileWatcher {
    /// Start watching `path`. Adding a path that is already watched is not
    /// an error.
    fn add(&mut self, path: &Path) -> notify::Result<()>;

    fn remove(&mut self, path: &Path) -> notify::Result<()>;
}

/// [`FileWatcher`] backed by `notify`'s recommended platform watcher.
pub struct NotifyWatcher {
    inner: RecommendedWatcher,
}

impl NotifyWatcher {
    /// Create the watcher. `on_change` runs on notify's thread for every
    /// change that survives event classification.
    pub fn new<F>(on_change: F) -> notify::Result<Self>
    where
        F: Fn(FileChange) + Send + 'static,
    {
        let inner = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    for change in FileChange::from_event(&event) {
                        on_change(change);
                    }
                }
                Err(e) => crate::log!("watch"; "notify error: {}", e),
            }
        })?;
        Ok(Self { inner })
    }
}

impl FileWatcher for NotifyWatcher {
    fn add(&mut self, path: &Path) -> notify::Result<()> {
        self.inner.watch(path, RecursiveMode::NonRecursive)
    }

    fn remove(&mut self, path: &Path) -> notify::Result<()> {
        self.inner.unwatch(path)
    }
}
