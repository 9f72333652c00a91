//! Watch Coordinator
//!
//! Keeps the OS watch set in lockstep with the resource table and turns raw
//! notifications into "reload requested" signals.
//!
//! ```text
//! FileWatcher ──FileChange──▶ WatchCoordinator ──true──▶ debounce (reload)
//!                                  │
//!                                  └──▶ Rewatch (delayed re-registration)
//! ```
//!
//! The coordinator only knows the derived watch set, never the table itself.
//! Time is passed in explicitly; the event loop owns the clock.

mod rewatch;
mod types;
mod watcher;

pub use types::{ChangeKind, FileChange};
pub use watcher::{FileWatcher, NotifyWatcher};

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rustc_hash::FxHashSet;

use crate::error::{WatchRegistrationError, chain};
use rewatch::Rewatch;

/// Default delay before a notified path is registered again.
pub const REWATCH_DELAY_MS: u64 = 500;

pub struct WatchCoordinator<W> {
    watcher: W,
    /// Paths currently registered with the OS watcher
    watched: FxHashSet<PathBuf>,
    rewatch: Rewatch,
    auto_reload: bool,
    /// Notified paths since the last reload, in arrival order
    changed: Vec<PathBuf>,
}

impl<W: FileWatcher> WatchCoordinator<W> {
    pub fn new(watcher: W, rewatch_delay: Duration) -> Self {
        Self {
            watcher,
            watched: FxHashSet::default(),
            rewatch: Rewatch::new(rewatch_delay),
            auto_reload: false,
            changed: Vec::new(),
        }
    }

    /// Make the watch set equal to `desired`.
    ///
    /// Paths that fail to register are reported and left out; the rest are
    /// unaffected.
    pub fn sync(&mut self, desired: &[PathBuf]) -> Vec<WatchRegistrationError> {
        let wanted: FxHashSet<&Path> = desired.iter().map(PathBuf::as_path).collect();

        let stale: Vec<PathBuf> = self
            .watched
            .iter()
            .filter(|path| !wanted.contains(path.as_path()))
            .cloned()
            .collect();
        for path in stale {
            if let Err(e) = self.watcher.remove(&path) {
                crate::debug!("watch"; "unwatch {}: {}", path.display(), e);
            }
            self.rewatch.forget(&path);
            self.watched.remove(&path);
        }

        let mut failures = Vec::new();
        for path in desired {
            if self.watched.contains(path) {
                continue;
            }
            match self.watcher.add(path) {
                Ok(()) => {
                    self.watched.insert(path.clone());
                }
                Err(source) => failures.push(WatchRegistrationError {
                    path: path.clone(),
                    source,
                }),
            }
        }

        for failure in &failures {
            crate::log!("warning"; "{}", chain(failure));
        }
        failures
    }

    /// Register every watched path again. Used when auto-reload is switched
    /// back on, since saves made while it was off were not re-registered.
    pub fn refresh(&mut self) {
        let paths: Vec<PathBuf> = self.watched.iter().cloned().collect();
        for path in paths {
            if let Err(e) = self.watcher.add(&path) {
                crate::debug!("watch"; "refresh {}: {}", path.display(), e);
            }
        }
    }

    /// Applies to re-registrations scheduled from now on.
    pub fn set_rewatch_delay(&mut self, delay: Duration) {
        self.rewatch.set_delay(delay);
    }

    pub fn auto_reload(&self) -> bool {
        self.auto_reload
    }

    pub fn set_auto_reload(&mut self, enabled: bool) {
        self.auto_reload = enabled;
    }

    /// Handle one raw notification.
    ///
    /// Returns `true` when the debounce timer should be (re)armed. Dropped
    /// notifications leave the watch set untouched.
    pub fn notify(&mut self, change: &FileChange, now: Instant) -> bool {
        if !self.auto_reload {
            crate::debug!("watch"; "auto-reload off, dropping {}", change.path.display());
            return false;
        }
        if !self.is_watched(&change.path) {
            crate::debug!("watch"; "not watched: {}", change.path.display());
            return false;
        }

        crate::debug!("watch"; "{}: {}", change.kind.label(), change.path.display());
        if !self.changed.contains(&change.path) {
            self.changed.push(change.path.clone());
        }
        self.rewatch.schedule(change.path.clone(), now);
        true
    }

    /// Run re-registrations that are due.
    pub fn maintain(&mut self, now: Instant) {
        for (path, attempt) in self.rewatch.take_due(now) {
            if !self.watched.contains(&path) {
                continue;
            }
            match self.watcher.add(&path) {
                Ok(()) => crate::debug!("watch"; "re-registered {}", path.display()),
                Err(source) => {
                    crate::debug!("watch"; "re-register {} (attempt {}): {}", path.display(), attempt, source);
                    if !self.rewatch.retry(path.clone(), attempt, now) {
                        let failure = WatchRegistrationError {
                            path: path.clone(),
                            source,
                        };
                        crate::log!("warning"; "{}", chain(&failure));
                        self.watched.remove(&path);
                    }
                }
            }
        }
    }

    /// Earliest pending re-registration.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.rewatch.next_deadline()
    }

    /// Paths notified since the last call.
    pub fn take_changed(&mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.changed)
    }

    pub fn is_watched(&self, path: &Path) -> bool {
        self.watched.contains(path)
    }

    /// Watched paths, sorted.
    pub fn watch_set(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.watched.iter().cloned().collect();
        paths.sort();
        paths
    }
}
