use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

/// Re-registration attempts per notification before a path is given up.
pub(super) const MAX_ATTEMPTS: u8 = 5;

/// Delayed re-registration schedule.
///
/// Editors that save by delete-then-recreate leave the OS watch pointing at
/// the old file. Each notification schedules the same path to be added again
/// once the new file is in place.
pub(super) struct Rewatch {
    delay: Duration,
    pending: FxHashMap<PathBuf, Pending>,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    due: Instant,
    attempt: u8,
}

impl Rewatch {
    pub(super) fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: FxHashMap::default(),
        }
    }

    pub(super) fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    /// (Re)schedule `path`, resetting its attempt count.
    pub(super) fn schedule(&mut self, path: PathBuf, now: Instant) {
        self.pending.insert(
            path,
            Pending {
                due: now + self.delay,
                attempt: 1,
            },
        );
    }

    /// Schedule another attempt. Returns `false` once attempts are exhausted.
    pub(super) fn retry(&mut self, path: PathBuf, attempt: u8, now: Instant) -> bool {
        if attempt >= MAX_ATTEMPTS {
            return false;
        }
        self.pending.insert(
            path,
            Pending {
                due: now + self.delay,
                attempt: attempt + 1,
            },
        );
        true
    }

    /// Remove and return every entry due at `now`, with its attempt number.
    pub(super) fn take_due(&mut self, now: Instant) -> Vec<(PathBuf, u8)> {
        let due: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, p)| p.due <= now)
            .map(|(path, _)| path.clone())
            .collect();

        due.into_iter()
            .filter_map(|path| {
                let pending = self.pending.remove(&path)?;
                Some((path, pending.attempt))
            })
            .collect()
    }

    pub(super) fn forget(&mut self, path: &Path) {
        self.pending.remove(path);
    }

    pub(super) fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.due).min()
    }

    #[cfg(test)]
    pub(super) fn is_scheduled(&self, path: &Path) -> bool {
        self.pending.contains_key(path)
    }
}
