//! Reload Orchestrator
//!
//! ```text
//! reload() ──▶ Idle ──arm──▶ PendingDebounce ──timer──▶ Reloading ──▶ Idle
//!                               ▲          │
//!                               └─re-arm───┘
//! ```
//!
//! A reload tears down the current root window and its descendants, drops
//! the runtime's compiled cache and loads the entry URL again. Requests only
//! arm the debounce timer; the reload itself runs when the event loop calls
//! [`ReloadOrchestrator::fire_due`].

mod debouncer;
pub mod runtime;

pub use runtime::{RootObject, Runtime, Window};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::{ConfigurationError, ReloadIntegrityWarning};
use debouncer::{DEBOUNCE_MS, Debouncer};

/// Default debounce quantum.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(DEBOUNCE_MS);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadState {
    Idle,
    PendingDebounce,
    Reloading,
}

/// The one reload session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadSession {
    pub state: ReloadState,
    pub entry_url: Option<String>,
}

/// How a fired reload ended. Every variant leaves the session Idle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// Entry reloaded and a root window is up.
    Reloaded,
    /// Entry reloaded but the runtime has no root object.
    Empty(ReloadIntegrityWarning),
    /// Nothing was torn down.
    Misconfigured(ConfigurationError),
}

impl ReloadOutcome {
    /// Whether the UI was rebuilt (a `Reloaded` notification is due).
    pub fn reloaded(&self) -> bool {
        !matches!(self, Self::Misconfigured(_))
    }
}

pub struct ReloadOrchestrator<R: Runtime> {
    session: ReloadSession,
    debouncer: Debouncer,
    /// Root window created by the last reload
    root: Option<R::Window>,
    /// Mirrors `state == Reloading` for readers off the loop
    reloading: Arc<AtomicBool>,
    /// Close the root's descendant windows before the root itself
    close_all: bool,
}

impl<R: Runtime> ReloadOrchestrator<R> {
    pub fn new(debounce: Duration) -> Self {
        Self {
            session: ReloadSession {
                state: ReloadState::Idle,
                entry_url: None,
            },
            debouncer: Debouncer::new(debounce),
            root: None,
            reloading: Arc::new(AtomicBool::new(false)),
            close_all: true,
        }
    }

    pub fn state(&self) -> ReloadState {
        self.session.state
    }

    pub fn entry_url(&self) -> Option<&str> {
        self.session.entry_url.as_deref()
    }

    /// An empty URL clears the entry.
    pub fn set_entry_url(&mut self, url: impl Into<String>) {
        let url = url.into();
        self.session.entry_url = if url.trim().is_empty() {
            None
        } else {
            Some(url)
        };
    }

    pub fn set_debounce(&mut self, debounce: Duration) {
        self.debouncer.set_quantum(debounce);
    }

    pub fn close_all_on_reload(&self) -> bool {
        self.close_all
    }

    /// With this off only the root window is closed; windows parented
    /// under it are left to the runtime.
    pub fn set_close_all_on_reload(&mut self, enabled: bool) {
        self.close_all = enabled;
    }

    pub fn is_reloading(&self) -> bool {
        self.session.state == ReloadState::Reloading
    }

    /// Shared view of [`Self::is_reloading`].
    pub fn reloading_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.reloading)
    }

    /// Request a reload.
    ///
    /// Arms (or restarts) the debounce timer. Without an entry URL the request
    /// is refused and the session stays where it was.
    pub fn reload(&mut self, now: Instant) -> Result<(), ConfigurationError> {
        if self.session.entry_url.is_none() {
            return Err(ConfigurationError::MissingEntryUrl);
        }

        match self.session.state {
            ReloadState::Reloading => {
                crate::debug!("reload"; "reload in progress, request dropped");
            }
            ReloadState::PendingDebounce => {
                crate::debug!("reload"; "debounce restarted");
                self.debouncer.arm(now);
            }
            ReloadState::Idle => {
                self.debouncer.arm(now);
                self.session.state = ReloadState::PendingDebounce;
            }
        }
        Ok(())
    }

    /// When the armed debounce expires.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// Run the reload if the debounce has expired.
    pub fn fire_due(&mut self, runtime: &mut R, now: Instant) -> Option<ReloadOutcome> {
        if !self.debouncer.take_if_due(now) {
            return None;
        }
        Some(self.perform(runtime))
    }

    fn perform(&mut self, runtime: &mut R) -> ReloadOutcome {
        self.enter(ReloadState::Reloading);

        let Some(entry_url) = self.session.entry_url.clone() else {
            self.enter(ReloadState::Idle);
            return ReloadOutcome::Misconfigured(ConfigurationError::MissingEntryUrl);
        };

        if let Some(root) = self.locate_root(runtime) {
            teardown(root, self.close_all);
        }

        runtime.clear_compiled_cache();
        crate::debug!("reload"; "loading {}", entry_url);
        runtime.load_entry(&entry_url);

        let outcome = match last_window(runtime) {
            Some(root) => {
                self.root = Some(root);
                ReloadOutcome::Reloaded
            }
            None if runtime.root_objects().is_empty() => {
                ReloadOutcome::Empty(ReloadIntegrityWarning { entry_url })
            }
            // Root objects but no window: nothing to track, nothing wrong
            None => ReloadOutcome::Reloaded,
        };

        self.enter(ReloadState::Idle);
        outcome
    }

    /// The tracked root while the runtime still lists it, otherwise the
    /// last live window.
    fn locate_root(&mut self, runtime: &R) -> Option<R::Window> {
        let mut live: Vec<R::Window> = runtime
            .root_objects()
            .into_iter()
            .filter_map(RootObject::into_window)
            .collect();

        if let Some(tracked) = self.root.take() {
            if live.iter().any(|window| window.is_same(&tracked)) {
                return Some(tracked);
            }
            crate::debug!("reload"; "tracked root window is gone");
        }
        live.pop()
    }

    fn enter(&mut self, state: ReloadState) {
        self.session.state = state;
        self.reloading
            .store(state == ReloadState::Reloading, Ordering::SeqCst);
    }
}

fn last_window<R: Runtime>(runtime: &R) -> Option<R::Window> {
    runtime
        .root_objects()
        .into_iter()
        .rev()
        .find_map(RootObject::into_window)
}

/// Close descendants first (when `close_all`), then close and release the
/// root.
fn teardown<W: Window>(mut root: W, close_all: bool) {
    if close_all {
        for mut window in root.find_descendant_windows() {
            window.close();
        }
    }
    root.close();
    root.release();
}

#[cfg(test)]
mod tests;
