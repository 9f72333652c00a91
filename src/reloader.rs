//! Hot Reloader: the event loop.
//!
//! ```text
//!  notify thread ──FileChange──┐
//!                              ▼
//!  ReloadHandle ──Command──▶ HotReloader::run ──▶ WatchCoordinator
//!       ▲                      │   ▲                    │ arm
//!       └───ReloadEvent────────┘   └──── deadline ◀── ReloadOrchestrator ──▶ Runtime
//! ```
//!
//! Everything that touches the runtime happens on the loop. Other threads
//! talk to it through a [`ReloadHandle`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc};

use crate::error::{ManifestError, chain};
use crate::manifest;
use crate::reload::{DEFAULT_DEBOUNCE, ReloadOrchestrator, ReloadOutcome, Runtime};
use crate::resource::{Filters, Interceptor, ResourceTable, SharedTable};
use crate::watch::{FileChange, FileWatcher, NotifyWatcher, REWATCH_DELAY_MS, WatchCoordinator};

/// Idle sleep when no deadline is pending.
const IDLE_SLEEP: Duration = Duration::from_secs(86400);

/// Broadcast capacity; slow subscribers lag instead of blocking the loop.
const EVENT_CAPACITY: usize = 16;

/// Notifications sent to [`ReloadHandle::subscribe`] receivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadEvent {
    AutoReloadChanged(bool),
    /// The entry point was loaded again.
    Reloaded,
}

#[derive(Debug)]
enum Command {
    Reload,
    SetAutoReload(bool),
    SetEntryUrl(String),
    SetManifest(PathBuf),
    SetCloseAllOnReload(bool),
    AllowSuffix(String),
    Ignore(String),
    IgnorePrefix(String),
    ParseManifest,
    Shutdown,
}

/// Cloneable, `Send` control surface of a running [`HotReloader`].
///
/// Commands are applied on the loop in the order sent.
#[derive(Clone)]
pub struct ReloadHandle {
    commands: mpsc::UnboundedSender<Command>,
    events: broadcast::Sender<ReloadEvent>,
    reloading: Arc<AtomicBool>,
    auto_reload: Arc<AtomicBool>,
}

impl ReloadHandle {
    /// Request a reload. Requests within one debounce quantum coalesce.
    pub fn reload(&self) {
        self.send(Command::Reload);
    }

    pub fn set_auto_reload(&self, enabled: bool) {
        self.send(Command::SetAutoReload(enabled));
    }

    pub fn set_entry_url(&self, url: impl Into<String>) {
        self.send(Command::SetEntryUrl(url.into()));
    }

    /// Switch to another manifest; re-parsed right away once a manifest has
    /// been parsed.
    pub fn set_manifest(&self, manifest: impl Into<PathBuf>) {
        self.send(Command::SetManifest(manifest.into()));
    }

    pub fn set_close_all_on_reload(&self, enabled: bool) {
        self.send(Command::SetCloseAllOnReload(enabled));
    }

    pub fn add_allowed_suffix(&self, suffix: impl Into<String>) {
        self.send(Command::AllowSuffix(suffix.into()));
    }

    pub fn add_ignore_filter(&self, pattern: impl Into<String>) {
        self.send(Command::Ignore(pattern.into()));
    }

    pub fn add_prefix_ignore_filter(&self, prefix: impl Into<String>) {
        self.send(Command::IgnorePrefix(prefix.into()));
    }

    /// Re-read the manifest.
    pub fn parse_manifest(&self) {
        self.send(Command::ParseManifest);
    }

    pub fn is_reloading(&self) -> bool {
        self.reloading.load(Ordering::SeqCst)
    }

    pub fn auto_reload(&self) -> bool {
        self.auto_reload.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.events.subscribe()
    }

    /// Stop the loop after the commands already sent.
    pub fn shutdown(&self) {
        self.send(Command::Shutdown);
    }

    fn send(&self, command: Command) {
        if let Err(e) = self.commands.send(command) {
            crate::debug!("reload"; "loop stopped, dropping {:?}", e.0);
        }
    }
}

/// Owns the runtime, the resource table, the watcher and the reload state.
pub struct HotReloader<R: Runtime, W = NotifyWatcher> {
    runtime: R,
    manifest: PathBuf,
    filters: Filters,
    table: SharedTable,
    /// Set after the first successful parse; filter changes re-parse from then on
    parsed: bool,
    watch: WatchCoordinator<W>,
    orchestrator: ReloadOrchestrator<R>,
    changes: mpsc::UnboundedReceiver<FileChange>,
    commands: mpsc::UnboundedReceiver<Command>,
    commands_tx: mpsc::UnboundedSender<Command>,
    events: broadcast::Sender<ReloadEvent>,
    auto_reload: Arc<AtomicBool>,
}

impl<R: Runtime> HotReloader<R> {
    /// Reloader watching with the platform's file watcher.
    pub fn new(runtime: R, manifest: impl Into<PathBuf>) -> notify::Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let watcher = NotifyWatcher::new(move |change| {
            // Receiver gone means the loop has stopped
            let _ = tx.send(change);
        })?;
        Ok(Self::with_watcher(runtime, manifest, watcher, rx))
    }
}

impl<R: Runtime, W: FileWatcher> HotReloader<R, W> {
    /// Reloader over any watcher; `changes` must carry that watcher's
    /// notifications.
    pub fn with_watcher(
        mut runtime: R,
        manifest: impl Into<PathBuf>,
        watcher: W,
        changes: mpsc::UnboundedReceiver<FileChange>,
    ) -> Self {
        let table = SharedTable::new();
        runtime.register_url_interceptor(table.interceptor());

        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            runtime,
            manifest: manifest.into(),
            filters: Filters::default(),
            table,
            parsed: false,
            watch: WatchCoordinator::new(watcher, Duration::from_millis(REWATCH_DELAY_MS)),
            orchestrator: ReloadOrchestrator::new(DEFAULT_DEBOUNCE),
            changes,
            commands,
            commands_tx,
            events,
            auto_reload: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn handle(&self) -> ReloadHandle {
        ReloadHandle {
            commands: self.commands_tx.clone(),
            events: self.events.clone(),
            reloading: self.orchestrator.reloading_flag(),
            auto_reload: Arc::clone(&self.auto_reload),
        }
    }

    pub fn manifest(&self) -> &Path {
        &self.manifest
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    /// Snapshot of the installed table.
    pub fn table(&self) -> Arc<ResourceTable> {
        self.table.current()
    }

    pub fn interceptor(&self) -> Interceptor {
        self.table.interceptor()
    }

    pub fn watch_set(&self) -> Vec<PathBuf> {
        self.watch.watch_set()
    }

    pub fn entry_url(&self) -> Option<&str> {
        self.orchestrator.entry_url()
    }

    pub fn is_reloading(&self) -> bool {
        self.orchestrator.is_reloading()
    }

    pub fn auto_reload(&self) -> bool {
        self.watch.auto_reload()
    }

    pub fn set_entry_url(&mut self, url: impl Into<String>) {
        self.orchestrator.set_entry_url(url);
    }

    /// Point at another manifest. After the first parse this re-parses; a
    /// failed parse keeps the previous table and watches.
    pub fn set_manifest(&mut self, manifest: impl Into<PathBuf>) {
        let manifest = manifest.into();
        if manifest == self.manifest {
            return;
        }
        crate::log!("manifest"; "switching to {}", manifest.display());
        self.manifest = manifest;
        self.reparse();
    }

    pub fn close_all_on_reload(&self) -> bool {
        self.orchestrator.close_all_on_reload()
    }

    pub fn set_close_all_on_reload(&mut self, enabled: bool) {
        self.orchestrator.set_close_all_on_reload(enabled);
    }

    pub fn set_debounce(&mut self, debounce: Duration) {
        self.orchestrator.set_debounce(debounce);
    }

    pub fn set_rewatch_delay(&mut self, delay: Duration) {
        self.watch.set_rewatch_delay(delay);
    }

    /// Turn reloading on file changes on or off. Turning it back on
    /// re-registers every watched path.
    pub fn set_auto_reload(&mut self, enabled: bool) {
        if self.watch.auto_reload() == enabled {
            return;
        }
        self.watch.set_auto_reload(enabled);
        if enabled {
            self.watch.refresh();
        }
        self.auto_reload.store(enabled, Ordering::SeqCst);
        crate::log!("watch"; "auto-reload {}", if enabled { "on" } else { "off" });
        // No subscribers is fine
        let _ = self.events.send(ReloadEvent::AutoReloadChanged(enabled));
    }

    /// Replace all filters at once.
    pub fn set_filters(&mut self, filters: Filters) {
        self.filters = filters;
        self.filters_changed();
    }

    pub fn add_allowed_suffix(&mut self, suffix: &str) {
        if self.filters.allow_suffix(suffix) {
            self.filters_changed();
        }
    }

    pub fn add_ignore_filter(&mut self, pattern: &str) {
        if self.filters.ignore(pattern) {
            self.filters_changed();
        }
    }

    pub fn add_prefix_ignore_filter(&mut self, prefix: &str) {
        if self.filters.ignore_prefix(prefix) {
            self.filters_changed();
        }
    }

    fn filters_changed(&mut self) {
        self.reparse();
    }

    /// Re-parse if a manifest was parsed before.
    fn reparse(&mut self) {
        if self.parsed
            && let Err(e) = self.parse_manifest()
        {
            crate::log!("error"; "{}", chain(&e));
        }
    }

    /// Parse the manifest, install the new table and bring the watch set in
    /// line with it. Returns the number of entries.
    ///
    /// On failure the previous table and watches stay in place.
    pub fn parse_manifest(&mut self) -> Result<usize, ManifestError> {
        let entries = manifest::parse(&self.manifest, &self.filters)?;
        let table = ResourceTable::from_entries(entries);
        let watch_set = table.watch_set();
        let count = table.len();

        self.table.install(table);
        self.parsed = true;
        let failures = self.watch.sync(&watch_set);

        crate::log!(
            "manifest";
            "{} entries, {} watched",
            count,
            watch_set.len() - failures.len()
        );
        Ok(count)
    }

    /// Run until [`ReloadHandle::shutdown`].
    pub async fn run(&mut self) {
        loop {
            let deadline = tokio::time::Instant::from_std(self.next_deadline());

            tokio::select! {
                biased;
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.apply(command),
                },
                Some(change) = self.changes.recv() => {
                    if self.watch.notify(&change, now()) {
                        self.request_reload();
                    }
                }
                _ = tokio::time::sleep_until(deadline) => self.on_timer(),
            }
        }
        crate::debug!("reload"; "loop stopped");
    }

    fn next_deadline(&self) -> Instant {
        [self.orchestrator.next_deadline(), self.watch.next_deadline()]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or_else(|| now() + IDLE_SLEEP)
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Reload => self.request_reload(),
            Command::SetAutoReload(enabled) => self.set_auto_reload(enabled),
            Command::SetEntryUrl(url) => self.set_entry_url(url),
            Command::SetManifest(manifest) => self.set_manifest(manifest),
            Command::SetCloseAllOnReload(enabled) => self.set_close_all_on_reload(enabled),
            Command::AllowSuffix(suffix) => self.add_allowed_suffix(&suffix),
            Command::Ignore(pattern) => self.add_ignore_filter(&pattern),
            Command::IgnorePrefix(prefix) => self.add_prefix_ignore_filter(&prefix),
            Command::ParseManifest => {
                if let Err(e) = self.parse_manifest() {
                    crate::logger::status_error("manifest not reloaded", &chain(&e));
                }
            }
            Command::Shutdown => {}
        }
    }

    fn request_reload(&mut self) {
        if let Err(e) = self.orchestrator.reload(now()) {
            crate::logger::status_error("reload skipped", &e.to_string());
        }
    }

    fn on_timer(&mut self) {
        let now = now();
        self.watch.maintain(now);

        let Some(outcome) = self.orchestrator.fire_due(&mut self.runtime, now) else {
            return;
        };
        let changed = self.watch.take_changed();

        match &outcome {
            ReloadOutcome::Reloaded => {
                let entry = self.orchestrator.entry_url().unwrap_or_default();
                crate::logger::status_success(&reload_summary(entry, &changed));
            }
            ReloadOutcome::Empty(warning) => {
                crate::logger::status_warning(&warning.to_string());
            }
            ReloadOutcome::Misconfigured(e) => {
                crate::logger::status_error("reload skipped", &e.to_string());
            }
        }

        if outcome.reloaded() {
            let _ = self.events.send(ReloadEvent::Reloaded);
        }
    }
}

/// Loop clock. Goes through tokio so a paused test clock applies.
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

fn reload_summary(entry: &str, changed: &[PathBuf]) -> String {
    let names: Vec<_> = changed
        .iter()
        .filter_map(|path| path.file_name())
        .map(|name| name.to_string_lossy())
        .collect();
    match names.len() {
        0 => format!("reloaded {entry}"),
        1..=3 => format!("reloaded {entry} ({})", names.join(", ")),
        n => format!("reloaded {entry} ({}, +{} more)", names[..3].join(", "), n - 3),
    }
}
