//! `liveres watch`: drive the hot reloader against the headless runtime.

use std::sync::OnceLock;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::headless::HeadlessRuntime;
use crate::log;
use crate::reloader::{HotReloader, ReloadHandle};

/// Handle of the running loop, for the Ctrl+C handler.
static HANDLE: OnceLock<ReloadHandle> = OnceLock::new();

/// Install the global Ctrl+C handler.
///
/// - Before a loop is running: exit immediately
/// - After [`register_handle`]: ask the loop to stop
pub fn setup_shutdown_handler() -> Result<()> {
    ctrlc::set_handler(|| match HANDLE.get() {
        Some(handle) => {
            log!("watch"; "shutting down...");
            handle.shutdown();
        }
        None => std::process::exit(0),
    })
    .context("failed to set Ctrl+C handler")
}

fn register_handle(handle: ReloadHandle) {
    if HANDLE.set(handle).is_err() {
        crate::debug!("watch"; "shutdown handle already registered");
    }
}

/// Parse, watch and reload until Ctrl+C.
pub fn watch_resources(config: &Config) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("failed to start event loop")?;

    runtime.block_on(async {
        let mut reloader = build_reloader(config)?;
        reloader.set_auto_reload(config.reload.auto);

        let handle = reloader.handle();
        register_handle(handle.clone());

        if reloader.entry_url().is_some() {
            handle.reload();
        } else {
            log!("watch"; "no entry url set, reloads are disabled until one is given");
        }

        log!(
            "watch";
            "watching {} files from {}, Ctrl+C to stop",
            reloader.watch_set().len(),
            reloader.manifest().display()
        );
        reloader.run().await;
        Ok::<_, anyhow::Error>(())
    })
}

/// Reloader configured from `config`, with the manifest parsed.
fn build_reloader(config: &Config) -> Result<HotReloader<HeadlessRuntime>> {
    let manifest = config.manifest_path();
    let mut reloader = HotReloader::new(HeadlessRuntime::new(), &manifest)
        .context("failed to create file watcher")?;

    reloader.set_filters(config.manifest.filters());
    reloader.set_debounce(config.reload.debounce());
    reloader.set_rewatch_delay(config.reload.rewatch_delay());
    reloader.set_close_all_on_reload(config.reload.close_all);
    if let Some(entry) = &config.reload.entry {
        reloader.set_entry_url(entry.as_str());
    }

    reloader.parse_manifest()?;
    Ok(reloader)
}
