//! `[reload]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [reload]
//! entry = "res:/main.qml"   # Entry point loaded on every reload
//! auto = true               # Reload on file changes
//! debounce_ms = 200         # Quiet period before a reload runs
//! rewatch_delay_ms = 500    # Delay before a saved file is watched again
//! close_all = true          # Close child windows along with the root
//! ```

use std::time::Duration;

use serde::Deserialize;

/// Reload behaviour.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReloadConfig {
    /// Entry point URL. Reloads are refused until one is set.
    pub entry: Option<String>,

    /// Reload when a watched file changes.
    pub auto: bool,

    /// Debounce quantum in milliseconds.
    pub debounce_ms: u64,

    /// Re-registration delay in milliseconds.
    pub rewatch_delay_ms: u64,

    /// Close windows parented under the root before closing the root.
    pub close_all: bool,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            entry: None,
            auto: true,
            debounce_ms: 200,
            rewatch_delay_ms: 500,
            close_all: true,
        }
    }
}

impl ReloadConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn rewatch_delay(&self) -> Duration {
        Duration::from_millis(self.rewatch_delay_ms)
    }
}
