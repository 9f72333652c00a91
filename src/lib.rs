//! liveres - hot reload for declarative UI resource bundles.
//!
//! Edit a file listed in a resource manifest and the running UI is rebuilt
//! from it, without restarting the process or rebuilding the bundle.
//!
//! ```text
//! manifest ──▶ ResourceTable ──▶ Interceptor ──▶ Runtime (every load)
//!                   │
//!                   └──▶ WatchCoordinator ──▶ debounce ──▶ ReloadOrchestrator
//! ```
//!
//! - [`pattern`]: shell-style wildcard filters
//! - [`manifest`]: manifest parsing into [`resource::ResourceEntry`] values
//! - [`resource`]: the table, its atomic handle and the path interceptor
//! - [`watch`]: OS watch set maintenance
//! - [`reload`]: the reload state machine and the runtime interface
//! - [`reloader`]: the event loop tying it all together

pub mod cli;
pub mod config;
pub mod error;
pub mod headless;
pub mod logger;
pub mod manifest;
pub mod pattern;
pub mod reload;
pub mod reloader;
pub mod resource;
pub mod utils;
pub mod watch;

pub use error::{
    ConfigError, ConfigurationError, ManifestError, ReloadIntegrityWarning,
    WatchRegistrationError,
};
pub use reload::{RootObject, Runtime, Window};
pub use reloader::{HotReloader, ReloadEvent, ReloadHandle};
pub use resource::{Interceptor, Resolved, ResourceEntry, ResourceTable};
