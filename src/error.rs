//! Error taxonomy.
//!
//! Every error here is recovered locally and reported through the logger.
//! None of them stop the event loop.

use std::path::PathBuf;

use thiserror::Error;

/// Unreadable or unparsable manifest. The installed table stays as it was.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("unable to read manifest `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed manifest `{}` at byte {position}", path.display())]
    Xml {
        path: PathBuf,
        position: u64,
        #[source]
        source: quick_xml::Error,
    },
}

/// A single path could not be registered with the OS watcher.
#[derive(Debug, Error)]
#[error("unable to watch `{}`", path.display())]
pub struct WatchRegistrationError {
    pub path: PathBuf,
    #[source]
    pub source: notify::Error,
}

/// Reload requested without the information needed to perform it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("no entry url set, nothing to reload")]
    MissingEntryUrl,
}

/// The reload finished but the runtime reports no root object.
///
/// Usually means the entry failed to load downstream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("reload of `{entry_url}` produced no visible UI")]
pub struct ReloadIntegrityWarning {
    pub entry_url: String,
}

/// `liveres.toml` errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("config file parsing error")]
    Toml(#[from] toml::de::Error),
}

/// Render an error with its `source()` chain on one line.
pub fn chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
