//! `[manifest]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [manifest]
//! path = "qml.qrc"              # Relative to the config file
//! suffixes = ["qml", "js"]      # Watched and intercepted file suffixes
//! ignore = ["/test/*"]          # Intercepted but never watched
//! ignore_prefixes = ["/fonts"]  # Groups skipped entirely
//! ```

use std::path::PathBuf;

use serde::Deserialize;

use crate::resource::{DEFAULT_SUFFIX, Filters};

/// Resource manifest location and filters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// Manifest file.
    pub path: PathBuf,

    /// Allowed file suffixes, with or without the leading dot.
    pub suffixes: Vec<String>,

    /// Wildcard patterns over display paths (`/pages/Main.qml`).
    pub ignore: Vec<String>,

    /// Wildcard patterns over group prefixes.
    pub ignore_prefixes: Vec<String>,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("qml.qrc"),
            suffixes: vec![DEFAULT_SUFFIX.to_string()],
            ignore: Vec::new(),
            ignore_prefixes: Vec::new(),
        }
    }
}

impl ManifestConfig {
    /// Build parse filters from the configured lists.
    pub fn filters(&self) -> Filters {
        let mut filters = Filters::empty();
        for suffix in &self.suffixes {
            filters.allow_suffix(suffix);
        }
        for pattern in &self.ignore {
            filters.ignore(pattern);
        }
        for prefix in &self.ignore_prefixes {
            filters.ignore_prefix(prefix);
        }
        filters
    }
}
