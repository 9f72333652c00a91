//! Configuration for `liveres.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── manifest   # [manifest]
//! │   └── reload     # [reload]
//! ├── util.rs        # Config file lookup
//! └── mod.rs         # Config (this file)
//! ```
//!
//! A missing config file is not an error: every field has a default and the
//! project root falls back to the current directory.

pub mod section;
mod util;

pub use section::{ManifestConfig, ReloadConfig};
pub use util::find_config_file;

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::cli::{ProjectArgs, WatchArgs};
use crate::error::ConfigError;
use crate::utils::path::{normalize_path, resolve_against};
use crate::{debug, log};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing liveres.toml
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Absolute path to the config file, empty when none was found
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Directory relative paths resolve against
    #[serde(skip)]
    pub root: PathBuf,

    /// Resource manifest settings
    #[serde(default)]
    pub manifest: ManifestConfig,

    /// Reload settings
    #[serde(default)]
    pub reload: ReloadConfig,
}

impl Config {
    /// Load `config_name`, searching upward from the current directory.
    pub fn load(config_name: &Path) -> Result<Self, ConfigError> {
        let mut config = match find_config_file(config_name) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.config_path = normalize_path(&path);
                config
            }
            None => {
                debug!("config"; "{} not found, using defaults", config_name.display());
                Self::default()
            }
        };

        let root = match config.config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => normalize_path(Path::new(".")),
        };
        config.set_root(&root);
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn parse_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {} ignored: {}", display_path, fields.join(", "));
    }

    pub fn get_root(&self) -> &Path {
        &self.root
    }

    pub fn set_root(&mut self, path: &Path) {
        self.root = path.to_path_buf();
    }

    /// Manifest path, resolved against the root.
    pub fn manifest_path(&self) -> PathBuf {
        resolve_against(&self.manifest.path, &self.root)
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply manifest options shared by every command. List options extend
    /// the configured lists.
    pub fn apply_project_args(&mut self, args: &ProjectArgs) {
        if let Some(manifest) = &args.manifest {
            // Relative to where the command runs, not to the config file
            self.manifest.path = normalize_path(manifest);
        }
        Self::extend_unique(&mut self.manifest.suffixes, &args.suffixes);
        Self::extend_unique(&mut self.manifest.ignore, &args.ignore);
        Self::extend_unique(&mut self.manifest.ignore_prefixes, &args.ignore_prefixes);
    }

    pub fn apply_watch_args(&mut self, args: &WatchArgs) {
        if let Some(entry) = &args.entry {
            self.reload.entry = Some(entry.clone());
        }
        Self::update_option(&mut self.reload.auto, args.auto.as_ref());
    }

    fn extend_unique(list: &mut Vec<String>, extra: &[String]) {
        for item in extra {
            if !list.contains(item) {
                list.push(item.clone());
            }
        }
    }

    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(value) = cli_option {
            *config_option = value.clone();
        }
    }
}

/// Parse config from a TOML snippet.
/// Panics if there are unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> Config {
    let (parsed, ignored) = Config::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================
