//! Virtual resources and their on-disk counterparts.
//!
//! ```text
//! manifest ──parse──▶ ResourceTable ──swap──▶ SharedTable
//!                                               ├──▶ Interceptor (every load)
//!                                               └──▶ watch set   (watcher)
//! ```
//!
//! - [`ResourceEntry`]: one `res:/...` path mapped to a local file
//! - [`Filters`]: allowed suffixes and ignore rules, applied at parse time
//! - [`table`]: exact-match lookup table
//! - [`handle`]: atomic table swap and the read-only [`Interceptor`]

pub mod handle;
pub mod table;

pub use handle::{Interceptor, Resolved, SharedTable};
pub use table::ResourceTable;

use std::path::PathBuf;

use percent_encoding::percent_decode_str;
use url::Url;

use crate::pattern::{Pattern, any_match};

/// Scheme of every virtual path.
pub const SCHEME: &str = "res";

/// Suffix watched when nothing else is configured.
pub const DEFAULT_SUFFIX: &str = "qml";

/// A manifest file entry after filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    /// Canonical virtual path, e.g. `res:/pages/Main.qml`
    pub virtual_path: String,
    /// Absolute path of the file on disk
    pub local_path: PathBuf,
    /// File suffix without the dot
    pub suffix: String,
    /// Matched an ignore filter: still intercepted, never watched
    pub ignored: bool,
}

/// Normalize a group prefix to `/` or `/name/`.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}/")
    }
}

/// Prefix-relative display path: `/pages/` + `Main.qml` → `/pages/Main.qml`.
pub fn display_path(normalized_prefix: &str, name: &str) -> String {
    format!("{normalized_prefix}{}", name.trim_start_matches('/'))
}

/// Virtual path for a display path: `/pages/Main.qml` → `res:/pages/Main.qml`.
///
/// Plain text: only empty, `.` and `..` segments are folded. File names keep
/// `#`, `?` and `%` as written.
pub fn virtual_path(display: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in display.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            name => segments.push(name),
        }
    }
    format!("{SCHEME}:/{}", segments.join("/"))
}

/// Canonical form of a `res:` URL, or `None` for anything else.
///
/// `res:///a/./b.qml`, `res:/a/../a/b.qml` and `res:/a/b%2Eqml` all become
/// `res:/a/b.qml`. Query and fragment are dropped.
pub fn canonicalize(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    if parsed.scheme() != SCHEME {
        return None;
    }
    let path = percent_decode_str(parsed.path()).decode_utf8_lossy();
    if path.starts_with('/') {
        Some(format!("{SCHEME}:{path}"))
    } else {
        Some(format!("{SCHEME}:/{path}"))
    }
}

// ============================================================================
// Filters
// ============================================================================

/// Parse-time filtering rules.
///
/// Lists keep insertion order and never hold duplicates.
#[derive(Debug, Clone)]
pub struct Filters {
    suffixes: Vec<String>,
    ignore: Vec<Pattern>,
    ignore_prefixes: Vec<Pattern>,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            suffixes: vec![DEFAULT_SUFFIX.to_string()],
            ignore: Vec::new(),
            ignore_prefixes: Vec::new(),
        }
    }
}

impl Filters {
    /// No allowed suffixes, no ignore rules.
    pub fn empty() -> Self {
        Self {
            suffixes: Vec::new(),
            ignore: Vec::new(),
            ignore_prefixes: Vec::new(),
        }
    }

    /// Allow a file suffix (`qml` or `.qml`). Returns `false` if already allowed.
    pub fn allow_suffix(&mut self, suffix: &str) -> bool {
        let suffix = suffix.trim().trim_start_matches('.');
        if suffix.is_empty() || self.suffixes.iter().any(|s| s == suffix) {
            return false;
        }
        self.suffixes.push(suffix.to_string());
        true
    }

    /// Ignore entries whose display path matches `pattern`.
    pub fn ignore(&mut self, pattern: &str) -> bool {
        if self.ignore.iter().any(|p| p.as_str() == pattern) {
            return false;
        }
        self.ignore.push(Pattern::compile(pattern));
        true
    }

    /// Skip whole groups whose prefix matches `prefix`.
    pub fn ignore_prefix(&mut self, prefix: &str) -> bool {
        let normalized = normalize_prefix(prefix);
        if self.ignore_prefixes.iter().any(|p| p.as_str() == normalized) {
            return false;
        }
        self.ignore_prefixes.push(Pattern::compile(&normalized));
        true
    }

    pub fn allows_suffix(&self, suffix: &str) -> bool {
        self.suffixes.iter().any(|s| s == suffix)
    }

    pub fn is_ignored(&self, display_path: &str) -> bool {
        any_match(&self.ignore, display_path)
    }

    /// `prefix` must already be normalized.
    pub fn is_prefix_ignored(&self, prefix: &str) -> bool {
        any_match(&self.ignore_prefixes, prefix)
    }

    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }

    pub fn ignore_filters(&self) -> impl Iterator<Item = &str> {
        self.ignore.iter().map(Pattern::as_str)
    }

    pub fn prefix_ignore_filters(&self) -> impl Iterator<Item = &str> {
        self.ignore_prefixes.iter().map(Pattern::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix(""), "/");
        assert_eq!(normalize_prefix("/"), "/");
        assert_eq!(normalize_prefix("/pages"), "/pages/");
        assert_eq!(normalize_prefix("pages/"), "/pages/");
        assert_eq!(normalize_prefix("/a/b/"), "/a/b/");
    }

    #[test]
    fn test_virtual_path() {
        assert_eq!(virtual_path(&display_path("/", "main.qml")), "res:/main.qml");
        assert_eq!(
            virtual_path(&display_path("/pages/", "Main.qml")),
            "res:/pages/Main.qml"
        );
        assert_eq!(
            virtual_path(&display_path("/pages/", "/Main.qml")),
            "res:/pages/Main.qml"
        );
    }

    #[test]
    fn test_virtual_path_is_plain_text() {
        assert_eq!(virtual_path("/a#1.qml"), "res:/a#1.qml");
        assert_eq!(virtual_path("/b?x.qml"), "res:/b?x.qml");
        assert_eq!(virtual_path("/c%2E.qml"), "res:/c%2E.qml");
        assert_eq!(virtual_path("/pages/./sub/../Main.qml"), "res:/pages/Main.qml");
        assert_eq!(virtual_path("//pages//Main.qml"), "res:/pages/Main.qml");
    }

    #[test]
    fn test_canonicalize() {
        assert_eq!(canonicalize("res:/main.qml").as_deref(), Some("res:/main.qml"));
        assert_eq!(canonicalize("res:///main.qml").as_deref(), Some("res:/main.qml"));
        assert_eq!(
            canonicalize("res:/pages/./sub/../Main.qml").as_deref(),
            Some("res:/pages/Main.qml")
        );
        assert_eq!(
            canonicalize("res:/My%20Page.qml?x=1#top").as_deref(),
            Some("res:/My Page.qml")
        );
        assert_eq!(canonicalize("file:///tmp/main.qml"), None);
        assert_eq!(canonicalize("/tmp/main.qml"), None);
    }

    #[test]
    fn test_virtual_path_keeps_spaces() {
        assert_eq!(virtual_path("/My Page.qml"), "res:/My Page.qml");
        assert_eq!(canonicalize("res:/My Page.qml").as_deref(), Some("res:/My Page.qml"));
    }

    #[test]
    fn test_filters_default_allows_qml() {
        let filters = Filters::default();
        assert!(filters.allows_suffix("qml"));
        assert!(!filters.allows_suffix("js"));
    }

    #[test]
    fn test_filters_dedup() {
        let mut filters = Filters::empty();
        assert!(filters.allow_suffix(".js"));
        assert!(!filters.allow_suffix("js"));
        assert!(!filters.allow_suffix(""));
        assert_eq!(filters.suffixes(), ["js"]);

        assert!(filters.ignore("/test/*"));
        assert!(!filters.ignore("/test/*"));

        assert!(filters.ignore_prefix("/fonts"));
        assert!(!filters.ignore_prefix("/fonts/"));
        assert_eq!(filters.prefix_ignore_filters().collect::<Vec<_>>(), ["/fonts/"]);
    }

    #[test]
    fn test_prefix_ignore_matches_normalized() {
        let mut filters = Filters::empty();
        filters.ignore_prefix("test");
        assert!(filters.is_prefix_ignored(&normalize_prefix("/test")));
        assert!(!filters.is_prefix_ignored(&normalize_prefix("/testing")));

        filters.ignore_prefix("/");
        assert!(filters.is_prefix_ignored(&normalize_prefix("")));
    }
}
