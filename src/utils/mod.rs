//! Small helpers shared across modules.

pub mod path;

pub use path::{normalize_path, resolve_against};
