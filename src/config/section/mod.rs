//! Configuration section definitions.
//!
//! Each module corresponds to a section in `liveres.toml`:
//!
//! | Module     | TOML Section   | Purpose                               |
//! |------------|----------------|---------------------------------------|
//! | `manifest` | `[manifest]`   | Manifest path, suffixes, ignore rules |
//! | `reload`   | `[reload]`     | Entry point, auto-reload, timings     |

mod manifest;
mod reload;

pub use manifest::ManifestConfig;
pub use reload::ReloadConfig;
