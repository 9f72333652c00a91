//! Command-line interface module.

mod args;
pub mod list;
pub mod watch;

pub use args::{Cli, Commands, ProjectArgs, WatchArgs};
