//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Hot reload for declarative UI resource bundles
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: liveres.toml)
    #[arg(short = 'C', long, global = true, default_value = "liveres.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Print the resource table
    #[command(visible_alias = "l")]
    List {
        #[command(flatten)]
        project: ProjectArgs,
    },

    /// Watch resources and reload the entry point on every change
    #[command(visible_alias = "w")]
    Watch {
        #[command(flatten)]
        project: ProjectArgs,

        #[command(flatten)]
        args: WatchArgs,
    },
}

/// Manifest options shared by every command.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// Resource manifest (overrides `[manifest] path`)
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub manifest: Option<PathBuf>,

    /// Additional allowed file suffix (repeatable)
    #[arg(short, long = "suffix", value_name = "SUFFIX")]
    pub suffixes: Vec<String>,

    /// Additional ignore pattern over display paths, e.g. `/test/*` (repeatable)
    #[arg(short, long, value_name = "PATTERN")]
    pub ignore: Vec<String>,

    /// Additional group prefix to skip, e.g. `/fonts` (repeatable)
    #[arg(short = 'p', long = "ignore-prefix", value_name = "PREFIX")]
    pub ignore_prefixes: Vec<String>,
}

/// Watch command arguments.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct WatchArgs {
    /// Entry point URL, e.g. `res:/main.qml` (overrides `[reload] entry`)
    #[arg(short, long, value_hint = clap::ValueHint::Url)]
    pub entry: Option<String>,

    /// Reload on file changes
    #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub auto: Option<bool>,
}

impl Cli {
    pub fn project_args(&self) -> &ProjectArgs {
        match &self.command {
            Commands::List { project } | Commands::Watch { project, .. } => project,
        }
    }
}
