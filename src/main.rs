//! liveres - hot reload for declarative UI resource bundles.

use anyhow::Result;
use clap::{ColorChoice, Parser};
use liveres::cli::{self, Cli, Commands};
use liveres::config::Config;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    cli::watch::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    liveres::logger::set_verbose(cli.verbose);

    let mut config = Config::load(&cli.config)?;
    config.apply_project_args(cli.project_args());

    match &cli.command {
        Commands::List { .. } => cli::list::list_resources(&config),
        Commands::Watch { args, .. } => {
            config.apply_watch_args(args);
            cli::watch::watch_resources(&config)
        }
    }
}
