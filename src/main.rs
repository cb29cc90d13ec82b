//! Hay - a pluggable static site generator.

mod build;
mod classify;
mod cli;
mod config;
mod core;
mod error;
mod fs;
mod logger;
mod plugin;
mod registry;
mod template;
mod utils;
mod watch;

use std::sync::Arc;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::SiteConfig;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = SiteConfig::load(&cli)?;
    config.log_info();
    let config = Arc::new(config);
    let plugins = cli::build::load_plugins(&config)?;

    match &cli.command {
        Commands::Build { watch: false, .. } => {
            cli::build::build_site(config, &plugins).map(|_| ())
        }
        Commands::Build { watch: true, .. } => cli::watch::watch_site(config, &plugins, true),
        Commands::Watch { .. } => cli::watch::watch_site(config, &plugins, false),
    }
}
