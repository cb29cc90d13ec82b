//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Hay static site generator CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Source directory path (relative to project root)
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub source: Option<PathBuf>,

    /// Output directory path (relative to project root)
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub destination: Option<PathBuf>,

    /// Config file path (default: hay.toml)
    #[arg(short = 'C', long, default_value = "hay.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build the whole site once
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        build_args: BuildArgs,

        /// Keep watching for changes after the build starts
        #[arg(short, long)]
        watch: bool,
    },

    /// Rebuild files incrementally as they change (no initial build)
    #[command(visible_alias = "w")]
    Watch {
        #[command(flatten)]
        build_args: BuildArgs,
    },
}

/// Shared arguments for Build and Watch commands
#[derive(clap::Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Enable verbose output for debugging
    #[arg(short = 'V', long)]
    pub verbose: bool,

    /// Only print warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Template engine plugin to use instead of `plugins.engine`
    #[arg(short, long)]
    pub engine: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_flags() {
        let cli = Cli::parse_from(["hay", "-s", "site", "build", "--watch", "-e", "shout"]);
        assert_eq!(cli.source, Some(PathBuf::from("site")));
        assert_eq!(cli.config, PathBuf::from("hay.toml"));
        match cli.command {
            Commands::Build { build_args, watch } => {
                assert!(watch);
                assert_eq!(build_args.engine.as_deref(), Some("shout"));
            }
            other => panic!("expected build, got {other:?}"),
        }
    }

    #[test]
    fn test_watch_alias() {
        let cli = Cli::parse_from(["hay", "-C", "site.toml", "w", "--verbose"]);
        assert_eq!(cli.config, PathBuf::from("site.toml"));
        assert!(matches!(
            cli.command,
            Commands::Watch { build_args } if build_args.verbose
        ));
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["hay", "build", "-q", "-V"]).is_err());
    }
}
