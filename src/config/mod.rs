//! Site configuration management for `hay.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── error      # ConfigError
//! ├── util       # config file discovery, extension normalization
//! └── mod.rs     # SiteConfig (this file)
//! ```
//!
//! # Layout
//!
//! | Key / Section          | Purpose                                        |
//! |------------------------|------------------------------------------------|
//! | `source`, `destination`| Source tree and output tree                    |
//! | `exclude`              | Glob patterns skipped by builds and the watcher|
//! | `*_extensions`         | Which files are content (rendered)             |
//! | `*_dir`                | Special directories (not copied or rendered)   |
//! | `[plugins]`            | Engine/parser names and discovery locations    |
//! | `[markdown]`           | Extensions of the built-in markdown engine     |
//!
//! A missing config file is not an error: defaults apply and the project
//! root is the current directory.

mod error;
mod util;

pub use error::ConfigError;
pub use util::normalize_extensions;
use util::find_config_file;

use crate::cli::{BuildArgs, Cli, Commands};
use crate::log;
use crate::plugin::builtin::MarkdownOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing hay.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Source tree, relative to the project root
    pub source: PathBuf,

    /// Output tree, relative to the project root
    pub destination: PathBuf,

    /// Glob patterns (relative to source) that are neither built nor watched
    pub exclude: Vec<String>,

    /// Extensions rendered through the engine
    pub markdown_extensions: Vec<String>,

    /// Layouts directory, relative to source
    pub layouts_dir: Option<PathBuf>,
    /// Extensions treated as content when `layouts_dir` is set
    pub layout_extensions: Vec<String>,

    /// Partials directory, relative to source
    pub partials_dir: Option<PathBuf>,
    /// Extensions treated as content when `partials_dir` is set
    pub partial_extensions: Vec<String>,

    /// Posts directory, relative to source
    pub posts_dir: Option<PathBuf>,

    /// Plugin selection and discovery
    pub plugins: PluginsConfig,

    /// Built-in markdown engine options
    pub markdown: MarkdownOptions,
}

/// `[plugins]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    /// Engine used to render content files
    pub engine: String,

    /// Parsers that split front matter from the body, in priority order
    pub parsers: Vec<String>,

    /// Directories searched for plugin modules. `{cwd}` and `~` are expanded.
    pub dirs: Vec<String>,

    /// Module naming templates. `{kind}` (or `{prefix}`) and `{name}` are substituted.
    pub formats: Vec<String>,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            engine: "markdown".into(),
            parsers: vec!["frontmatter".into()],
            dirs: vec!["{cwd}/hay_plugins".into()],
            formats: vec!["hay-{name}-{kind}".into()],
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            root: PathBuf::new(),
            source: PathBuf::from("."),
            destination: PathBuf::from("build"),
            exclude: Vec::new(),
            markdown_extensions: vec!["md".into()],
            layouts_dir: None,
            layout_extensions: Vec::new(),
            partials_dir: None,
            partial_extensions: Vec::new(),
            posts_dir: None,
            plugins: PluginsConfig::default(),
            markdown: MarkdownOptions::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from CLI arguments.
    ///
    /// Searches upward from cwd for the config file. The project root is
    /// the config file's parent directory, or cwd when there is no file.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let (mut config, root) = match find_config_file(&cwd, &cli.config) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                let root = path.parent().map(Path::to_path_buf).unwrap_or(cwd);
                config.config_path = path;
                (config, root)
            }
            None => {
                crate::debug!("config"; "no {} found, using defaults", cli.config.display());
                (Self::default(), cwd)
            }
        };

        config.apply_cli(cli);
        config.set_root(&root);
        config.resolve_paths();
        config.validate()?;

        Ok(config)
    }

    /// Default configuration rooted at `root`, with paths resolved.
    pub fn with_root(root: &Path) -> Self {
        let mut config = Self::default();
        config.set_root(root);
        config.resolve_paths();
        config
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
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

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "ignoring unknown fields in {}: {}", display_path, fields.join(", "));
    }

    /// Set the root directory path
    pub fn set_root(&mut self, path: &Path) {
        self.root = path.to_path_buf();
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    fn apply_cli(&mut self, cli: &Cli) {
        Self::update_option(&mut self.source, cli.source.as_ref());
        Self::update_option(&mut self.destination, cli.destination.as_ref());

        let args = match &cli.command {
            Commands::Build { build_args, .. } | Commands::Watch { build_args } => build_args,
        };
        self.apply_build_args(args);
    }

    fn apply_build_args(&mut self, args: &BuildArgs) {
        crate::logger::set_verbose(args.verbose);
        crate::logger::set_quiet(args.quiet);
        Self::update_option(&mut self.plugins.engine, args.engine.as_ref());
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // path normalization
    // ========================================================================

    /// Resolve all paths to absolute form.
    ///
    /// Source and destination are relative to the project root; the special
    /// directories are relative to source. Idempotent.
    pub fn resolve_paths(&mut self) {
        use crate::utils::path::normalize_path;

        let root = normalize_path(&self.root);
        self.set_root(&root);

        self.source = normalize_path(&root.join(&self.source));
        self.destination = normalize_path(&root.join(&self.destination));

        let source = self.source.clone();
        for dir in [
            &mut self.layouts_dir,
            &mut self.partials_dir,
            &mut self.posts_dir,
        ] {
            if let Some(path) = dir.take() {
                *dir = Some(normalize_path(&source.join(path)));
            }
        }

        normalize_extensions(&mut self.markdown_extensions);
        normalize_extensions(&mut self.layout_extensions);
        normalize_extensions(&mut self.partial_extensions);
    }

    /// Destination relative to source, when the output tree lives inside it.
    pub fn destination_in_source(&self) -> Option<PathBuf> {
        self.destination
            .strip_prefix(&self.source)
            .ok()
            .map(Path::to_path_buf)
    }

    /// Special directory relative to source, if configured and inside it.
    pub fn source_relative(&self, dir: Option<&PathBuf>) -> Option<PathBuf> {
        dir.and_then(|d| d.strip_prefix(&self.source).ok())
            .map(Path::to_path_buf)
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate configuration. Fails on the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.plugins.engine.trim().is_empty() {
            return Err(ConfigError::Validation("`plugins.engine` is empty".into()));
        }
        if self.plugins.parsers.is_empty() {
            return Err(ConfigError::Validation(
                "`plugins.parsers` needs at least one parser".into(),
            ));
        }
        if self.markdown_extensions.is_empty() {
            return Err(ConfigError::Validation(
                "`markdown_extensions` is empty".into(),
            ));
        }
        if self.source == self.destination || self.source.starts_with(&self.destination) {
            return Err(ConfigError::Validation(format!(
                "source `{}` must not be inside destination `{}`",
                self.source.display(),
                self.destination.display()
            )));
        }
        for pattern in &self.exclude {
            glob::Pattern::new(pattern).map_err(|e| {
                ConfigError::Validation(format!("invalid exclude pattern `{pattern}`: {e}"))
            })?;
        }
        Ok(())
    }

    /// Print the resolved layout of the site.
    pub fn log_info(&self) {
        log!("config"; "source      {}", self.source.display());
        if let Some(dir) = &self.posts_dir {
            log!("config"; "posts       {}", dir.display());
        }
        if let Some(dir) = &self.layouts_dir {
            log!("config"; "layouts     {}", dir.display());
        }
        if let Some(dir) = &self.partials_dir {
            log!("config"; "partials    {}", dir.display());
        }
        log!("config"; "destination {}", self.destination.display());
    }
}

// ============================================================================
// Test Helpers
// ============================================================================

/// Parse config, panicking on unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> SiteConfig {
    let (parsed, ignored) = SiteConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}
