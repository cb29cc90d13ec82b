//! Capability interfaces for pluggable parsers and rendering engines.
//!
//! ```text
//! raw bytes --Parser::parse--> Parsed { contents, options }
//!                                  |
//!                               FileInfo --Engine::compile--> Renderable --render--> HTML
//! ```
//!
//! Capabilities report failures as `anyhow::Error`; the build maps them to
//! `FileError::Parse` / `FileError::Render` with the offending path.

use std::path::PathBuf;

use anyhow::Result;

use crate::classify::OutputLocation;

/// Parsed front matter values.
pub type Options = serde_json::Map<String, serde_json::Value>;

/// Key in [`Options`] that overrides a content file's output directory.
pub const PERMALINK_KEY: &str = "permalink";

/// Result of splitting a raw file into body and options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parsed {
    pub contents: String,
    pub options: Options,
}

impl Parsed {
    pub fn body(contents: impl Into<String>) -> Self {
        Self {
            contents: contents.into(),
            options: Options::new(),
        }
    }
}

/// Permalink option, if present as a non-empty string.
pub fn permalink(options: &Options) -> Option<&str> {
    options
        .get(PERMALINK_KEY)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
}

/// Per-file record handed to engines. Created fresh for every processed file.
#[derive(Debug, Clone)]
pub struct FileInfo {
    /// Absolute source path
    pub source: PathBuf,
    /// Path relative to the source root
    pub relative: PathBuf,
    /// Where the output goes, relative to the destination root
    pub output: OutputLocation,
    /// File name without extension
    pub short_name: String,
    /// Extension without the dot
    pub extension: Option<String>,
    /// Body after parsing
    pub contents: String,
    /// Options after parsing
    pub options: Options,
}

/// Splits raw file contents into a body and options.
pub trait Parser: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this parser handles files with the given extension.
    fn accepts(&self, _extension: Option<&str>) -> bool {
        true
    }

    fn parse(&self, raw: &str, file_name: &str) -> Result<Parsed>;
}

/// Compiles a parsed file into something that can be rendered.
pub trait Engine: Send + Sync {
    fn name(&self) -> &str;

    fn compile<'a>(&'a self, info: &FileInfo) -> Result<Box<dyn Renderable + 'a>>;
}

/// A compiled template.
pub trait Renderable {
    fn render(&self, info: &FileInfo) -> Result<String>;
}
