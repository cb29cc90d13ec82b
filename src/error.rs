//! Error taxonomy for plugin discovery, per-file processing and builds.
//!
//! ```text
//! PluginError  - MissingPlugin (fatal precondition), Broken candidate
//! FileError    - Parse / Render / Io, isolated to one source file
//! BuildError   - Enumeration (fatal), Plugin, Failed (aggregate)
//! ```

use std::path::PathBuf;

use thiserror::Error;

use crate::plugin::PluginKind;

/// Plugin discovery and lookup errors.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("cannot find {kind} plugin `{name}`")]
    Missing { kind: PluginKind, name: String },

    /// A candidate exists on disk but could not be loaded.
    #[error("plugin candidate `{}` is broken: {reason}", path.display())]
    Broken { path: PathBuf, reason: String },
}

/// Failure while processing a single source file.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("parse failed for `{}`: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("render failed for `{}`: {message}", path.display())]
    Render { path: PathBuf, message: String },

    #[error("IO error on `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FileError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short label used in summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "parse",
            Self::Render { .. } => "render",
            Self::Io { .. } => "io",
        }
    }
}

/// Whole-build errors.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to enumerate source tree `{}`", path.display())]
    Enumeration {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error("{failed} of {total} files failed")]
    Failed { failed: usize, total: usize },
}
