//! Watch event and outcome types.

use std::path::{Path, PathBuf};

use crate::build::Processed;

/// Filesystem event with a source-relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Added(PathBuf),
    Changed(PathBuf),
    Removed(PathBuf),
    /// Initial scan finished; live events follow.
    Ready,
}

impl WatchEvent {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Added(p) | Self::Changed(p) | Self::Removed(p) => Some(p),
            Self::Ready => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Added(_) => "added",
            Self::Changed(_) => "changed",
            Self::Removed(_) => "removed",
            Self::Ready => "ready",
        }
    }
}

/// Coordinator lifecycle.
///
/// ```text
/// Initializing --Ready--> Ready --(shutdown | stream end)--> Closed
/// ```
///
/// While `Ready`, each path with queued work is individually "processing";
/// that state lives in the per-path queues, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Initializing,
    Ready,
    Closed,
}

/// Result of handling one event, sent to the optional reporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    /// Path event received before `Ready`.
    Ignored(WatchEvent),
    Ready,
    Processed {
        path: PathBuf,
        processed: Processed,
    },
    /// `targets` is what was deleted; empty when nothing at or below
    /// `path` was ever built.
    Removed {
        path: PathBuf,
        targets: Vec<PathBuf>,
    },
    Failed {
        path: PathBuf,
        message: String,
    },
}
