use crate::error::{BuildError, FileError};
use crate::log;
use crate::registry::Conflict;
use crate::utils::plural_count;

/// Outcome of a full build.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub content: usize,
    pub statics: usize,
    /// Private files
    pub skipped: usize,
    /// Files not attempted because shutdown was requested
    pub cancelled: usize,
    pub failures: Vec<FileError>,
    pub conflicts: Vec<Conflict>,
}

impl BuildReport {
    pub fn processed(&self) -> usize {
        self.content + self.statics
    }

    pub fn total(&self) -> usize {
        self.processed() + self.skipped + self.cancelled + self.failures.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.cancelled == 0
    }

    /// Print every failure, one per line.
    pub fn print_failures(&self) {
        for failure in &self.failures {
            log!("error"; "[{}] {}", failure.label(), error_chain(failure));
        }
    }

    pub fn log_summary(&self) {
        let mut parts = vec![
            plural_count(self.content, "page"),
            plural_count(self.statics, "static file"),
        ];
        if self.skipped > 0 {
            parts.push(format!("{} skipped", self.skipped));
        }
        if self.cancelled > 0 {
            parts.push(format!("{} cancelled", self.cancelled));
        }
        if !self.failures.is_empty() {
            parts.push(format!("{} failed", self.failures.len()));
        }
        log!("build"; "{}", parts.join(", "));
    }

    /// `Failed` if any file failed or the build was interrupted.
    pub fn into_result(self) -> Result<Self, BuildError> {
        if self.is_success() {
            return Ok(self);
        }
        Err(BuildError::Failed {
            failed: self.failures.len() + self.cancelled,
            total: self.total(),
        })
    }
}

/// Error message followed by its sources, `: `-separated.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut line = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        line.push_str(": ");
        line.push_str(&cause.to_string());
        source = cause.source();
    }
    line
}
