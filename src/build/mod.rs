//! Full site build.
//!
//! Phases:
//! - **Check** - engine and parsers must be registered (before any file is touched)
//! - **Collect** - enumerate the source tree through the exclusion rules
//! - **Process** - parallel per-file transform/copy, failures isolated per file
//! - **Report** - permalink collisions, failures, summary

mod process;
mod report;


use std::path::PathBuf;
use std::sync::Arc;

use rayon::prelude::*;

pub use process::{Processed, Processor};
pub use report::{BuildReport, error_chain};

use crate::classify::FileKind;
use crate::config::SiteConfig;
use crate::core::is_shutdown;
use crate::error::{BuildError, FileError};
use crate::fs::{ExcludeRules, FileSystem, enumerate};
use crate::logger::{ProgressLine, is_quiet};
use crate::plugin::Plugins;
use crate::registry::{Registry, print_conflicts};

const CONTENT: &str = "content";
const STATIC: &str = "static";

enum Outcome {
    Done(Processed),
    Failed(FileError),
    Cancelled,
}

pub struct BuildPipeline {
    processor: Arc<Processor>,
    rules: ExcludeRules,
}

impl BuildPipeline {
    pub fn new(
        config: Arc<SiteConfig>,
        plugins: &Plugins,
        registry: Arc<Registry>,
        fs: Arc<dyn FileSystem>,
    ) -> Result<Self, BuildError> {
        let rules = ExcludeRules::new(&config);
        let processor = Processor::new(config, plugins, registry, fs)?;
        Ok(Self {
            processor: Arc::new(processor),
            rules,
        })
    }

    /// Shared with the watch loop so both paths process files identically.
    pub fn processor(&self) -> Arc<Processor> {
        Arc::clone(&self.processor)
    }

    pub fn rules(&self) -> &ExcludeRules {
        &self.rules
    }

    /// Enumerate and process every source file.
    ///
    /// Only enumeration failure is fatal; per-file failures end up in the report.
    pub fn run(&self) -> Result<BuildReport, BuildError> {
        let source = &self.processor.config().source;
        let files = enumerate(self.processor.fs(), source, &self.rules).map_err(|e| {
            BuildError::Enumeration {
                path: source.clone(),
                source: e,
            }
        })?;

        let progress = self.create_progress(&files);
        let outcomes: Vec<Outcome> = files
            .par_iter()
            .map(|rel| {
                if is_shutdown() {
                    return Outcome::Cancelled;
                }
                let outcome = match self.processor.process(rel) {
                    Ok(processed) => Outcome::Done(processed),
                    Err(e) => Outcome::Failed(e),
                };
                if let (Some(p), Outcome::Done(done)) = (&progress, &outcome) {
                    match done {
                        Processed::Content { .. } => p.inc(CONTENT),
                        Processed::Static { .. } => p.inc(STATIC),
                        Processed::Skipped => {}
                    }
                }
                outcome
            })
            .collect();

        if let Some(p) = progress {
            p.finish();
        }

        let mut report = BuildReport::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Done(Processed::Content { .. }) => report.content += 1,
                Outcome::Done(Processed::Static { .. }) => report.statics += 1,
                Outcome::Done(Processed::Skipped) => report.skipped += 1,
                Outcome::Failed(e) => report.failures.push(e),
                Outcome::Cancelled => report.cancelled += 1,
            }
        }

        let config = self.processor.config();
        report.conflicts = self.processor.registry().conflicts();
        print_conflicts(&report.conflicts, &config.source, &config.destination);
        report.print_failures();
        report.log_summary();

        Ok(report)
    }

    fn create_progress(&self, files: &[PathBuf]) -> Option<ProgressLine> {
        if is_quiet() {
            return None;
        }
        let classifier = self.processor.classifier();
        let content = files
            .iter()
            .filter(|rel| classifier.kind(rel) == FileKind::Content)
            .count();
        let statics = files
            .iter()
            .filter(|rel| classifier.kind(rel) == FileKind::Static)
            .count();
        Some(ProgressLine::new(&[(CONTENT, content), (STATIC, statics)]))
    }
}
