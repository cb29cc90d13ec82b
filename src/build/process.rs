//! Single-file processing shared by full builds and watch events.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::classify::{Classification, FileClassifier, FileKind};
use crate::config::SiteConfig;
use crate::error::{FileError, PluginError};
use crate::fs::FileSystem;
use crate::plugin::Plugins;
use crate::registry::Registry;
use crate::template::{Engine, FileInfo, Parsed, Parser};
use crate::utils::path::{file_extension, short_name};

/// What happened to one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Processed {
    /// Private file, no output
    Skipped,
    Content { destination: PathBuf },
    Static { destination: PathBuf },
}

/// Turns a source-relative path into its destination artifact.
pub struct Processor {
    config: Arc<SiteConfig>,
    classifier: FileClassifier,
    engine: Arc<dyn Engine>,
    parsers: Vec<Arc<dyn Parser>>,
    registry: Arc<Registry>,
    fs: Arc<dyn FileSystem>,
}

impl Processor {
    /// Fails with `Missing` if the configured engine or any parser is not
    /// registered.
    pub fn new(
        config: Arc<SiteConfig>,
        plugins: &Plugins,
        registry: Arc<Registry>,
        fs: Arc<dyn FileSystem>,
    ) -> Result<Self, PluginError> {
        let engine = plugins.engine(&config.plugins.engine)?;
        let parsers = plugins.parsers(&config.plugins.parsers)?;
        Ok(Self {
            classifier: FileClassifier::new(&config),
            config,
            engine,
            parsers,
            registry,
            fs,
        })
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn classifier(&self) -> &FileClassifier {
        &self.classifier
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    pub fn source_path(&self, relative: &Path) -> PathBuf {
        self.config.source.join(relative)
    }

    /// Classify, transform or copy, write, then record in the registry.
    pub fn process(&self, relative: &Path) -> Result<Processed, FileError> {
        match self.classifier.kind(relative) {
            FileKind::Private => Ok(Processed::Skipped),
            FileKind::Content => self.process_content(relative),
            FileKind::Static => self.process_static(relative),
        }
    }

    fn process_content(&self, relative: &Path) -> Result<Processed, FileError> {
        let source = self.source_path(relative);
        let raw = self
            .fs
            .read_file(&source)
            .map_err(|e| FileError::io(&source, e))?;

        let extension = file_extension(relative);
        let parsed = self.parse(&raw, &source, extension.as_deref())?;

        let Classification::Content(output) = self.classifier.classify(relative, Some(&parsed.options))
        else {
            return Ok(Processed::Skipped);
        };

        let info = FileInfo {
            source: source.clone(),
            relative: relative.to_path_buf(),
            output,
            short_name: short_name(relative),
            extension,
            contents: parsed.contents,
            options: parsed.options,
        };

        let html = self
            .engine
            .compile(&info)
            .and_then(|template| template.render(&info))
            .map_err(|e| FileError::Render {
                path: source.clone(),
                message: format!("{e:#}"),
            })?;

        let destination = info.output.destination(&self.config.destination);
        self.fs
            .write_file(&destination, html.as_bytes())
            .map_err(|e| FileError::io(&destination, e))?;

        self.registry.put(source, destination.clone());
        Ok(Processed::Content { destination })
    }

    /// First parser accepting the extension; none means the raw file is the body.
    fn parse(&self, raw: &str, source: &Path, extension: Option<&str>) -> Result<Parsed, FileError> {
        let Some(parser) = self.parsers.iter().find(|p| p.accepts(extension)) else {
            return Ok(Parsed::body(raw));
        };
        parser
            .parse(raw, &source.to_string_lossy())
            .map_err(|e| FileError::Parse {
                path: source.to_path_buf(),
                message: format!("{e:#}"),
            })
    }

    fn process_static(&self, relative: &Path) -> Result<Processed, FileError> {
        let source = self.source_path(relative);
        let Some(output) = self.classifier.classify(relative, None).location().cloned() else {
            return Ok(Processed::Skipped);
        };
        let destination = output.destination(&self.config.destination);

        self.fs
            .copy(&source, &destination)
            .map_err(|e| FileError::io(&source, e))?;

        self.registry.put(source, destination.clone());
        Ok(Processed::Static { destination })
    }

    /// Remove the outputs of a deleted source file or directory.
    ///
    /// For each registered source at or below `relative`, deletes the
    /// directory holding its destination, or only the file when that
    /// directory is the destination root. Returns the deleted targets,
    /// sorted; empty when nothing under `relative` was ever built.
    pub fn remove(&self, relative: &Path) -> Result<Vec<PathBuf>, FileError> {
        let source = self.source_path(relative);
        let sources = if self.registry.contains(&source) {
            vec![source]
        } else {
            self.registry.sources_under(&source)
        };

        let mut targets = Vec::new();
        for source in sources {
            let Some(destination) = self.registry.get(&source) else {
                continue;
            };
            let target = self.removal_target(&destination);
            self.fs
                .unlink(&target)
                .map_err(|e| FileError::io(&target, e))?;

            self.registry.remove(&source);
            if !targets.contains(&target) {
                targets.push(target);
            }
        }

        targets.sort();
        Ok(targets)
    }

    fn removal_target(&self, destination: &Path) -> PathBuf {
        let root = &self.config.destination;
        match destination.parent() {
            Some(dir) if dir != root && dir.starts_with(root) => dir.to_path_buf(),
            _ => destination.to_path_buf(),
        }
    }
}
