//! Source file classification and output location.
//!
//! Rules, in order:
//!
//! 1. Base name starts with `_` → skip (private, no output)
//! 2. Extension in the markdown set, or the layout set (when a layouts dir is
//!    configured), or the partial set (when a partials dir is configured)
//!    → content; everything else → static
//! 3. Content: `dir/name.ext` → `dir/name.html`
//! 4. Content with a permalink and a short name other than `index`
//!    → `<permalink>/index.html`
//! 5. Static: `dir/name.ext` → `dir/name.ext`

use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;

use crate::config::SiteConfig;
use crate::template::{Options, permalink};
use crate::utils::path::{file_extension, sanitize_relative, short_name};

/// Prefix marking files that produce no output.
pub const PRIVATE_MARKER: char = '_';

/// Short name exempt from permalink overrides.
pub const INDEX_NAME: &str = "index";

/// Output placement, relative to the destination root.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutputLocation {
    pub directory: PathBuf,
    pub file_name: String,
}

impl OutputLocation {
    pub fn destination(&self, root: &Path) -> PathBuf {
        root.join(&self.directory).join(&self.file_name)
    }
}

/// Classification before output placement is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Private,
    Content,
    Static,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Skip,
    Content(OutputLocation),
    Static(OutputLocation),
}

impl Classification {
    pub fn location(&self) -> Option<&OutputLocation> {
        match self {
            Self::Skip => None,
            Self::Content(loc) | Self::Static(loc) => Some(loc),
        }
    }
}

/// Decides content vs static and computes output locations.
#[derive(Debug, Clone)]
pub struct FileClassifier {
    content_extensions: FxHashSet<String>,
}

impl FileClassifier {
    pub fn new(config: &SiteConfig) -> Self {
        let mut content_extensions: FxHashSet<String> =
            config.markdown_extensions.iter().cloned().collect();
        if config.layouts_dir.is_some() {
            content_extensions.extend(config.layout_extensions.iter().cloned());
        }
        if config.partials_dir.is_some() {
            content_extensions.extend(config.partial_extensions.iter().cloned());
        }
        Self { content_extensions }
    }

    /// Kind of a source-relative path, without looking at its contents.
    pub fn kind(&self, relative: &Path) -> FileKind {
        let is_private = relative
            .file_name()
            .is_some_and(|n| n.to_string_lossy().starts_with(PRIVATE_MARKER));
        if is_private {
            return FileKind::Private;
        }

        match file_extension(relative) {
            Some(ext) if self.content_extensions.contains(&ext) => FileKind::Content,
            _ => FileKind::Static,
        }
    }

    /// Full classification. `options` are the parsed front matter of a
    /// content file, when already available.
    pub fn classify(&self, relative: &Path, options: Option<&Options>) -> Classification {
        match self.kind(relative) {
            FileKind::Private => Classification::Skip,
            FileKind::Content => Classification::Content(content_location(relative, options)),
            FileKind::Static => Classification::Static(static_location(relative)),
        }
    }
}

fn parent_dir(relative: &Path) -> PathBuf {
    relative
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

fn content_location(relative: &Path, options: Option<&Options>) -> OutputLocation {
    let name = short_name(relative);

    if name != INDEX_NAME
        && let Some(link) = options.and_then(permalink)
    {
        return OutputLocation {
            directory: sanitize_relative(link),
            file_name: format!("{INDEX_NAME}.html"),
        };
    }

    OutputLocation {
        directory: parent_dir(relative),
        file_name: format!("{name}.html"),
    }
}

fn static_location(relative: &Path) -> OutputLocation {
    OutputLocation {
        directory: parent_dir(relative),
        file_name: relative
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    }
}
