//! Path helpers.
//!
//! Pure functions, except `normalize_path` which consults the filesystem
//! to canonicalize when it can.

use std::path::{Component, Path, PathBuf};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// Falls back to:
/// - Return as-is if already absolute
/// - Join with current directory if relative
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// Render a relative path with `/` separators regardless of platform.
///
/// Glob patterns and log lines are written against this form.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Extension of a file name without the leading dot.
///
/// `post.md` -> `Some("md")`, `Makefile` -> `None`, `.env` -> `None`.
pub fn file_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_string)
}

/// Strip the final extension, keeping any directory part.
///
/// `blog/post.md` -> `blog/post`.
pub fn remove_extension(path: &Path) -> PathBuf {
    match path.file_stem() {
        Some(stem) => path.with_file_name(stem),
        None => path.to_path_buf(),
    }
}

/// File name without extension.
pub fn short_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Turn user-provided path text into a relative path that cannot escape
/// its base directory.
///
/// Only normal components survive: `/contact/` -> `contact`,
/// `../a/./b` -> `a/b`, `/` -> empty.
pub fn sanitize_relative(raw: &str) -> PathBuf {
    Path::new(raw)
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s),
            _ => None,
        })
        .collect()
}

/// Check whether any component of a relative path is hidden (starts with `.`).
pub fn has_hidden_component(path: &Path) -> bool {
    path.components().any(|c| match c {
        Component::Normal(s) => s.to_string_lossy().starts_with('.'),
        _ => false,
    })
}
