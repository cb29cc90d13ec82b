//! Filesystem capability used by the build and watch paths.
//!
//! [`FileSystem`] is the seam; [`LocalFs`] is the on-disk implementation.
//! All operations take absolute paths except where noted.

mod scan;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use jwalk::WalkDir;

pub use scan::{ExcludeRules, enumerate};

use crate::utils::path::{file_extension, remove_extension};

pub trait FileSystem: Send + Sync {
    /// Copy bytes, creating parent directories of `to`.
    fn copy(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Create a directory and all missing parents.
    fn mk_dir(&self, path: &Path) -> io::Result<()>;

    /// Every file below `root`, relative to it, sorted.
    fn read_dir(&self, root: &Path) -> io::Result<Vec<PathBuf>>;

    fn read_file(&self, path: &Path) -> io::Result<String>;

    /// Write bytes, creating parent directories.
    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Delete a file or a directory tree. Missing paths are not an error.
    fn unlink(&self, path: &Path) -> io::Result<()>;

    fn get_file_extension(&self, path: &Path) -> Option<String> {
        file_extension(path)
    }

    fn remove_extension(&self, path: &Path) -> PathBuf {
        remove_extension(path)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

impl FileSystem for LocalFs {
    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        ensure_parent(to)?;
        fs::copy(from, to).map(|_| ())
    }

    fn mk_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn read_dir(&self, root: &Path) -> io::Result<Vec<PathBuf>> {
        // surface a missing or unreadable root before walking
        fs::read_dir(root)?;

        let mut files = Vec::new();
        for entry in WalkDir::new(root).skip_hidden(false) {
            let entry = entry.map_err(|e| io::Error::other(e.to_string()))?;
            let path = entry.path();
            let file_type = entry.file_type();
            // symlinked files count; symlinked directories are not descended
            let is_file = file_type.is_file()
                || (file_type.is_symlink() && fs::metadata(&path).is_ok_and(|m| m.is_file()));
            if !is_file {
                continue;
            }
            if let Ok(relative) = path.strip_prefix(root) {
                files.push(relative.to_path_buf());
            }
        }
        files.sort();
        Ok(files)
    }

    fn read_file(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        ensure_parent(path)?;
        fs::write(path, contents)
    }

    fn unlink(&self, path: &Path) -> io::Result<()> {
        let result = match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
            Ok(_) => fs::remove_file(path),
            Err(e) => Err(e),
        };
        match result {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_dir_lists_relative_files() {
        let temp = TempDir::new().unwrap();
        let fs = LocalFs;
        fs.write_file(&temp.path().join("b/c.txt"), b"c").unwrap();
        fs.write_file(&temp.path().join("a.md"), b"a").unwrap();
        fs.write_file(&temp.path().join(".hidden/x"), b"x").unwrap();
        fs.mk_dir(&temp.path().join("empty")).unwrap();

        let files = fs.read_dir(temp.path()).unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from(".hidden/x"),
                PathBuf::from("a.md"),
                PathBuf::from("b/c.txt"),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_read_dir_includes_symlinked_files() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(temp.path().join("shared.css"), "body {}").unwrap();
        std::os::unix::fs::symlink("../shared.css", src.join("style.css")).unwrap();
        std::os::unix::fs::symlink("../missing.css", src.join("dangling.css")).unwrap();

        assert_eq!(LocalFs.read_dir(&src).unwrap(), vec![PathBuf::from("style.css")]);
    }

    #[test]
    fn test_read_dir_missing_root_fails() {
        let temp = TempDir::new().unwrap();
        assert!(LocalFs.read_dir(&temp.path().join("missing")).is_err());
    }

    #[test]
    fn test_copy_creates_parents() {
        let temp = TempDir::new().unwrap();
        let from = temp.path().join("in.bin");
        let to = temp.path().join("out/deep/in.bin");
        fs::write(&from, [0u8, 159, 146, 150]).unwrap();

        LocalFs.copy(&from, &to).unwrap();
        assert_eq!(fs::read(&to).unwrap(), vec![0u8, 159, 146, 150]);
    }

    #[test]
    fn test_unlink_file_tree_and_missing() {
        let temp = TempDir::new().unwrap();
        let fs = LocalFs;
        let file = temp.path().join("dir/sub/f.txt");
        fs.write_file(&file, b"x").unwrap();

        fs.unlink(&file).unwrap();
        assert!(!file.exists());
        assert!(temp.path().join("dir/sub").exists());

        fs.unlink(&temp.path().join("dir")).unwrap();
        assert!(!temp.path().join("dir").exists());

        fs.unlink(&temp.path().join("dir")).unwrap();
    }

    #[test]
    fn test_extension_helpers() {
        assert_eq!(LocalFs.get_file_extension(Path::new("a/b.md")), Some("md".into()));
        assert_eq!(LocalFs.remove_extension(Path::new("a/b.md")), PathBuf::from("a/b"));
    }
}
