//! Source tree enumeration and exclusion rules.
//!
//! A source-relative path is excluded when any of these hold:
//!
//! - it lies under the partials, posts or layouts directory
//! - it lies under the destination (when the destination is inside source)
//! - any component starts with `.`
//! - the file name is an editor temp/backup artifact (`*.swp`, `*~`, ...)
//! - it, or one of its parent directories, matches an `exclude` glob
//!   (matched against the `/`-separated relative form)

use std::io;
use std::path::{Path, PathBuf};

use glob::Pattern;

use super::FileSystem;
use crate::config::SiteConfig;
use crate::log;
use crate::utils::path::{has_hidden_component, to_slash};

#[derive(Debug, Clone, Default)]
pub struct ExcludeRules {
    /// Source-relative subtrees that never produce output
    subtrees: Vec<PathBuf>,
    patterns: Vec<Pattern>,
}

impl ExcludeRules {
    pub fn new(config: &SiteConfig) -> Self {
        let subtrees = [
            config.source_relative(config.partials_dir.as_ref()),
            config.source_relative(config.posts_dir.as_ref()),
            config.source_relative(config.layouts_dir.as_ref()),
            config.destination_in_source(),
        ]
        .into_iter()
        .flatten()
        .filter(|dir| !dir.as_os_str().is_empty())
        .collect();

        let patterns = config
            .exclude
            .iter()
            .filter_map(|raw| match Pattern::new(raw) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    log!("warning"; "ignoring invalid exclude pattern `{raw}`: {e}");
                    None
                }
            })
            .collect();

        Self { subtrees, patterns }
    }

    pub fn is_excluded(&self, relative: &Path) -> bool {
        if has_hidden_component(relative) || is_temp_file(relative) {
            return true;
        }
        if self.subtrees.iter().any(|dir| relative.starts_with(dir)) {
            return true;
        }
        relative
            .ancestors()
            .filter(|p| !p.as_os_str().is_empty())
            .any(|p| {
                let slash = to_slash(p);
                self.patterns.iter().any(|pattern| pattern.matches(&slash))
            })
    }
}

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with(".#")
        || name == "4913"
}

/// Every non-excluded file below `source`, relative to it, sorted.
pub fn enumerate(
    fs: &dyn FileSystem,
    source: &Path,
    rules: &ExcludeRules,
) -> io::Result<Vec<PathBuf>> {
    Ok(fs
        .read_dir(source)?
        .into_iter()
        .filter(|rel| !rules.is_excluded(rel))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::LocalFs;
    use tempfile::TempDir;

    fn rules(configure: impl FnOnce(&mut SiteConfig)) -> ExcludeRules {
        let mut config = SiteConfig::default();
        config.set_root(Path::new("/site"));
        configure(&mut config);
        config.source = PathBuf::from("/site/src");
        config.destination = PathBuf::from("/site/build");
        for dir in [
            &mut config.layouts_dir,
            &mut config.partials_dir,
            &mut config.posts_dir,
        ] {
            if let Some(rel) = dir.take() {
                *dir = Some(PathBuf::from("/site/src").join(rel));
            }
        }
        ExcludeRules::new(&config)
    }

    #[test]
    fn test_hidden_excluded() {
        let rules = rules(|_| {});
        assert!(rules.is_excluded(Path::new(".git/HEAD")));
        assert!(rules.is_excluded(Path::new("blog/.draft.md")));
        assert!(!rules.is_excluded(Path::new("blog/post.md")));
    }

    #[test]
    fn test_editor_artifacts_excluded() {
        let rules = rules(|_| {});
        for name in ["a.md.swp", "a.md~", "blog/.#a.md", "archive.bak", "x.tmp", "4913"] {
            assert!(rules.is_excluded(Path::new(name)), "{name}");
        }
        assert!(!rules.is_excluded(Path::new("a.md")));
        assert!(!rules.is_excluded(Path::new("backup/a.md")));
    }

    #[test]
    fn test_special_dirs_excluded() {
        let rules = rules(|c| {
            c.layouts_dir = Some("_layouts".into());
            c.partials_dir = Some("_includes".into());
            c.posts_dir = Some("_posts".into());
        });
        assert!(rules.is_excluded(Path::new("_layouts/base.html")));
        assert!(rules.is_excluded(Path::new("_includes/nav.html")));
        assert!(rules.is_excluded(Path::new("_posts/2024/a.md")));
        assert!(!rules.is_excluded(Path::new("_layouts_extra/a.md")));
    }

    #[test]
    fn test_glob_patterns() {
        let rules = rules(|c| c.exclude = vec!["drafts".into(), "*.psd".into(), "vendor/**".into()]);
        assert!(rules.is_excluded(Path::new("drafts/a.md")));
        assert!(rules.is_excluded(Path::new("art.psd")));
        assert!(rules.is_excluded(Path::new("img/art.psd")));
        assert!(rules.is_excluded(Path::new("vendor/lib/x.js")));
        assert!(!rules.is_excluded(Path::new("docs/drafts.md")));
    }

    #[test]
    fn test_destination_inside_source_excluded() {
        let mut config = SiteConfig::default();
        config.source = PathBuf::from("/site");
        config.destination = PathBuf::from("/site/build");
        let rules = ExcludeRules::new(&config);
        assert!(rules.is_excluded(Path::new("build/index.html")));
        assert!(!rules.is_excluded(Path::new("index.md")));
    }

    #[test]
    fn test_enumerate() {
        let temp = TempDir::new().unwrap();
        let fs = LocalFs;
        for rel in ["index.md", "robots.txt", ".env", "drafts/x.md", "blog/post.md", "notes.bak"] {
            fs.write_file(&temp.path().join(rel), b"x").unwrap();
        }
        let mut config = SiteConfig::with_root(temp.path());
        config.exclude = vec!["drafts/**".into()];
        let rules = ExcludeRules::new(&config);

        let files = enumerate(&fs, &config.source, &rules).unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("blog/post.md"),
                PathBuf::from("index.md"),
                PathBuf::from("robots.txt"),
            ]
        );
    }

    #[test]
    fn test_enumerate_missing_source() {
        let temp = TempDir::new().unwrap();
        let result = enumerate(&LocalFs, &temp.path().join("nope"), &ExcludeRules::default());
        assert!(result.is_err());
    }
}
