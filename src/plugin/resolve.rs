//! Resolution of one capability across the candidate list.

use std::path::{Path, PathBuf};

use super::candidate::candidates;
use super::loader::{LoadAttempt, PluginModule, load};
use super::PluginKind;
use crate::config::PluginsConfig;
use crate::error::PluginError;
use crate::log;

/// Outcome of resolving one `kind:name`.
#[derive(Debug)]
pub enum Resolution {
    Loaded(PluginModule),
    Unresolved,
}

/// Resolution plus every broken candidate seen on the way.
#[derive(Debug)]
pub struct ResolveReport {
    pub resolution: Resolution,
    pub broken: Vec<PluginError>,
}

/// Walks candidate paths for a capability; the first loadable one wins.
#[derive(Debug, Clone)]
pub struct PluginResolver {
    dirs: Vec<String>,
    formats: Vec<String>,
    cwd: PathBuf,
}

impl PluginResolver {
    pub fn new(dirs: Vec<String>, formats: Vec<String>, cwd: &Path) -> Self {
        Self {
            dirs,
            formats,
            cwd: cwd.to_path_buf(),
        }
    }

    pub fn from_config(config: &PluginsConfig, cwd: &Path) -> Self {
        Self::new(config.dirs.clone(), config.formats.clone(), cwd)
    }

    /// Candidate paths for `kind:name`, in search order.
    pub fn candidates(&self, kind: PluginKind, name: &str) -> Vec<PathBuf> {
        candidates(kind, name, &self.dirs, &self.formats, &self.cwd)
    }

    pub fn resolve(&self, kind: PluginKind, name: &str) -> ResolveReport {
        let mut broken = Vec::new();

        for candidate in self.candidates(kind, name) {
            match load(&candidate, kind, name) {
                LoadAttempt::Absent => {}
                LoadAttempt::Loaded(module) => {
                    crate::debug!("plugin"; "{kind} `{name}` loaded from {}", module.path.display());
                    return ResolveReport {
                        resolution: Resolution::Loaded(module),
                        broken,
                    };
                }
                LoadAttempt::Broken(err) => {
                    log!("warning"; "{err}");
                    broken.push(err);
                }
            }
        }

        ResolveReport {
            resolution: Resolution::Unresolved,
            broken,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn resolver(root: &Path) -> PluginResolver {
        PluginResolver::new(
            vec!["{cwd}/first".into(), "{cwd}/second".into()],
            vec!["hay-{name}-{kind}".into()],
            root,
        )
    }

    #[test]
    fn test_unresolved_when_nothing_on_disk() {
        let temp = TempDir::new().unwrap();
        let report = resolver(temp.path()).resolve(PluginKind::Engine, "liquid");
        assert!(matches!(report.resolution, Resolution::Unresolved));
        assert!(report.broken.is_empty());
    }

    #[test]
    fn test_first_loaded_wins() {
        let temp = TempDir::new().unwrap();
        let module = "[\"engine:liquid\"]\nbuiltin = \"markdown\"\n";
        fs::create_dir_all(temp.path().join("first/engine")).unwrap();
        fs::create_dir_all(temp.path().join("second")).unwrap();
        fs::write(temp.path().join("first/engine/hay-liquid-engine.toml"), module).unwrap();
        fs::write(temp.path().join("second/hay-liquid-engine.toml"), module).unwrap();

        let report = resolver(temp.path()).resolve(PluginKind::Engine, "liquid");
        match report.resolution {
            Resolution::Loaded(module) => {
                assert!(module.path.starts_with(temp.path().join("first")))
            }
            Resolution::Unresolved => panic!("expected loaded"),
        }
    }

    #[test]
    fn test_broken_candidate_skipped_and_reported() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("first")).unwrap();
        fs::create_dir_all(temp.path().join("second")).unwrap();
        fs::write(temp.path().join("first/liquid.toml"), "not = [valid").unwrap();
        fs::write(
            temp.path().join("second/liquid.toml"),
            "[\"engine:liquid\"]\nbuiltin = \"markdown\"\n",
        )
        .unwrap();

        let report = resolver(temp.path()).resolve(PluginKind::Engine, "liquid");
        assert!(matches!(report.resolution, Resolution::Loaded(_)));
        assert_eq!(report.broken.len(), 1);
        assert!(matches!(
            &report.broken[0],
            PluginError::Broken { path, .. } if path.ends_with("first/liquid.toml")
        ));
    }
}
