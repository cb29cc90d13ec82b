//! Loading a single plugin candidate.
//!
//! A module is a TOML document exporting exactly one capability:
//!
//! ```toml
//! ["engine:liquid"]
//! command = ["./render.sh", "--html"]
//! ```
//!
//! Parsers may also carry `extensions = ["md"]` to limit the files they accept.
//!
//! File form is `<candidate>.toml`; directory form is `<candidate>/plugin.toml`.
//! Anything else at a candidate path is treated as absent.

use std::fs;
use std::path::{Path, PathBuf};

use super::candidate::MODULE_EXTENSION;
use super::{PluginKind, builtin};
use crate::error::PluginError;

/// Manifest file name inside a directory-form module.
pub const MANIFEST_NAME: &str = "plugin.toml";

/// What a module provides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    /// One of the compiled-in implementations, by name.
    Builtin(String),
    /// External program and arguments.
    Command(Vec<String>),
}

/// A successfully loaded module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginModule {
    pub kind: PluginKind,
    pub name: String,
    /// Manifest that was read
    pub path: PathBuf,
    /// Directory the manifest lives in; command plugins run here
    pub dir: PathBuf,
    pub capability: Capability,
    /// Extensions the capability is limited to; empty means all
    pub extensions: Vec<String>,
}

/// Result of trying one candidate path.
#[derive(Debug)]
pub enum LoadAttempt {
    /// Nothing loadable exists at the candidate.
    Absent,
    Loaded(PluginModule),
    /// Something exists but cannot be used. The search continues.
    Broken(PluginError),
}

/// Try to load `kind:name` from a candidate path.
pub fn load(candidate: &Path, kind: PluginKind, name: &str) -> LoadAttempt {
    let Some(manifest) = manifest_path(candidate) else {
        return LoadAttempt::Absent;
    };

    match read_module(&manifest, kind, name) {
        Ok(module) => LoadAttempt::Loaded(module),
        Err(reason) => LoadAttempt::Broken(PluginError::Broken {
            path: manifest,
            reason,
        }),
    }
}

fn manifest_path(candidate: &Path) -> Option<PathBuf> {
    let is_module_file = candidate
        .extension()
        .is_some_and(|ext| ext == MODULE_EXTENSION);

    if is_module_file && candidate.is_file() {
        return Some(candidate.to_path_buf());
    }
    if candidate.is_dir() {
        let manifest = candidate.join(MANIFEST_NAME);
        if manifest.is_file() {
            return Some(manifest);
        }
    }
    None
}

fn read_module(manifest: &Path, kind: PluginKind, name: &str) -> Result<PluginModule, String> {
    let content = fs::read_to_string(manifest).map_err(|e| format!("unreadable: {e}"))?;
    let table: toml::Table = toml::from_str(&content).map_err(|e| format!("invalid TOML: {e}"))?;

    if table.len() != 1 {
        return Err(format!(
            "expected exactly one export, found {}",
            table.len()
        ));
    }
    let Some((key, value)) = table.into_iter().next() else {
        return Err("empty module".into());
    };

    let (found_kind, found_name) = parse_export_key(&key)?;
    if found_kind != kind || found_name != name {
        return Err(format!("exports `{key}`, expected `{kind}:{name}`"));
    }

    let dir = manifest
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let capability = parse_capability(kind, &value, &dir)?;
    let extensions = parse_extensions(&value)?;

    Ok(PluginModule {
        kind,
        name: name.to_owned(),
        path: manifest.to_path_buf(),
        dir,
        capability,
        extensions,
    })
}

/// Split `"<kind>:<name>"`.
fn parse_export_key(key: &str) -> Result<(PluginKind, &str), String> {
    let (kind, name) = key
        .split_once(':')
        .ok_or_else(|| format!("export key `{key}` is not of the form `<kind>:<name>`"))?;
    let kind = PluginKind::parse(kind).ok_or_else(|| format!("unknown plugin kind `{kind}`"))?;
    if name.is_empty() {
        return Err(format!("export key `{key}` has an empty name"));
    }
    Ok((kind, name))
}

fn parse_capability(kind: PluginKind, value: &toml::Value, dir: &Path) -> Result<Capability, String> {
    let table = value
        .as_table()
        .ok_or("export must be a table with `builtin` or `command`")?;

    match (table.get("builtin"), table.get("command")) {
        (Some(_), Some(_)) => Err("`builtin` and `command` are mutually exclusive".into()),
        (Some(builtin), None) => {
            let builtin = builtin.as_str().ok_or("`builtin` must be a string")?;
            if !builtin::exists(kind, builtin) {
                return Err(format!("no built-in {kind} named `{builtin}`"));
            }
            Ok(Capability::Builtin(builtin.to_owned()))
        }
        (None, Some(command)) => {
            let argv = command
                .as_array()
                .ok_or("`command` must be an array of strings")?
                .iter()
                .map(|v| v.as_str().map(str::to_owned))
                .collect::<Option<Vec<_>>>()
                .ok_or("`command` must be an array of strings")?;
            let program = argv.first().ok_or("`command` is empty")?;
            check_program(program, dir)?;
            Ok(Capability::Command(argv))
        }
        (None, None) => Err("export defines neither `builtin` nor `command`".into()),
    }
}

fn parse_extensions(value: &toml::Value) -> Result<Vec<String>, String> {
    let Some(list) = value.get("extensions") else {
        return Ok(Vec::new());
    };
    let mut extensions = list
        .as_array()
        .ok_or("`extensions` must be an array of strings")?
        .iter()
        .map(|v| v.as_str().map(str::to_owned))
        .collect::<Option<Vec<_>>>()
        .ok_or("`extensions` must be an array of strings")?;
    crate::config::normalize_extensions(&mut extensions);
    Ok(extensions)
}

/// Programs with a path separator resolve against the module directory,
/// bare names against `PATH`.
fn check_program(program: &str, dir: &Path) -> Result<(), String> {
    if program.contains('/') || program.contains(std::path::MAIN_SEPARATOR) {
        if dir.join(program).is_file() {
            return Ok(());
        }
        return Err(format!("program `{program}` not found in `{}`", dir.display()));
    }
    which::which(program)
        .map(|_| ())
        .map_err(|_| format!("program `{program}` not found in PATH"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) -> PathBuf {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn reason(attempt: LoadAttempt) -> String {
        match attempt {
            LoadAttempt::Broken(PluginError::Broken { reason, .. }) => reason,
            other => panic!("expected broken, got {other:?}"),
        }
    }

    #[test]
    fn test_absent_when_nothing_exists() {
        let temp = TempDir::new().unwrap();
        let attempt = load(&temp.path().join("nope.toml"), PluginKind::Engine, "x");
        assert!(matches!(attempt, LoadAttempt::Absent));
        let attempt = load(&temp.path().join("nope"), PluginKind::Engine, "x");
        assert!(matches!(attempt, LoadAttempt::Absent));
    }

    #[test]
    fn test_directory_without_manifest_is_absent() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("mod")).unwrap();
        let attempt = load(&temp.path().join("mod"), PluginKind::Engine, "x");
        assert!(matches!(attempt, LoadAttempt::Absent));
    }

    #[test]
    fn test_load_file_form_builtin() {
        let temp = TempDir::new().unwrap();
        let path = write(
            temp.path(),
            "md.toml",
            "[\"engine:md\"]\nbuiltin = \"markdown\"\n",
        );
        match load(&path, PluginKind::Engine, "md") {
            LoadAttempt::Loaded(module) => {
                assert_eq!(module.capability, Capability::Builtin("markdown".into()));
                assert_eq!(module.dir, temp.path());
                assert_eq!(module.path, path);
            }
            other => panic!("expected loaded, got {other:?}"),
        }
    }

    #[test]
    fn test_load_directory_form() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "fm/plugin.toml",
            "[\"parser:fm\"]\nbuiltin = \"frontmatter\"\n",
        );
        match load(&temp.path().join("fm"), PluginKind::Parser, "fm") {
            LoadAttempt::Loaded(module) => assert_eq!(module.dir, temp.path().join("fm")),
            other => panic!("expected loaded, got {other:?}"),
        }
    }

    #[test]
    fn test_extensions_normalized() {
        let temp = TempDir::new().unwrap();
        let path = write(
            temp.path(),
            "fm.toml",
            "[\"parser:fm\"]\nbuiltin = \"frontmatter\"\nextensions = [\".md\", \"txt\"]\n",
        );
        match load(&path, PluginKind::Parser, "fm") {
            LoadAttempt::Loaded(module) => assert_eq!(module.extensions, vec!["md", "txt"]),
            other => panic!("expected loaded, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_is_broken() {
        let temp = TempDir::new().unwrap();
        let path = write(temp.path(), "bad.toml", "[\"engine:x\"\nbuiltin = ");
        assert!(reason(load(&path, PluginKind::Engine, "x")).contains("invalid TOML"));
    }

    #[test]
    fn test_export_count_checked() {
        let temp = TempDir::new().unwrap();
        let path = write(temp.path(), "none.toml", "");
        assert!(reason(load(&path, PluginKind::Engine, "x")).contains("exactly one"));

        let path = write(
            temp.path(),
            "two.toml",
            "[\"engine:x\"]\nbuiltin = \"markdown\"\n[\"engine:y\"]\nbuiltin = \"markdown\"\n",
        );
        assert!(reason(load(&path, PluginKind::Engine, "x")).contains("exactly one"));
    }

    #[test]
    fn test_mismatched_export_is_broken() {
        let temp = TempDir::new().unwrap();
        let path = write(
            temp.path(),
            "x.toml",
            "[\"parser:x\"]\nbuiltin = \"frontmatter\"\n",
        );
        assert!(reason(load(&path, PluginKind::Engine, "x")).contains("expected `engine:x`"));

        let path = write(temp.path(), "y.toml", "[\"y\"]\nbuiltin = \"markdown\"\n");
        assert!(reason(load(&path, PluginKind::Engine, "y")).contains("<kind>:<name>"));
    }

    #[test]
    fn test_unknown_builtin_is_broken() {
        let temp = TempDir::new().unwrap();
        let path = write(temp.path(), "x.toml", "[\"engine:x\"]\nbuiltin = \"liquid\"\n");
        assert!(reason(load(&path, PluginKind::Engine, "x")).contains("no built-in"));
    }

    #[test]
    fn test_missing_program_is_broken() {
        let temp = TempDir::new().unwrap();
        let path = write(
            temp.path(),
            "x.toml",
            "[\"engine:x\"]\ncommand = [\"hay-definitely-not-installed-4821\"]\n",
        );
        assert!(reason(load(&path, PluginKind::Engine, "x")).contains("not found in PATH"));

        let path = write(
            temp.path(),
            "y.toml",
            "[\"engine:y\"]\ncommand = [\"./render.sh\"]\n",
        );
        assert!(reason(load(&path, PluginKind::Engine, "y")).contains("not found in"));
    }

    #[test]
    fn test_relative_program_resolves_against_module_dir() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "render.sh", "#!/bin/sh\ncat\n");
        let path = write(
            temp.path(),
            "y.toml",
            "[\"engine:y\"]\ncommand = [\"./render.sh\", \"--flag\"]\n",
        );
        match load(&path, PluginKind::Engine, "y") {
            LoadAttempt::Loaded(module) => assert_eq!(
                module.capability,
                Capability::Command(vec!["./render.sh".into(), "--flag".into()])
            ),
            other => panic!("expected loaded, got {other:?}"),
        }
    }
}
