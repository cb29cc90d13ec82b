//! Candidate path generation for plugin modules.
//!
//! Pure and deterministic: no filesystem access, the working directory is
//! passed in. For each search directory `D` (after expansion) and each
//! substituted format `T`:
//!
//! ```text
//! D/T...   D/name   D/kind/T...   D/T.../kind
//! ```
//!
//! and every candidate `c` becomes `c.toml` (file form) followed by `c`
//! (directory form).

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{NoExpand, Regex};

use super::PluginKind;

/// File extension of a file-form module.
pub const MODULE_EXTENSION: &str = "toml";

static CWD_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\{cwd\}").unwrap());
static KIND_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\{(?:kind|prefix)\}").unwrap());
static NAME_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\{name\}").unwrap());

/// Expand `{cwd}` and a leading `~` in a search directory template.
pub fn expand_dir(template: &str, cwd: &Path) -> PathBuf {
    let cwd = cwd.to_string_lossy();
    let replaced = CWD_TOKEN.replace_all(template, NoExpand(&cwd));
    PathBuf::from(shellexpand::tilde(&replaced).into_owned())
}

/// Substitute `{kind}` / `{prefix}` and `{name}` in a format template.
pub fn format_name(template: &str, kind: PluginKind, name: &str) -> String {
    let with_kind = KIND_TOKEN.replace_all(template, NoExpand(kind.as_str()));
    NAME_TOKEN
        .replace_all(&with_kind, NoExpand(name))
        .into_owned()
}

/// Ordered list of module paths to try for `kind:name`.
pub fn candidates(
    kind: PluginKind,
    name: &str,
    dirs: &[String],
    formats: &[String],
    cwd: &Path,
) -> Vec<PathBuf> {
    let names: Vec<String> = formats
        .iter()
        .map(|f| format_name(f, kind, name))
        .collect();

    let mut out = Vec::with_capacity(dirs.len() * (names.len() * 3 + 1) * 2);
    for dir in dirs.iter().map(|d| expand_dir(d, cwd)) {
        let bases = names
            .iter()
            .map(|t| dir.join(t))
            .chain(std::iter::once(dir.join(name)))
            .chain(names.iter().map(|t| dir.join(kind.as_str()).join(t)))
            .chain(names.iter().map(|t| dir.join(t).join(kind.as_str())));

        for base in bases {
            out.push(with_module_extension(&base));
            out.push(base);
        }
    }
    out
}

fn with_module_extension(base: &Path) -> PathBuf {
    let mut file = base.as_os_str().to_owned();
    file.push(".");
    file.push(MODULE_EXTENSION);
    PathBuf::from(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_format_substitution_is_case_insensitive() {
        assert_eq!(
            format_name("hay-{name}-{kind}", PluginKind::Engine, "liquid"),
            "hay-liquid-engine"
        );
        assert_eq!(
            format_name("{PREFIX}_{Name}", PluginKind::Parser, "yaml"),
            "parser_yaml"
        );
        assert_eq!(format_name("static", PluginKind::Parser, "yaml"), "static");
    }

    #[test]
    fn test_substitution_does_not_expand_dollar() {
        assert_eq!(format_name("{name}", PluginKind::Engine, "$1x"), "$1x");
    }

    #[test]
    fn test_expand_cwd() {
        let dir = expand_dir("{CWD}/plugins", Path::new("/work"));
        assert_eq!(dir, PathBuf::from("/work/plugins"));
        assert_eq!(expand_dir("/abs", Path::new("/work")), PathBuf::from("/abs"));
    }

    #[test]
    fn test_expand_tilde() {
        let dir = expand_dir("~/plugins", Path::new("/work"));
        assert!(!dir.to_string_lossy().starts_with('~'));
        assert!(dir.ends_with("plugins"));
    }

    #[test]
    fn test_candidate_order() {
        let got = candidates(
            PluginKind::Engine,
            "liquid",
            &strings(&["/a"]),
            &strings(&["hay-{name}-{kind}"]),
            Path::new("/cwd"),
        );
        let want: Vec<PathBuf> = [
            "/a/hay-liquid-engine.toml",
            "/a/hay-liquid-engine",
            "/a/liquid.toml",
            "/a/liquid",
            "/a/engine/hay-liquid-engine.toml",
            "/a/engine/hay-liquid-engine",
            "/a/hay-liquid-engine/engine.toml",
            "/a/hay-liquid-engine/engine",
        ]
        .iter()
        .map(PathBuf::from)
        .collect();
        assert_eq!(got, want);
    }

    #[test]
    fn test_directories_visited_in_order() {
        let got = candidates(
            PluginKind::Parser,
            "yaml",
            &strings(&["{cwd}/first", "/second"]),
            &strings(&["{name}", "x-{name}"]),
            Path::new("/cwd"),
        );
        // 2 formats: 2 + 1 + 2 + 2 bases per directory, 2 forms each
        assert_eq!(got.len(), 2 * 7 * 2);
        assert_eq!(got[0], PathBuf::from("/cwd/first/yaml.toml"));
        assert_eq!(got[2], PathBuf::from("/cwd/first/x-yaml.toml"));
        assert_eq!(got[14], PathBuf::from("/second/yaml.toml"));
        assert!(got[..14].iter().all(|p| p.starts_with("/cwd/first")));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let args = (strings(&["/a", "/b"]), strings(&["hay-{name}-{kind}"]));
        let first = candidates(PluginKind::Engine, "x", &args.0, &args.1, Path::new("/"));
        let second = candidates(PluginKind::Engine, "x", &args.0, &args.1, Path::new("/"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_no_dirs_no_candidates() {
        assert!(candidates(PluginKind::Engine, "x", &[], &strings(&["{name}"]), Path::new("/")).is_empty());
    }
}
