//! Pluggable engines and parsers.
//!
//! # Module Structure
//!
//! ```text
//! plugin/
//! ├── candidate  # pure candidate path generation
//! ├── loader     # one candidate -> Absent | Loaded | Broken
//! ├── resolve    # first loadable candidate wins
//! ├── command    # capabilities backed by an external program
//! ├── builtin/   # markdown engine, frontmatter parser
//! └── mod.rs     # Plugins table (this file)
//! ```
//!
//! Built-ins are registered first; a module discovered on disk for the same
//! `kind:name` replaces the built-in. Lookups of anything not registered fail
//! with [`PluginError::Missing`].

pub mod builtin;
mod candidate;
mod command;
mod loader;
mod resolve;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use builtin::MarkdownOptions;

use command::{CommandEngine, CommandParser};
use loader::{Capability, PluginModule};
use resolve::{PluginResolver, Resolution};

use crate::config::SiteConfig;
use crate::error::PluginError;
use crate::log;
use crate::template::{Engine, Parsed, Parser};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginKind {
    Engine,
    Parser,
}

impl PluginKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Engine => "engine",
            Self::Parser => "parser",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "engine" => Some(Self::Engine),
            "parser" => Some(Self::Parser),
            _ => None,
        }
    }
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A capability the configuration requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDescriptor {
    pub kind: PluginKind,
    pub name: String,
    pub resolved: bool,
}

impl PluginDescriptor {
    pub fn new(kind: PluginKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            resolved: false,
        }
    }
}

/// Registered engines and parsers, plus the discovery record.
#[derive(Default)]
pub struct Plugins {
    engines: FxHashMap<String, Arc<dyn Engine>>,
    parsers: FxHashMap<String, Arc<dyn Parser>>,
    descriptors: Vec<PluginDescriptor>,
    broken: Vec<PluginError>,
    /// Options for every markdown engine instance, built-in or aliased
    markdown: MarkdownOptions,
}

impl Plugins {
    /// Table holding only the built-in capabilities, with default options.
    pub fn with_builtins() -> Self {
        Self::builtins(MarkdownOptions::default())
    }

    fn builtins(markdown: MarkdownOptions) -> Self {
        let mut plugins = Self {
            markdown,
            ..Self::default()
        };
        for (kind, name) in builtin::all() {
            match kind {
                PluginKind::Engine => {
                    if let Some(engine) = builtin::engine(name, markdown) {
                        plugins.register_engine(name, engine);
                    }
                }
                PluginKind::Parser => {
                    if let Some(parser) = builtin::parser(name) {
                        plugins.register_parser(name, parser);
                    }
                }
            }
        }
        plugins
    }

    /// Built-ins plus everything the configuration names, resolved on disk.
    ///
    /// Unresolved descriptors are recorded, not reported: lookups fail later
    /// with `Missing` unless a built-in covers them.
    pub fn discover(config: &SiteConfig, cwd: &Path) -> Self {
        let mut plugins = Self::builtins(config.markdown);
        let resolver = PluginResolver::from_config(&config.plugins, cwd);

        let required = std::iter::once(PluginDescriptor::new(
            PluginKind::Engine,
            &config.plugins.engine,
        ))
        .chain(
            config
                .plugins
                .parsers
                .iter()
                .map(|name| PluginDescriptor::new(PluginKind::Parser, name)),
        );

        for mut descriptor in required {
            let report = resolver.resolve(descriptor.kind, &descriptor.name);
            plugins.broken.extend(report.broken);

            if let Resolution::Loaded(module) = report.resolution {
                plugins.install(&module);
            }
            descriptor.resolved = plugins.contains(descriptor.kind, &descriptor.name);
            plugins.descriptors.push(descriptor);
        }

        plugins
    }

    pub fn register_engine(&mut self, name: impl Into<String>, engine: Arc<dyn Engine>) {
        self.engines.insert(name.into(), engine);
    }

    pub fn register_parser(&mut self, name: impl Into<String>, parser: Arc<dyn Parser>) {
        self.parsers.insert(name.into(), parser);
    }

    fn install(&mut self, module: &PluginModule) {
        let name = module.name.clone();
        match (module.kind, &module.capability) {
            (PluginKind::Engine, Capability::Builtin(builtin)) => {
                if let Some(engine) = builtin::engine(builtin, self.markdown) {
                    self.register_engine(name, engine);
                }
            }
            (PluginKind::Engine, Capability::Command(argv)) => {
                let engine = CommandEngine::new(&name, argv.clone(), &module.dir);
                self.register_engine(name, Arc::new(engine));
            }
            (PluginKind::Parser, Capability::Builtin(builtin)) => {
                if let Some(parser) = builtin::parser(builtin) {
                    self.register_parser(name, restrict(parser, &module.extensions));
                }
            }
            (PluginKind::Parser, Capability::Command(argv)) => {
                let parser = Arc::new(CommandParser::new(&name, argv.clone(), &module.dir));
                self.register_parser(name, restrict(parser, &module.extensions));
            }
        }
        log!("plugin"; "{} `{}` from {}", module.kind, module.name, module.path.display());
    }

    pub fn contains(&self, kind: PluginKind, name: &str) -> bool {
        match kind {
            PluginKind::Engine => self.engines.contains_key(name),
            PluginKind::Parser => self.parsers.contains_key(name),
        }
    }

    pub fn engine(&self, name: &str) -> Result<Arc<dyn Engine>, PluginError> {
        self.engines
            .get(name)
            .cloned()
            .ok_or_else(|| PluginError::Missing {
                kind: PluginKind::Engine,
                name: name.to_owned(),
            })
    }

    pub fn parser(&self, name: &str) -> Result<Arc<dyn Parser>, PluginError> {
        self.parsers
            .get(name)
            .cloned()
            .ok_or_else(|| PluginError::Missing {
                kind: PluginKind::Parser,
                name: name.to_owned(),
            })
    }

    /// Parsers in the given order; fails on the first missing name.
    pub fn parsers(&self, names: &[String]) -> Result<Vec<Arc<dyn Parser>>, PluginError> {
        names.iter().map(|name| self.parser(name)).collect()
    }

    pub fn descriptors(&self) -> &[PluginDescriptor] {
        &self.descriptors
    }

    /// Broken candidates seen during discovery.
    pub fn broken(&self) -> &[PluginError] {
        &self.broken
    }
}

fn restrict(parser: Arc<dyn Parser>, extensions: &[String]) -> Arc<dyn Parser> {
    if extensions.is_empty() {
        return parser;
    }
    Arc::new(Restricted {
        inner: parser,
        extensions: extensions.to_vec(),
    })
}

/// Parser limited to a set of extensions.
struct Restricted {
    inner: Arc<dyn Parser>,
    extensions: Vec<String>,
}

impl Parser for Restricted {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn accepts(&self, extension: Option<&str>) -> bool {
        extension.is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }

    fn parse(&self, raw: &str, file_name: &str) -> anyhow::Result<Parsed> {
        self.inner.parse(raw, file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn config(root: &Path) -> SiteConfig {
        let mut config = SiteConfig::with_root(root);
        config.plugins.dirs = vec!["{cwd}/plugins".into()];
        config
    }

    #[test]
    fn test_kind_roundtrip() {
        for kind in [PluginKind::Engine, PluginKind::Parser] {
            assert_eq!(PluginKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(PluginKind::parse("Engine"), None);
    }

    #[test]
    fn test_builtins_registered() {
        let plugins = Plugins::with_builtins();
        assert!(plugins.engine("markdown").is_ok());
        assert!(plugins.parser("frontmatter").is_ok());
    }

    #[test]
    fn test_missing_plugin() {
        let plugins = Plugins::with_builtins();
        match plugins.engine("liquid") {
            Err(PluginError::Missing { kind, name }) => {
                assert_eq!(kind, PluginKind::Engine);
                assert_eq!(name, "liquid");
            }
            _ => panic!("expected missing"),
        }
        assert!(plugins
            .parsers(&["frontmatter".into(), "yaml".into()])
            .is_err());
    }

    #[test]
    fn test_discover_marks_descriptors() {
        let temp = TempDir::new().unwrap();
        let mut config = config(temp.path());
        config.plugins.engine = "liquid".into();

        let plugins = Plugins::discover(&config, temp.path());
        let descriptors = plugins.descriptors();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0], PluginDescriptor {
            kind: PluginKind::Engine,
            name: "liquid".into(),
            resolved: false,
        });
        assert!(descriptors[1].resolved);
    }

    #[test]
    fn test_discovered_module_registers_alias() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("plugins")).unwrap();
        fs::write(
            temp.path().join("plugins/hay-md-engine.toml"),
            "[\"engine:md\"]\nbuiltin = \"markdown\"\n",
        )
        .unwrap();
        let mut config = config(temp.path());
        config.plugins.engine = "md".into();

        let plugins = Plugins::discover(&config, temp.path());
        assert!(plugins.descriptors()[0].resolved);
        assert_eq!(plugins.engine("md").unwrap().name(), "markdown");
        assert!(plugins.broken().is_empty());
    }

    #[test]
    fn test_restricted_parser_accepts() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("plugins/fm")).unwrap();
        fs::write(
            temp.path().join("plugins/fm/plugin.toml"),
            "[\"parser:fm\"]\nbuiltin = \"frontmatter\"\nextensions = [\"md\"]\n",
        )
        .unwrap();
        let mut config = config(temp.path());
        config.plugins.parsers = vec!["fm".into()];

        let plugins = Plugins::discover(&config, temp.path());
        let parser = plugins.parser("fm").unwrap();
        assert!(parser.accepts(Some("md")));
        assert!(!parser.accepts(Some("txt")));
        assert!(!parser.accepts(None));
    }

    #[test]
    fn test_markdown_options_follow_config() {
        use crate::classify::OutputLocation;
        use crate::template::{FileInfo, Options};

        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("plugins")).unwrap();
        fs::write(
            temp.path().join("plugins/hay-md-engine.toml"),
            "[\"engine:md\"]\nbuiltin = \"markdown\"\n",
        )
        .unwrap();
        let mut config = config(temp.path());
        config.markdown.tables = false;
        let plugins = Plugins::discover(&config, temp.path());

        let info = FileInfo {
            source: temp.path().join("a.md"),
            relative: "a.md".into(),
            output: OutputLocation::default(),
            short_name: "a".into(),
            extension: Some("md".into()),
            contents: "| a |\n|---|\n| 1 |\n".into(),
            options: Options::new(),
        };
        for name in ["markdown", "md"] {
            let engine = plugins.engine(name).unwrap();
            let html = engine.compile(&info).unwrap().render(&info).unwrap();
            assert!(!html.contains("<table>"), "{name} rendered a table");
        }
    }
}
