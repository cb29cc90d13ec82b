//! Capabilities backed by an external program.
//!
//! The program runs with the module directory as its working directory.
//!
//! | Kind   | stdin        | env                                                   | stdout                      |
//! |--------|--------------|-------------------------------------------------------|-----------------------------|
//! | parser | raw contents | `HAY_FILE`                                            | `{"contents", "options"}`   |
//! | engine | parsed body  | `HAY_FILE` `HAY_SHORT_NAME` `HAY_OUTPUT_DIR` `HAY_OPTIONS` | rendered output        |

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::template::{Engine, FileInfo, Options, Parsed, Parser, Renderable};
use crate::utils::exec::Cmd;
use crate::utils::path::to_slash;

pub const ENV_FILE: &str = "HAY_FILE";
pub const ENV_SHORT_NAME: &str = "HAY_SHORT_NAME";
pub const ENV_OUTPUT_DIR: &str = "HAY_OUTPUT_DIR";
pub const ENV_OPTIONS: &str = "HAY_OPTIONS";

#[derive(Debug, Clone)]
struct Program {
    argv: Vec<String>,
    dir: PathBuf,
}

impl Program {
    fn cmd(&self) -> Cmd {
        Cmd::from_slice(&self.argv).cwd(&self.dir)
    }
}

#[derive(Debug, Clone)]
pub struct CommandParser {
    name: String,
    program: Program,
}

impl CommandParser {
    pub fn new(name: impl Into<String>, argv: Vec<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            program: Program {
                argv,
                dir: dir.into(),
            },
        }
    }
}

#[derive(Deserialize)]
struct ParserOutput {
    contents: String,
    #[serde(default)]
    options: Options,
}

impl Parser for CommandParser {
    fn name(&self) -> &str {
        &self.name
    }

    fn parse(&self, raw: &str, file_name: &str) -> Result<Parsed> {
        let output = self
            .program
            .cmd()
            .envs([(ENV_FILE, file_name)])
            .stdin(raw)
            .run()?;
        let parsed: ParserOutput = serde_json::from_slice(&output.stdout)
            .with_context(|| format!("parser `{}` printed invalid JSON", self.name))?;
        Ok(Parsed {
            contents: parsed.contents,
            options: parsed.options,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CommandEngine {
    name: String,
    program: Program,
}

impl CommandEngine {
    pub fn new(name: impl Into<String>, argv: Vec<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            program: Program {
                argv,
                dir: dir.into(),
            },
        }
    }
}

impl Engine for CommandEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn compile<'a>(&'a self, _info: &FileInfo) -> Result<Box<dyn Renderable + 'a>> {
        Ok(Box::new(CommandTemplate { engine: self }))
    }
}

struct CommandTemplate<'a> {
    engine: &'a CommandEngine,
}

impl Renderable for CommandTemplate<'_> {
    fn render(&self, info: &FileInfo) -> Result<String> {
        let options = serde_json::to_string(&info.options)?;
        let output = self
            .engine
            .program
            .cmd()
            .envs([
                (ENV_FILE, info.source.to_string_lossy().into_owned()),
                (ENV_SHORT_NAME, info.short_name.clone()),
                (ENV_OUTPUT_DIR, to_slash(&info.output.directory)),
                (ENV_OPTIONS, options),
            ])
            .stdin(&info.contents)
            .run()?;
        String::from_utf8(output.stdout)
            .with_context(|| format!("engine `{}` printed non-UTF-8 output", self.engine.name))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::classify::OutputLocation;
    use serde_json::json;
    use tempfile::TempDir;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".into(), "-c".into(), script.into()]
    }

    fn info(contents: &str) -> FileInfo {
        let mut options = Options::new();
        options.insert("title".into(), json!("Hi"));
        FileInfo {
            source: PathBuf::from("/site/blog/post.md"),
            relative: PathBuf::from("blog/post.md"),
            output: OutputLocation {
                directory: PathBuf::from("blog"),
                file_name: "post.html".into(),
            },
            short_name: "post".into(),
            extension: Some("md".into()),
            contents: contents.into(),
            options,
        }
    }

    #[test]
    fn test_parser_reads_json() {
        let temp = TempDir::new().unwrap();
        let parser = CommandParser::new(
            "json",
            sh(r#"cat >/dev/null; printf '{"contents":"%s","options":{"permalink":"x"}}' "$HAY_FILE""#),
            temp.path(),
        );
        let parsed = parser.parse("ignored", "a.md").unwrap();
        assert_eq!(parsed.contents, "a.md");
        assert_eq!(parsed.options.get("permalink"), Some(&json!("x")));
    }

    #[test]
    fn test_parser_options_optional() {
        let temp = TempDir::new().unwrap();
        let parser = CommandParser::new("json", sh(r#"printf '{"contents":"body"}'"#), temp.path());
        let parsed = parser.parse("", "a.md").unwrap();
        assert!(parsed.options.is_empty());
    }

    #[test]
    fn test_parser_invalid_json_is_error() {
        let temp = TempDir::new().unwrap();
        let parser = CommandParser::new("bad", sh("echo nope"), temp.path());
        assert!(parser.parse("", "a.md").is_err());
    }

    #[test]
    fn test_engine_env_and_stdin() {
        let temp = TempDir::new().unwrap();
        let engine = CommandEngine::new(
            "echo",
            sh(r#"printf '%s|%s|%s|' "$HAY_SHORT_NAME" "$HAY_OUTPUT_DIR" "$HAY_OPTIONS"; cat"#),
            temp.path(),
        );
        let info = info("BODY");
        let html = engine.compile(&info).unwrap().render(&info).unwrap();
        assert_eq!(html, r#"post|blog|{"title":"Hi"}|BODY"#);
    }

    #[test]
    fn test_engine_runs_in_module_dir() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("layout.txt"), "LAYOUT").unwrap();
        let engine = CommandEngine::new("cat", sh("cat layout.txt"), temp.path());
        let info = info("");
        assert_eq!(engine.compile(&info).unwrap().render(&info).unwrap(), "LAYOUT");
    }

    #[test]
    fn test_engine_failure_carries_stderr() {
        let temp = TempDir::new().unwrap();
        let engine = CommandEngine::new("fail", sh("echo boom >&2; exit 3"), temp.path());
        let info = info("");
        let err = engine.compile(&info).unwrap().render(&info).unwrap_err();
        assert!(format!("{err:#}").contains("boom"));
    }
}
