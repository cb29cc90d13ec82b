//! Built-in `markdown` engine (pulldown-cmark to HTML).

use anyhow::Result;
use pulldown_cmark::{Options, Parser, html};
use serde::{Deserialize, Serialize};

use crate::template::{Engine, FileInfo, Renderable};

/// Markdown extensions enabled for rendering, the `[markdown]` section of
/// `hay.toml`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownOptions {
    pub tables: bool,
    pub footnotes: bool,
    pub strikethrough: bool,
    pub task_lists: bool,
    /// `# Heading {#custom-id}`
    pub heading_attributes: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            tables: true,
            footnotes: true,
            strikethrough: true,
            task_lists: true,
            heading_attributes: true,
        }
    }
}

impl MarkdownOptions {
    fn to_pulldown_options(self) -> Options {
        let mut opts = Options::empty();
        if self.tables {
            opts.insert(Options::ENABLE_TABLES);
        }
        if self.footnotes {
            opts.insert(Options::ENABLE_FOOTNOTES);
        }
        if self.strikethrough {
            opts.insert(Options::ENABLE_STRIKETHROUGH);
        }
        if self.task_lists {
            opts.insert(Options::ENABLE_TASKLISTS);
        }
        if self.heading_attributes {
            opts.insert(Options::ENABLE_HEADING_ATTRIBUTES);
        }
        opts
    }
}

#[derive(Debug, Default)]
pub struct MarkdownEngine {
    options: MarkdownOptions,
}

impl MarkdownEngine {
    pub fn new(options: MarkdownOptions) -> Self {
        Self { options }
    }
}

impl Engine for MarkdownEngine {
    fn name(&self) -> &str {
        super::MARKDOWN
    }

    fn compile<'a>(&'a self, _info: &FileInfo) -> Result<Box<dyn Renderable + 'a>> {
        Ok(Box::new(MarkdownTemplate {
            options: self.options.to_pulldown_options(),
        }))
    }
}

struct MarkdownTemplate {
    options: Options,
}

impl Renderable for MarkdownTemplate {
    fn render(&self, info: &FileInfo) -> Result<String> {
        let parser = Parser::new_ext(&info.contents, self.options);
        let mut out = String::with_capacity(info.contents.len() * 3 / 2);
        html::push_html(&mut out, parser);
        Ok(out)
    }
}
