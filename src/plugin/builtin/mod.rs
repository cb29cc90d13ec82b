//! Compiled-in capabilities, registered before discovery.

mod frontmatter;
mod markdown;

use std::sync::Arc;

pub use markdown::MarkdownOptions;

use frontmatter::FrontMatterParser;
use markdown::MarkdownEngine;

use super::PluginKind;
use crate::template::{Engine, Parser};

pub const MARKDOWN: &str = "markdown";
pub const FRONTMATTER: &str = "frontmatter";

pub fn engine(name: &str, markdown: MarkdownOptions) -> Option<Arc<dyn Engine>> {
    match name {
        MARKDOWN => Some(Arc::new(MarkdownEngine::new(markdown))),
        _ => None,
    }
}

pub fn parser(name: &str) -> Option<Arc<dyn Parser>> {
    match name {
        FRONTMATTER => Some(Arc::new(FrontMatterParser)),
        _ => None,
    }
}

pub fn exists(kind: PluginKind, name: &str) -> bool {
    match kind {
        PluginKind::Engine => name == MARKDOWN,
        PluginKind::Parser => name == FRONTMATTER,
    }
}

/// Every built-in as `(kind, name)`.
pub fn all() -> [(PluginKind, &'static str); 2] {
    [
        (PluginKind::Engine, MARKDOWN),
        (PluginKind::Parser, FRONTMATTER),
    ]
}
