//! `hay build`: one full pass over the source tree.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::build::{BuildPipeline, BuildReport};
use crate::config::SiteConfig;
use crate::fs::{FileSystem, LocalFs};
use crate::log;
use crate::plugin::Plugins;
use crate::registry::Registry;

/// Discover the configured plugins, resolving module paths against the cwd.
pub fn load_plugins(config: &SiteConfig) -> Result<Plugins> {
    let cwd = std::env::current_dir().context("Failed to get current working directory")?;
    let plugins = Plugins::discover(config, &cwd);

    for descriptor in plugins.descriptors() {
        crate::debug!(
            "plugin";
            "{} `{}` {}",
            descriptor.kind,
            descriptor.name,
            if descriptor.resolved { "ready" } else { "not found" }
        );
    }
    if !plugins.broken().is_empty() {
        log!("warning"; "{} broken plugin candidate(s) skipped", plugins.broken().len());
    }

    Ok(plugins)
}

/// Pipeline over the local filesystem with a fresh registry.
pub fn create_pipeline(config: Arc<SiteConfig>, plugins: &Plugins) -> Result<BuildPipeline> {
    let fs: Arc<dyn FileSystem> = Arc::new(LocalFs);
    let pipeline = BuildPipeline::new(config, plugins, Arc::new(Registry::new()), fs)?;
    Ok(pipeline)
}

/// Build the site; any per-file failure makes this an error.
pub fn build_site(config: Arc<SiteConfig>, plugins: &Plugins) -> Result<BuildReport> {
    let pipeline = create_pipeline(config, plugins)?;
    let report = pipeline.run()?.into_result()?;
    Ok(report)
}
