//! `hay watch` and `hay build --watch`.
//!
//! ```text
//! FsWatcher (started first) ──events──► WatchCoordinator ◄── Ctrl+C (crossbeam)
//!                                             │
//! optional full build (blocking pool) ───────┘ shares Processor + Registry
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use crate::build::{BuildPipeline, error_chain};
use crate::config::SiteConfig;
use crate::core::register_shutdown;
use crate::fs::LocalFs;
use crate::log;
use crate::plugin::Plugins;
use crate::watch::{FsWatcher, WatchCoordinator};

use super::build::create_pipeline;

/// Watch the source tree until Ctrl+C. With `initial_build`, a full build
/// runs alongside the watch loop.
pub fn watch_site(config: Arc<SiteConfig>, plugins: &Plugins, initial_build: bool) -> Result<()> {
    let pipeline = create_pipeline(config, plugins)?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    rt.block_on(run(pipeline, initial_build))
}

async fn run(pipeline: BuildPipeline, initial_build: bool) -> Result<()> {
    let processor = pipeline.processor();
    let source = processor.config().source.clone();

    let (shutdown_tx, shutdown_rx) = crossbeam::channel::bounded(1);
    register_shutdown(shutdown_tx);

    let (tx, rx) = mpsc::unbounded_channel();
    let watcher = FsWatcher::start(&source, pipeline.rules().clone(), Arc::new(LocalFs), tx)
        .with_context(|| format!("failed to watch {}", source.display()))?;

    if initial_build {
        tokio::spawn(async move {
            match tokio::task::spawn_blocking(move || pipeline.run()).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => log!("error"; "{}", error_chain(&e)),
                Err(e) => log!("error"; "build task failed: {}", e),
            }
        });
    }

    let state = WatchCoordinator::new(processor)
        .run(rx, Some(shutdown_rx))
        .await;
    drop(watcher);

    crate::debug!("watch"; "stopped ({:?})", state);
    Ok(())
}
