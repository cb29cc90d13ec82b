//! notify-backed watch primitive.
//!
//! Watcher-first: the OS watch is attached before the initial scan, so
//! changes made during the scan are buffered and delivered after `Ready`.
//!
//! ```text
//! notify callback → std mpsc → bridge thread → tokio mpsc → coordinator
//!                                   ↑
//!                    initial scan: Added… then Ready
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::UnboundedSender;

use super::WatchEvent;
use crate::fs::{ExcludeRules, FileSystem, enumerate};
use crate::log;

/// Live watch on a source tree. Dropping it releases the OS watch and ends
/// the event stream.
pub struct FsWatcher {
    _watcher: RecommendedWatcher,
}

impl FsWatcher {
    pub fn start(
        source: &Path,
        rules: ExcludeRules,
        fs: Arc<dyn FileSystem>,
        tx: UnboundedSender<WatchEvent>,
    ) -> notify::Result<Self> {
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();

        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;
        watcher.watch(source, RecursiveMode::Recursive)?;

        // Events are now buffering in notify_rx while the scan runs
        let source = source.to_path_buf();
        std::thread::Builder::new()
            .name("hay-watch".into())
            .spawn(move || {
                let translator = Translator {
                    source,
                    rules,
                    fs,
                };
                if translator.initial_scan(&tx).is_err() {
                    return;
                }
                while let Ok(result) = notify_rx.recv() {
                    match result {
                        Ok(event) => {
                            for event in translator.translate(&event) {
                                if tx.send(event).is_err() {
                                    return; // Receiver dropped
                                }
                            }
                        }
                        Err(e) => log!("watch"; "notify error: {}", e),
                    }
                }
            })
            .map_err(notify::Error::io)?;

        Ok(Self { _watcher: watcher })
    }
}

/// Maps raw notify events onto source-relative [`WatchEvent`]s.
struct Translator {
    source: PathBuf,
    rules: ExcludeRules,
    fs: Arc<dyn FileSystem>,
}

impl Translator {
    /// `Added` for every existing file, then `Ready`. Err means the receiver is gone.
    fn initial_scan(&self, tx: &UnboundedSender<WatchEvent>) -> Result<(), ()> {
        match enumerate(self.fs.as_ref(), &self.source, &self.rules) {
            Ok(files) => {
                for rel in files {
                    tx.send(WatchEvent::Added(rel)).map_err(|_| ())?;
                }
            }
            Err(e) => log!("error"; "initial scan of {} failed: {}", self.source.display(), e),
        }
        tx.send(WatchEvent::Ready).map_err(|_| ())
    }

    fn translate(&self, event: &notify::Event) -> Vec<WatchEvent> {
        let mut out = Vec::new();
        match event.kind {
            EventKind::Create(_) => {
                for path in &event.paths {
                    self.added(path, &mut out);
                }
            }
            EventKind::Modify(ModifyKind::Metadata(_)) => {}
            EventKind::Modify(ModifyKind::Name(mode)) => match (mode, event.paths.as_slice()) {
                (RenameMode::Both, [from, to]) => {
                    self.removed(from, &mut out);
                    self.added(to, &mut out);
                }
                (RenameMode::From, paths) => {
                    for path in paths {
                        self.removed(path, &mut out);
                    }
                }
                (RenameMode::To, paths) => {
                    for path in paths {
                        self.added(path, &mut out);
                    }
                }
                (_, paths) => {
                    for path in paths {
                        if path.exists() {
                            self.added(path, &mut out);
                        } else {
                            self.removed(path, &mut out);
                        }
                    }
                }
            },
            EventKind::Modify(_) => {
                for path in event.paths.iter().filter(|p| p.is_file()) {
                    if let Some(rel) = self.relative(path) {
                        out.push(WatchEvent::Changed(rel));
                    }
                }
            }
            EventKind::Remove(_) => {
                for path in &event.paths {
                    self.removed(path, &mut out);
                }
            }
            EventKind::Access(_) | EventKind::Any | EventKind::Other => {}
        }
        out
    }

    /// A new directory reports only itself; its files are expanded here.
    fn added(&self, path: &Path, out: &mut Vec<WatchEvent>) {
        if path.is_dir() {
            let Some(rel_dir) = self.relative(path) else {
                return;
            };
            if let Ok(files) = self.fs.read_dir(path) {
                out.extend(
                    files
                        .into_iter()
                        .map(|f| rel_dir.join(f))
                        .filter(|rel| self.accepts(rel))
                        .map(WatchEvent::Added),
                );
            }
        } else if path.is_file()
            && let Some(rel) = self.relative(path)
        {
            out.push(WatchEvent::Added(rel));
        }
    }

    fn removed(&self, path: &Path, out: &mut Vec<WatchEvent>) {
        if let Some(rel) = self.relative(path) {
            out.push(WatchEvent::Removed(rel));
        }
    }

    /// Source-relative form, or `None` for paths outside source or filtered out.
    fn relative(&self, path: &Path) -> Option<PathBuf> {
        let rel = path.strip_prefix(&self.source).ok()?;
        if rel.as_os_str().is_empty() {
            return None;
        }
        self.accepts(rel).then(|| rel.to_path_buf())
    }

    fn accepts(&self, rel: &Path) -> bool {
        !self.rules.is_excluded(rel)
    }
}
