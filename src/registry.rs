//! Source → destination registry.
//!
//! One instance per process, shared as `Arc<Registry>` between the build and
//! the watch loop. Entries are written only after a file was processed
//! successfully; last write wins.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::log;
use crate::utils::plural_s;

/// A destination claimed by more than one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub destination: PathBuf,
    /// Sorted
    pub sources: Vec<PathBuf>,
}

#[derive(Debug, Default)]
pub struct Registry {
    entries: RwLock<FxHashMap<PathBuf, PathBuf>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `source → destination`, returning the previous destination.
    pub fn put(&self, source: PathBuf, destination: PathBuf) -> Option<PathBuf> {
        self.entries.write().insert(source, destination)
    }

    pub fn get(&self, source: &Path) -> Option<PathBuf> {
        self.entries.read().get(source).cloned()
    }

    pub fn remove(&self, source: &Path) -> Option<PathBuf> {
        self.entries.write().remove(source)
    }

    /// Sources strictly below `dir`, sorted.
    pub fn sources_under(&self, dir: &Path) -> Vec<PathBuf> {
        let mut sources: Vec<_> = self
            .entries
            .read()
            .keys()
            .filter(|source| source.as_path() != dir && source.starts_with(dir))
            .cloned()
            .collect();
        sources.sort();
        sources
    }

    pub fn contains(&self, source: &Path) -> bool {
        self.entries.read().contains_key(source)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Sorted copy of all entries.
    pub fn snapshot(&self) -> Vec<(PathBuf, PathBuf)> {
        let mut entries: Vec<_> = self
            .entries
            .read()
            .iter()
            .map(|(s, d)| (s.clone(), d.clone()))
            .collect();
        entries.sort();
        entries
    }

    /// Destinations with more than one source, sorted by destination.
    pub fn conflicts(&self) -> Vec<Conflict> {
        let mut by_destination: FxHashMap<PathBuf, Vec<PathBuf>> = FxHashMap::default();
        for (source, destination) in self.entries.read().iter() {
            by_destination
                .entry(destination.clone())
                .or_default()
                .push(source.clone());
        }

        let mut conflicts: Vec<_> = by_destination
            .into_iter()
            .filter(|(_, sources)| sources.len() > 1)
            .map(|(destination, mut sources)| {
                sources.sort();
                Conflict {
                    destination,
                    sources,
                }
            })
            .collect();
        conflicts.sort_by(|a, b| a.destination.cmp(&b.destination));
        conflicts
    }
}

/// Print conflicts as warnings, with paths relative to `root` where possible.
///
/// ```text
/// [warning] 1 output claimed by multiple sources
/// [warning] contact/index.html <- about.md, contact.md
/// ```
pub fn print_conflicts(conflicts: &[Conflict], source_root: &Path, destination_root: &Path) {
    if conflicts.is_empty() {
        return;
    }

    log!("warning"; "{} output{} claimed by multiple sources, last write wins",
        conflicts.len(), plural_s(conflicts.len()));

    for conflict in conflicts {
        let sources = conflict
            .sources
            .iter()
            .map(|s| relativize(s, source_root).display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        log!("warning"; "{} <- {}", relativize(&conflict.destination, destination_root).display(), sources);
    }
}

fn relativize<'a>(path: &'a Path, root: &Path) -> &'a Path {
    path.strip_prefix(root).unwrap_or(path)
}
