//! Incremental rebuilds on filesystem changes.
//!
//! # Module Structure
//!
//! ```text
//! watch/
//! ├── event        # WatchEvent, WatchState, WatchOutcome
//! ├── watcher      # FsWatcher (notify, initial scan, Ready)
//! └── coordinator  # WatchCoordinator (single loop, per-path queues)
//! ```

mod coordinator;
mod event;
mod watcher;


pub use coordinator::WatchCoordinator;
pub use event::{WatchEvent, WatchOutcome, WatchState};
pub use watcher::FsWatcher;
