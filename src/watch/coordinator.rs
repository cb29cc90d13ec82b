//! Single loop turning watch events into incremental rebuilds.
//!
//! Events for one path are applied in arrival order by that path's worker;
//! workers for different paths run concurrently. File work runs on the
//! blocking pool. A worker that has applied everything sent to it is
//! retired; the next event for its path starts a fresh one.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::Receiver;
use rustc_hash::FxHashMap;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use super::{WatchEvent, WatchOutcome, WatchState};
use crate::build::{Processed, Processor, error_chain};
use crate::log;
use crate::logger::{status_error, status_success};
use crate::utils::path::to_slash;

/// How often the shutdown receiver is polled.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// Upper bound on waiting for queued work when closing.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Live worker for one path.
struct Queue {
    id: u64,
    tx: UnboundedSender<WatchEvent>,
    /// Events handed to this worker so far
    sent: u64,
    handle: JoinHandle<()>,
}

/// Sent by a worker after each applied event.
#[derive(Debug)]
struct Idle {
    path: PathBuf,
    worker: u64,
    applied: u64,
}

pub struct WatchCoordinator {
    processor: Arc<Processor>,
    state: WatchState,
    queues: FxHashMap<PathBuf, Queue>,
    next_worker: u64,
    idle_tx: UnboundedSender<Idle>,
    idle_rx: UnboundedReceiver<Idle>,
    reporter: Option<UnboundedSender<WatchOutcome>>,
}

impl WatchCoordinator {
    pub fn new(processor: Arc<Processor>) -> Self {
        let (idle_tx, idle_rx) = mpsc::unbounded_channel();
        Self {
            processor,
            state: WatchState::Initializing,
            queues: FxHashMap::default(),
            next_worker: 0,
            idle_tx,
            idle_rx,
            reporter: None,
        }
    }

    /// Also send every outcome to `tx`.
    pub fn with_reporter(mut self, tx: UnboundedSender<WatchOutcome>) -> Self {
        self.reporter = Some(tx);
        self
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Run until the event stream ends or `shutdown` fires. Returns the
    /// final state, always `Closed`.
    pub async fn run(
        mut self,
        mut events: UnboundedReceiver<WatchEvent>,
        shutdown: Option<Receiver<()>>,
    ) -> WatchState {
        let mut poll = tokio::time::interval(SHUTDOWN_POLL);

        loop {
            tokio::select! {
                biased;
                event = events.recv() => match event {
                    Some(event) => self.handle(event),
                    None => {
                        crate::debug!("watch"; "event stream ended");
                        break;
                    }
                },
                Some(idle) = self.idle_rx.recv() => self.retire(idle),
                _ = poll.tick(), if shutdown.is_some() => {
                    if shutdown.as_ref().is_some_and(|rx| rx.try_recv().is_ok()) {
                        crate::debug!("watch"; "shutdown signal received");
                        break;
                    }
                }
            }
        }

        self.close().await
    }

    fn handle(&mut self, event: WatchEvent) {
        match (self.state, event) {
            (WatchState::Initializing, WatchEvent::Ready) => {
                self.state = WatchState::Ready;
                log!("watch"; "watching {} for changes", self.processor.config().source.display());
                self.report(WatchOutcome::Ready);
            }
            (_, WatchEvent::Ready) => {}
            (WatchState::Ready, event) => self.enqueue(event),
            (_, event) => {
                if let Some(path) = event.path() {
                    crate::debug!("watch"; "ignored {} {} before ready", event.label(), to_slash(path));
                }
                self.report(WatchOutcome::Ignored(event));
            }
        }
    }

    fn report(&self, outcome: WatchOutcome) {
        if let Some(tx) = &self.reporter {
            let _ = tx.send(outcome);
        }
    }

    /// Hand the event to its path's worker, starting one if needed.
    fn enqueue(&mut self, event: WatchEvent) {
        let Some(path) = event.path().map(PathBuf::from) else {
            return;
        };

        let event = match self.queues.get_mut(&path) {
            Some(queue) => match queue.tx.send(event) {
                Ok(()) => {
                    queue.sent += 1;
                    return;
                }
                // worker gone (panicked); start a fresh one
                Err(mpsc::error::SendError(event)) => event,
            },
            None => event,
        };
        self.spawn_worker(path, event);
    }

    fn spawn_worker(&mut self, path: PathBuf, first: WatchEvent) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        // fresh channel, receiver alive
        let _ = tx.send(first);

        let id = self.next_worker;
        self.next_worker += 1;

        let processor = Arc::clone(&self.processor);
        let reporter = self.reporter.clone();
        let idle = self.idle_tx.clone();
        let worker_path = path.clone();
        let handle = tokio::spawn(async move {
            let mut applied = 0;
            while let Some(event) = rx.recv().await {
                let outcome = apply(Arc::clone(&processor), event).await;
                print_outcome(&outcome);
                if let Some(tx) = &reporter {
                    let _ = tx.send(outcome);
                }
                applied += 1;
                let _ = idle.send(Idle {
                    path: worker_path.clone(),
                    worker: id,
                    applied,
                });
            }
        });

        self.queues.insert(
            path,
            Queue {
                id,
                tx,
                sent: 1,
                handle,
            },
        );
    }

    /// Drop a worker that has caught up; its task ends once the sender is gone.
    fn retire(&mut self, idle: Idle) {
        let caught_up = self
            .queues
            .get(&idle.path)
            .is_some_and(|q| q.id == idle.worker && q.sent == idle.applied);
        if caught_up {
            self.queues.remove(&idle.path);
        }
    }

    /// Stop accepting events, drain queued work (bounded), and close.
    async fn close(mut self) -> WatchState {
        let handles: Vec<_> = self.queues.drain().map(|(_, queue)| queue.handle).collect();
        let aborts: Vec<_> = handles.iter().map(JoinHandle::abort_handle).collect();

        let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
            for handle in handles {
                let _ = handle.await;
            }
        })
        .await;
        if drained.is_err() {
            log!("warning"; "pending rebuilds did not finish in {}s, abandoning", DRAIN_TIMEOUT.as_secs());
            for abort in aborts {
                abort.abort();
            }
        }

        self.state = WatchState::Closed;
        self.state
    }
}

/// Apply one event on the blocking pool.
async fn apply(processor: Arc<Processor>, event: WatchEvent) -> WatchOutcome {
    let Some(path) = event.path().map(PathBuf::from) else {
        return WatchOutcome::Ready;
    };
    let rel = path.clone();

    let joined = tokio::task::spawn_blocking(move || match event {
        WatchEvent::Removed(_) => processor
            .remove(&rel)
            .map(|targets| WatchOutcome::Removed {
                path: rel.clone(),
                targets,
            }),
        _ => processor.process(&rel).map(|processed| WatchOutcome::Processed {
            path: rel.clone(),
            processed,
        }),
    })
    .await;

    match joined {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => WatchOutcome::Failed {
            path,
            message: error_chain(&e),
        },
        Err(e) => WatchOutcome::Failed {
            path,
            message: format!("worker failed: {e}"),
        },
    }
}

/// One status line per applied event.
#[derive(Debug, PartialEq, Eq)]
enum Status {
    Success(String),
    Failure { summary: String, detail: String },
}

fn status(outcome: &WatchOutcome) -> Option<Status> {
    let line = match outcome {
        WatchOutcome::Processed { path, processed } => match processed {
            Processed::Content { .. } => format!("rendered {}", to_slash(path)),
            Processed::Static { .. } => format!("copied {}", to_slash(path)),
            Processed::Skipped => format!("skipped {} (private)", to_slash(path)),
        },
        WatchOutcome::Removed { path, targets } if targets.is_empty() => {
            format!("removed {} (no output)", to_slash(path))
        }
        WatchOutcome::Removed { path, .. } => format!("removed {}", to_slash(path)),
        WatchOutcome::Failed { path, message } => {
            return Some(Status::Failure {
                summary: format!("failed {}", to_slash(path)),
                detail: message.clone(),
            });
        }
        WatchOutcome::Ignored(_) | WatchOutcome::Ready => return None,
    };
    Some(Status::Success(line))
}

fn print_outcome(outcome: &WatchOutcome) {
    match status(outcome) {
        Some(Status::Success(line)) => status_success(&line),
        Some(Status::Failure { summary, detail }) => status_error(&summary, &detail),
        None => {}
    }
}
