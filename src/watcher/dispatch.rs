//! Dispatch loop: drains backend batches, notifies the observer and grows the tree.

use std::fmt;
use std::fs;
use std::path::Path;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};

use super::backend::{NotifyBackend, Wait, WatchBackend};
use super::error::WatchError;
use super::event::{EventBatch, EventKind};
use super::filter::PathFilter;
use super::observer::EventObserver;
use super::registrar::TreeRegistrar;
use super::registry::WatchRegistry;

/// Why a dispatch loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// A stop was requested through a [`StopHandle`].
    Stopped,
    /// Every watched directory went away.
    AllWatchesInvalidated,
    /// The backend stopped producing events.
    BackendClosed,
}

impl fmt::Display for LoopExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopExit::Stopped => f.write_str("stop requested"),
            LoopExit::AllWatchesInvalidated => f.write_str("no directories left to watch"),
            LoopExit::BackendClosed => f.write_str("backend closed"),
        }
    }
}

/// Requests a cooperative stop of a running dispatch loop.
///
/// The loop notices the request at its next wait, finishing the batch in
/// progress first. Stopping twice is harmless.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Sender<()>,
}

impl StopHandle {
    pub fn stop(&self) {
        let _ = self.tx.try_send(());
    }
}

/// The single loop owning a watch tree.
///
/// Created by [`WatchTree::setup`](super::WatchTree::setup). Run it with
/// [`run`](Self::run) on a worker of your choice, or [`spawn`](Self::spawn)
/// it on a dedicated thread. The backend is closed when the loop returns.
pub struct DispatchLoop<B: WatchBackend = NotifyBackend> {
    backend: B,
    registry: WatchRegistry,
    registrar: TreeRegistrar,
    observer: Box<dyn EventObserver>,
    filter: Box<dyn PathFilter>,
    stop_tx: Sender<()>,
    stop_rx: Receiver<()>,
}

impl<B: WatchBackend> DispatchLoop<B> {
    pub(crate) fn new(
        backend: B,
        registry: WatchRegistry,
        registrar: TreeRegistrar,
        observer: Box<dyn EventObserver>,
        filter: Box<dyn PathFilter>,
    ) -> Self {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
        Self {
            backend,
            registry,
            registrar,
            observer,
            filter,
            stop_tx,
            stop_rx,
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: self.stop_tx.clone(),
        }
    }

    /// Directories watched right now.
    pub fn registry(&self) -> &WatchRegistry {
        &self.registry
    }

    /// Run until stopped, until no watch is left, or until the backend closes.
    pub fn run(mut self) -> LoopExit {
        crate::log_event!(
            "watcher",
            "started",
            "{} directories",
            self.registry.len()
        );

        let exit = loop {
            let batch = match self.backend.wait(&self.stop_rx) {
                Wait::Batch(batch) => batch,
                Wait::Stopped => break LoopExit::Stopped,
                Wait::Closed => break LoopExit::BackendClosed,
            };

            self.process_batch(&batch);

            if !self.backend.rearm(batch.handle) {
                if let Some(dir) = self.registry.remove(batch.handle) {
                    crate::debug_event!("watcher", "watch removed", "{}", dir.display());
                }
                if self.registry.is_empty() {
                    break LoopExit::AllWatchesInvalidated;
                }
            }
        };

        self.backend.close();
        crate::log_event!("watcher", "stopped", "{exit}");
        exit
    }

    fn process_batch(&mut self, batch: &EventBatch) {
        for event in &batch.events {
            if event.kind == EventKind::Overflow {
                tracing::warn!(
                    "[watcher] event overflow on watch {}, some events were lost",
                    batch.handle
                );
                continue;
            }

            let Some(dir) = self.registry.get(batch.handle) else {
                crate::debug_event!("watcher", "stale handle", "{}", batch.handle);
                continue;
            };
            let path = dir.join(&event.name);
            crate::debug_event!("watcher", event.kind, "{}", path.display());

            let is_dir = is_directory(&path);
            if self.filter.accept_file(&path) || (is_dir && self.filter.accept_directory(&path)) {
                self.observer.dispatch(event.kind, &path);
            }

            if self.registrar.recursive() && event.kind == EventKind::Created && is_dir {
                match self.registrar.register_tree(
                    &path,
                    &mut self.backend,
                    &mut self.registry,
                    self.filter.as_ref(),
                ) {
                    Ok(count) => {
                        crate::debug_event!(
                            "watcher",
                            "new directory",
                            "{} ({count} watched)",
                            path.display()
                        );
                    }
                    Err(e) => {
                        tracing::warn!(
                            "[watcher] couldn't watch new directory {}: {e}",
                            path.display()
                        );
                    }
                }
            }
        }
    }
}

impl<B: WatchBackend + 'static> DispatchLoop<B> {
    /// Run the loop on a dedicated thread.
    pub fn spawn(self) -> Result<WatchTask, WatchError> {
        let stop = self.stop_handle();
        let join = std::thread::Builder::new()
            .name("treewatch-dispatch".to_string())
            .spawn(move || self.run())
            .map_err(|e| WatchError::Init {
                reason: format!("failed to spawn dispatch thread: {e}"),
            })?;
        Ok(WatchTask { stop, join })
    }
}

/// A dispatch loop running on its own thread.
pub struct WatchTask {
    stop: StopHandle,
    join: JoinHandle<LoopExit>,
}

impl WatchTask {
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the loop to return on its own.
    pub fn join(self) -> std::thread::Result<LoopExit> {
        self.join.join()
    }

    pub fn stop_and_join(self) -> std::thread::Result<LoopExit> {
        self.stop.stop();
        self.join()
    }
}

/// Directory test that does not follow symbolic links, like the tree walk.
fn is_directory(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|meta| meta.is_dir())
}
