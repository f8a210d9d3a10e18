//! Deterministic backend for unit tests.
//!
//! Registrations are recorded; events are queued per directory path and only
//! delivered once that directory is registered, the way a kernel never reports
//! events for a directory nobody watches. An empty queue closes the backend.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;

use super::backend::{Wait, WatchBackend};
use super::error::WatchError;
use super::event::{EventBatch, EventKinds, RawEvent, WatchHandle};

enum Step {
    Events(PathBuf, Vec<RawEvent>),
    Invalidate(PathBuf),
}

#[derive(Default)]
struct ScriptState {
    next_handle: u64,
    handles: HashMap<PathBuf, WatchHandle>,
    kinds: HashMap<WatchHandle, EventKinds>,
    registrations: Vec<PathBuf>,
    refused: HashSet<PathBuf>,
    invalid: HashSet<WatchHandle>,
    steps: VecDeque<Step>,
    closed: bool,
}

/// Shared script driving a [`ScriptedBackend`].
#[derive(Clone, Default)]
pub(crate) struct Script(Arc<Mutex<ScriptState>>);

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn backend(&self) -> ScriptedBackend {
        ScriptedBackend {
            script: self.clone(),
        }
    }

    /// Queue events reported by the watch on `dir`.
    pub fn events(&self, dir: &Path, events: Vec<RawEvent>) {
        self.0
            .lock()
            .steps
            .push_back(Step::Events(dir.to_path_buf(), events));
    }

    /// Queue the loss of the watch on `dir`.
    pub fn invalidate(&self, dir: &Path) {
        self.0
            .lock()
            .steps
            .push_back(Step::Invalidate(dir.to_path_buf()));
    }

    /// Make registration of `dir` fail.
    pub fn refuse(&self, dir: &Path) {
        self.0.lock().refused.insert(dir.to_path_buf());
    }

    /// Every successful registration, in call order (repeats included).
    pub fn registrations(&self) -> Vec<PathBuf> {
        self.0.lock().registrations.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.0.lock().closed
    }
}

pub(crate) struct ScriptedBackend {
    script: Script,
}

impl WatchBackend for ScriptedBackend {
    fn register(&mut self, path: &Path, kinds: EventKinds) -> Result<WatchHandle, WatchError> {
        let mut state = self.script.0.lock();
        if state.refused.contains(path) {
            return Err(WatchError::Init {
                reason: format!("refused {}", path.display()),
            });
        }

        let handle = match state.handles.get(path) {
            Some(handle) => *handle,
            None => {
                state.next_handle += 1;
                let handle = WatchHandle::from_raw(state.next_handle);
                state.handles.insert(path.to_path_buf(), handle);
                handle
            }
        };
        state.kinds.insert(handle, kinds);
        state.registrations.push(path.to_path_buf());
        Ok(handle)
    }

    fn wait(&mut self, stop: &Receiver<()>) -> Wait {
        let mut state = self.script.0.lock();
        loop {
            if stop.try_recv().is_ok() {
                return Wait::Stopped;
            }
            let Some(step) = state.steps.pop_front() else {
                return Wait::Closed;
            };
            match step {
                Step::Events(dir, events) => {
                    let Some(handle) = state.handles.get(&dir).copied() else {
                        continue;
                    };
                    let kinds = state.kinds.get(&handle).copied().unwrap_or_default();
                    let mut batch = EventBatch::new(handle);
                    batch.events = events.into_iter().filter(|e| kinds.admits(e.kind)).collect();
                    return Wait::Batch(batch);
                }
                Step::Invalidate(dir) => {
                    let Some(handle) = state.handles.remove(&dir) else {
                        continue;
                    };
                    state.invalid.insert(handle);
                    return Wait::Batch(EventBatch::new(handle));
                }
            }
        }
    }

    fn rearm(&mut self, handle: WatchHandle) -> bool {
        !self.script.0.lock().invalid.contains(&handle)
    }

    fn close(&mut self) {
        self.script.0.lock().closed = true;
    }
}
