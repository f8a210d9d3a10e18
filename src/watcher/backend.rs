//! Notification backends: the OS facility the watch tree registers directories with.
//!
//! [`NotifyBackend`] sits on top of `notify` with one non-recursive watch per
//! directory, and reshapes its path-based events into per-handle batches.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use crossbeam_channel::{Receiver, select};
use notify::event::{ModifyKind, RenameMode};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use super::error::WatchError;
use super::event::{EventBatch, EventKind, EventKinds, RawEvent, WatchHandle};

/// Outcome of waiting on a backend.
#[derive(Debug)]
pub enum Wait {
    /// Events for one watched directory.
    Batch(EventBatch),
    /// A stop was requested.
    Stopped,
    /// The backend can no longer produce events.
    Closed,
}

/// A filesystem notification facility.
///
/// Used from a single thread: the one running the dispatch loop.
pub trait WatchBackend: Send {
    /// Start watching one directory (not its subdirectories).
    ///
    /// Registering a directory that is already watched returns its existing handle.
    fn register(&mut self, path: &Path, kinds: EventKinds) -> Result<WatchHandle, WatchError>;

    /// Block until a batch is ready, `stop` receives a message, or the backend closes.
    ///
    /// A pending stop wins over pending batches.
    fn wait(&mut self, stop: &Receiver<()>) -> Wait;

    /// Re-arm a handle after its batch was processed.
    ///
    /// Returns `false` once the handle is permanently invalid.
    fn rearm(&mut self, handle: WatchHandle) -> bool;

    /// Release the underlying OS resources. Idempotent.
    fn close(&mut self) {}
}

/// Renames whose halves were already reported, kept to drop the combined report.
const RENAME_MEMORY: usize = 64;

/// Identity of a directory on disk, to tell a recreated directory from the watched one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DirId {
    dev: u64,
    ino: u64,
}

impl DirId {
    #[cfg(unix)]
    fn of(path: &Path) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;

        let meta = fs::symlink_metadata(path).ok()?;
        meta.is_dir().then(|| DirId {
            dev: meta.dev(),
            ino: meta.ino(),
        })
    }

    // No stable identity here: only presence is compared.
    #[cfg(not(unix))]
    fn of(path: &Path) -> Option<Self> {
        fs::symlink_metadata(path)
            .ok()
            .filter(|meta| meta.is_dir())
            .map(|_| DirId { dev: 0, ino: 0 })
    }
}

#[derive(Debug, Clone, Copy)]
struct Watch {
    handle: WatchHandle,
    kinds: EventKinds,
    id: Option<DirId>,
}

/// Backend built on `notify::RecommendedWatcher`.
pub struct NotifyBackend {
    watcher: Option<RecommendedWatcher>,
    events: Receiver<notify::Result<notify::Event>>,
    watches: HashMap<PathBuf, Watch>,
    paths: HashMap<WatchHandle, PathBuf>,
    /// Handles whose directory went away; reported once by `rearm`.
    invalid: HashSet<WatchHandle>,
    /// Directories already reported as removed, to drop the second removal report.
    retired: HashSet<PathBuf>,
    /// Trackers of rename halves already translated.
    renames: VecDeque<usize>,
    pending: VecDeque<EventBatch>,
    next_handle: u64,
}

impl NotifyBackend {
    pub fn new() -> Result<Self, WatchError> {
        let (tx, rx) = crossbeam_channel::unbounded();

        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let _ = tx.send(res);
        })?;

        Ok(Self {
            watcher: Some(watcher),
            events: rx,
            watches: HashMap::new(),
            paths: HashMap::new(),
            invalid: HashSet::new(),
            retired: HashSet::new(),
            renames: VecDeque::new(),
            pending: VecDeque::new(),
            next_handle: 1,
        })
    }

    /// Number of directories currently watched.
    pub fn watch_count(&self) -> usize {
        self.watches.len()
    }

    fn ingest(&mut self, res: notify::Result<notify::Event>) {
        let event = match res {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("[watcher] file watch error: {e}");
                return;
            }
        };

        if event.need_rescan() {
            let handle = event
                .paths
                .first()
                .and_then(|p| self.handle_near(p))
                .or_else(|| self.paths.keys().min().copied());
            if let Some(handle) = handle {
                self.push(handle, Some(RawEvent::overflow()));
            }
            return;
        }
        if self.is_rename_echo(&event) {
            return;
        }

        for (kind, path) in translate(event) {
            self.ingest_path(kind, path);
        }
    }

    fn ingest_path(&mut self, kind: EventKind, path: PathBuf) {
        match kind {
            EventKind::Deleted => {
                // notify drops its own watch on any removal report of a watched
                // path, even when a new directory already stands there.
                if self.watches.contains_key(&path) {
                    self.invalidate_under(&path);
                } else if self.retired.remove(&path) {
                    return;
                }
            }
            EventKind::Created => {
                self.retired.remove(&path);
            }
            _ => {}
        }

        let Some(parent) = path.parent() else {
            return;
        };
        let Some(watch) = self.watches.get(parent).copied() else {
            return;
        };
        if !watch.kinds.admits(kind) {
            return;
        }
        let Some(name) = path.file_name() else {
            return;
        };
        self.push(watch.handle, Some(RawEvent::new(kind, name)));
    }

    /// Whether `event` is the combined report of a rename whose halves were seen.
    ///
    /// inotify reports a rename as `From`, `To` and then `Both`, all sharing a
    /// tracker. A `From` or `To` without its partner is a move out of or into
    /// the tree and still counts.
    fn is_rename_echo(&mut self, event: &notify::Event) -> bool {
        let notify::EventKind::Modify(ModifyKind::Name(mode)) = event.kind else {
            return false;
        };
        let Some(tracker) = event.tracker() else {
            return false;
        };

        match mode {
            RenameMode::From | RenameMode::To => {
                if self.renames.len() == RENAME_MEMORY {
                    self.renames.pop_front();
                }
                self.renames.push_back(tracker);
                false
            }
            RenameMode::Both => {
                let before = self.renames.len();
                self.renames.retain(|t| *t != tracker);
                self.renames.len() != before
            }
            _ => false,
        }
    }

    /// Retire `root` and every watched directory below it that is gone or replaced.
    fn invalidate_under(&mut self, root: &Path) {
        let gone: Vec<PathBuf> = self
            .watches
            .iter()
            .filter(|(p, w)| {
                p.starts_with(root) && (p.as_path() == root || DirId::of(p) != w.id)
            })
            .map(|(p, _)| p.clone())
            .collect();

        for path in gone {
            let Some(watch) = self.watches.remove(&path) else {
                continue;
            };
            self.paths.remove(&watch.handle);
            self.invalid.insert(watch.handle);
            if let Some(watcher) = self.watcher.as_mut() {
                // notify may already have dropped the watch itself
                let _ = watcher.unwatch(&path);
            }
            crate::debug_event!("watcher", "invalidated", "{}", path.display());
            self.push(watch.handle, None);
            self.retired.insert(path);
        }
    }

    /// Handle of `path` itself or of its parent directory.
    fn handle_near(&self, path: &Path) -> Option<WatchHandle> {
        self.watches
            .get(path)
            .or_else(|| path.parent().and_then(|p| self.watches.get(p)))
            .map(|w| w.handle)
    }

    /// Append to the batch of `handle`, keeping delivery order across handles.
    ///
    /// `None` still queues a (possibly empty) batch so the handle gets re-armed.
    fn push(&mut self, handle: WatchHandle, event: Option<RawEvent>) {
        match self.pending.back_mut() {
            Some(batch) if batch.handle == handle => batch.events.extend(event),
            _ => {
                let mut batch = EventBatch::new(handle);
                batch.events.extend(event);
                self.pending.push_back(batch);
            }
        }
    }
}

impl WatchBackend for NotifyBackend {
    fn register(&mut self, path: &Path, kinds: EventKinds) -> Result<WatchHandle, WatchError> {
        let id = DirId::of(path);
        if let Some(watch) = self.watches.get_mut(path) {
            if watch.id == id {
                watch.kinds = kinds;
                return Ok(watch.handle);
            }
            // Removed and recreated before the removal was reported.
            crate::debug_event!("watcher", "replaced", "{}", path.display());
            self.invalidate_under(path);
        }

        let watcher = self.watcher.as_mut().ok_or_else(|| WatchError::Init {
            reason: "backend is closed".to_string(),
        })?;
        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::Register {
                path: path.to_path_buf(),
                source,
            })?;

        let handle = WatchHandle::from_raw(self.next_handle);
        self.next_handle += 1;
        self.watches
            .insert(path.to_path_buf(), Watch { handle, kinds, id });
        self.paths.insert(handle, path.to_path_buf());
        self.retired.remove(path);
        Ok(handle)
    }

    fn wait(&mut self, stop: &Receiver<()>) -> Wait {
        let events = self.events.clone();
        loop {
            if self.watcher.is_none() {
                return Wait::Closed;
            }
            if stop.try_recv().is_ok() {
                return Wait::Stopped;
            }
            if let Some(batch) = self.pending.pop_front() {
                return Wait::Batch(batch);
            }

            select! {
                recv(stop) -> _ => return Wait::Stopped,
                recv(events) -> msg => match msg {
                    Ok(res) => {
                        self.ingest(res);
                        while let Ok(res) = events.try_recv() {
                            self.ingest(res);
                        }
                    }
                    Err(_) => return Wait::Closed,
                },
            }
        }
    }

    fn rearm(&mut self, handle: WatchHandle) -> bool {
        if self.invalid.remove(&handle) {
            return false;
        }
        self.paths.contains_key(&handle)
    }

    fn close(&mut self) {
        if self.watcher.take().is_some() {
            crate::debug_event!("watcher", "closed", "{} watches released", self.watches.len());
        }
        self.watches.clear();
        self.paths.clear();
        self.renames.clear();
        self.pending.clear();
    }
}

/// Map one notify event onto per-path event kinds.
fn translate(event: notify::Event) -> Vec<(EventKind, PathBuf)> {
    use notify::EventKind as Kind;

    let mut paths = event.paths.into_iter();
    match event.kind {
        Kind::Create(_) => paths.map(|p| (EventKind::Created, p)).collect(),
        Kind::Remove(_) => paths.map(|p| (EventKind::Deleted, p)).collect(),
        Kind::Modify(ModifyKind::Name(RenameMode::From)) => {
            paths.map(|p| (EventKind::Deleted, p)).collect()
        }
        Kind::Modify(ModifyKind::Name(RenameMode::To)) => {
            paths.map(|p| (EventKind::Created, p)).collect()
        }
        Kind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut out = Vec::with_capacity(2);
            if let Some(from) = paths.next() {
                out.push((EventKind::Deleted, from));
            }
            if let Some(to) = paths.next() {
                out.push((EventKind::Created, to));
            }
            out
        }
        // Direction unknown: the path tells which side of the rename it is.
        Kind::Modify(ModifyKind::Name(_)) => paths
            .map(|p| {
                let kind = if p.exists() {
                    EventKind::Created
                } else {
                    EventKind::Deleted
                };
                (kind, p)
            })
            .collect(),
        Kind::Modify(_) => paths.map(|p| (EventKind::Modified, p)).collect(),
        Kind::Access(_) | Kind::Any | Kind::Other => Vec::new(),
    }
}
