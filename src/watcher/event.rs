//! Event and handle types shared by the backend, registry and dispatch loop.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Opaque token identifying one registered directory.
///
/// Issued by a [`WatchBackend`](super::WatchBackend); the watch tree only
/// ever uses it as a registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchHandle(u64);

impl WatchHandle {
    /// Wrap a backend-specific identifier.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of a filesystem event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Created,
    Deleted,
    Modified,
    /// The backend lost events; carries no usable path.
    Overflow,
}

impl EventKind {
    /// The selectable flag for this kind. `None` for [`EventKind::Overflow`].
    pub fn flag(self) -> Option<EventKinds> {
        match self {
            EventKind::Created => Some(EventKinds::CREATED),
            EventKind::Deleted => Some(EventKinds::DELETED),
            EventKind::Modified => Some(EventKinds::MODIFIED),
            EventKind::Overflow => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Created => "created",
            EventKind::Deleted => "deleted",
            EventKind::Modified => "modified",
            EventKind::Overflow => "overflow",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags::bitflags! {
    /// Set of event kinds a watch is registered for.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventKinds: u8 {
        const CREATED = 1;
        const DELETED = 1 << 1;
        const MODIFIED = 1 << 2;
    }
}

impl EventKinds {
    /// Whether an event of `kind` passes this set.
    ///
    /// Overflow always passes: it is a backend condition, not a selectable kind.
    pub fn admits(self, kind: EventKind) -> bool {
        match kind.flag() {
            Some(flag) => self.contains(flag),
            None => true,
        }
    }
}

impl Default for EventKinds {
    fn default() -> Self {
        Self::all()
    }
}

/// One event as delivered by the backend, relative to its watched directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub kind: EventKind,
    /// Entry name relative to the directory of the batch handle.
    pub name: PathBuf,
}

impl RawEvent {
    pub fn new(kind: EventKind, name: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    pub fn overflow() -> Self {
        Self {
            kind: EventKind::Overflow,
            name: PathBuf::new(),
        }
    }
}

/// Events collected for one handle, in delivery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBatch {
    pub handle: WatchHandle,
    pub events: Vec<RawEvent>,
}

impl EventBatch {
    pub fn new(handle: WatchHandle) -> Self {
        Self {
            handle,
            events: Vec::new(),
        }
    }
}

/// An event resolved to an absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedEvent {
    pub kind: EventKind,
    pub path: PathBuf,
}
