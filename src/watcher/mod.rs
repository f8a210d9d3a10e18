//! Recursive directory-tree watcher.
//!
//! One OS-level watch per directory, a registry mapping watch handles to
//! directories, and a single dispatch loop that resolves events, filters
//! them, notifies an observer and extends the tree as directories appear.
//!
//! # Architecture
//!
//! ```text
//! WatchTree --setup--> DispatchLoop
//!                        - WatchBackend (notify, one watch per directory)
//!                        - WatchRegistry (handle -> directory)
//!                        - TreeRegistrar (initial and incremental walks)
//!                        - PathFilter / EventObserver (caller supplied)
//! ```

mod backend;
mod dispatch;
mod error;
mod event;
mod filter;
mod observer;
mod registrar;
mod registry;
#[cfg(test)]
mod scripted;
mod tree;

pub use backend::{NotifyBackend, Wait, WatchBackend};
pub use dispatch::{DispatchLoop, LoopExit, StopHandle, WatchTask};
pub use error::WatchError;
pub use event::{EventBatch, EventKind, EventKinds, RawEvent, ResolvedEvent, WatchHandle};
pub use filter::{AcceptAll, FnFilter, PathFilter, PatternFilter};
pub use observer::{ChannelObserver, EventObserver, FnObserver};
pub use registrar::TreeRegistrar;
pub use registry::WatchRegistry;
pub use tree::WatchTree;
