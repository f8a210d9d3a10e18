pub mod cli;
pub mod config;
pub mod logging;
pub mod watcher;

pub use config::{EventSelector, Settings};
pub use watcher::{
    AcceptAll, ChannelObserver, DispatchLoop, EventBatch, EventKind, EventKinds, EventObserver,
    FnFilter, FnObserver, LoopExit, NotifyBackend, PathFilter, PatternFilter, RawEvent,
    ResolvedEvent, StopHandle, TreeRegistrar, Wait, WatchBackend, WatchError, WatchHandle,
    WatchRegistry, WatchTask, WatchTree,
};
