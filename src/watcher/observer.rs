//! Observer trait receiving filtered, resolved events.

use std::path::Path;

use crossbeam_channel::Sender;

use super::event::{EventKind, ResolvedEvent};

/// Receives events from the dispatch loop.
///
/// Methods are called synchronously on the loop thread. An observer that
/// blocks stalls all further event processing.
pub trait EventObserver: Send {
    fn on_created(&mut self, path: &Path);

    fn on_deleted(&mut self, path: &Path);

    fn on_modified(&mut self, path: &Path);

    /// Route an event to the method matching its kind.
    ///
    /// Overflow is not an observable kind and is ignored.
    fn dispatch(&mut self, kind: EventKind, path: &Path) {
        match kind {
            EventKind::Created => self.on_created(path),
            EventKind::Deleted => self.on_deleted(path),
            EventKind::Modified => self.on_modified(path),
            EventKind::Overflow => {}
        }
    }
}

impl<T: EventObserver + ?Sized> EventObserver for Box<T> {
    fn on_created(&mut self, path: &Path) {
        (**self).on_created(path)
    }

    fn on_deleted(&mut self, path: &Path) {
        (**self).on_deleted(path)
    }

    fn on_modified(&mut self, path: &Path) {
        (**self).on_modified(path)
    }

    fn dispatch(&mut self, kind: EventKind, path: &Path) {
        (**self).dispatch(kind, path)
    }
}

/// Observer wrapping a single `(path, kind)` callback.
pub struct FnObserver<F>(F);

impl<F> FnObserver<F>
where
    F: FnMut(&Path, EventKind) + Send,
{
    pub fn new(callback: F) -> Self {
        Self(callback)
    }
}

impl<F> EventObserver for FnObserver<F>
where
    F: FnMut(&Path, EventKind) + Send,
{
    fn on_created(&mut self, path: &Path) {
        (self.0)(path, EventKind::Created)
    }

    fn on_deleted(&mut self, path: &Path) {
        (self.0)(path, EventKind::Deleted)
    }

    fn on_modified(&mut self, path: &Path) {
        (self.0)(path, EventKind::Modified)
    }
}

/// Observer forwarding every event into a channel.
///
/// Sending never blocks on an unbounded channel. Once the receiver is gone
/// events are dropped silently.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: Sender<ResolvedEvent>,
}

impl ChannelObserver {
    pub fn new(tx: Sender<ResolvedEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, kind: EventKind, path: &Path) {
        let _ = self.tx.send(ResolvedEvent {
            kind,
            path: path.to_path_buf(),
        });
    }
}

impl EventObserver for ChannelObserver {
    fn on_created(&mut self, path: &Path) {
        self.send(EventKind::Created, path);
    }

    fn on_deleted(&mut self, path: &Path) {
        self.send(EventKind::Deleted, path);
    }

    fn on_modified(&mut self, path: &Path) {
        self.send(EventKind::Modified, path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_dispatch_routes_by_kind() {
        let mut seen = Vec::new();
        {
            let mut observer = FnObserver::new(|p: &Path, k| seen.push((k, p.to_path_buf())));
            observer.dispatch(EventKind::Created, Path::new("/a"));
            observer.dispatch(EventKind::Deleted, Path::new("/b"));
            observer.dispatch(EventKind::Modified, Path::new("/c"));
            observer.dispatch(EventKind::Overflow, Path::new(""));
        }

        assert_eq!(
            seen,
            vec![
                (EventKind::Created, PathBuf::from("/a")),
                (EventKind::Deleted, PathBuf::from("/b")),
                (EventKind::Modified, PathBuf::from("/c")),
            ]
        );
    }

    /// Observer that handles every kind in `dispatch` itself.
    #[derive(Default)]
    struct Tally {
        dispatched: Vec<EventKind>,
        callbacks: usize,
    }

    impl EventObserver for Tally {
        fn on_created(&mut self, _path: &Path) {
            self.callbacks += 1;
        }

        fn on_deleted(&mut self, _path: &Path) {
            self.callbacks += 1;
        }

        fn on_modified(&mut self, _path: &Path) {
            self.callbacks += 1;
        }

        fn dispatch(&mut self, kind: EventKind, _path: &Path) {
            self.dispatched.push(kind);
        }
    }

    #[test]
    fn test_boxed_observer_keeps_custom_dispatch() {
        let mut boxed: Box<Tally> = Box::default();
        {
            let observer: &mut dyn EventObserver = &mut boxed;
            observer.dispatch(EventKind::Deleted, Path::new("/w/a"));
            observer.dispatch(EventKind::Overflow, Path::new(""));
        }

        assert_eq!(boxed.dispatched, vec![EventKind::Deleted, EventKind::Overflow]);
        assert_eq!(boxed.callbacks, 0);
    }

    #[test]
    fn test_channel_observer_forwards() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut observer = ChannelObserver::new(tx);

        observer.on_modified(Path::new("/w/file.txt"));

        let event = rx.try_recv().unwrap();
        assert_eq!(event.kind, EventKind::Modified);
        assert_eq!(event.path, PathBuf::from("/w/file.txt"));
    }

    #[test]
    fn test_channel_observer_ignores_closed_receiver() {
        let (tx, rx) = crossbeam_channel::unbounded();
        drop(rx);
        let mut observer = ChannelObserver::new(tx);

        observer.on_created(Path::new("/w/file.txt"));
    }
}
