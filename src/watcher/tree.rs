//! Watch-tree manager: configuration plus the initial walk.

use std::fs;
use std::path::{Path, PathBuf};

use super::backend::{NotifyBackend, WatchBackend};
use super::dispatch::DispatchLoop;
use super::error::WatchError;
use super::event::EventKinds;
use super::filter::PathFilter;
use super::observer::EventObserver;
use super::registrar::TreeRegistrar;
use super::registry::WatchRegistry;

/// A directory tree to watch.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use treewatch::{AcceptAll, EventKind, EventKinds, FnObserver, WatchTree};
///
/// let tree = WatchTree::new("/srv/www", true, EventKinds::all());
/// let dispatch = tree.setup(
///     FnObserver::new(|path: &Path, kind: EventKind| println!("{kind} {}", path.display())),
///     AcceptAll,
/// )?;
/// let task = dispatch.spawn()?;
/// // ...
/// task.stop_and_join().ok();
/// # Ok::<(), treewatch::WatchError>(())
/// ```
#[derive(Debug, Clone)]
pub struct WatchTree {
    root: PathBuf,
    recursive: bool,
    kinds: EventKinds,
}

impl WatchTree {
    pub fn new(root: impl Into<PathBuf>, recursive: bool, kinds: EventKinds) -> Self {
        Self {
            root: root.into(),
            recursive,
            kinds,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a `notify` backend, walk the tree and return the loop to run.
    pub fn setup<O, F>(&self, observer: O, filter: F) -> Result<DispatchLoop, WatchError>
    where
        O: EventObserver + 'static,
        F: PathFilter + 'static,
    {
        let backend = NotifyBackend::new()?;
        self.setup_with(backend, observer, filter)
    }

    /// Walk the tree with the given backend and return the loop to run.
    ///
    /// The root is resolved to an absolute, canonical path first. Any failure
    /// to read or register the root fails the whole setup and closes the
    /// backend.
    pub fn setup_with<B, O, F>(
        &self,
        mut backend: B,
        observer: O,
        filter: F,
    ) -> Result<DispatchLoop<B>, WatchError>
    where
        B: WatchBackend,
        O: EventObserver + 'static,
        F: PathFilter + 'static,
    {
        let root = fs::canonicalize(&self.root).map_err(|e| WatchError::Setup {
            path: self.root.clone(),
            reason: e.to_string(),
        })?;

        let registrar = TreeRegistrar::new(self.recursive, self.kinds);
        let mut registry = WatchRegistry::new();
        let count = match registrar.register_tree(&root, &mut backend, &mut registry, &filter) {
            Ok(count) => count,
            Err(e) => {
                backend.close();
                return Err(WatchError::Setup {
                    path: root,
                    reason: e.to_string(),
                });
            }
        };

        crate::debug_event!(
            "watcher",
            "initial walk",
            "{count} directories under {}",
            root.display()
        );

        Ok(DispatchLoop::new(
            backend,
            registry,
            registrar,
            Box::new(observer),
            Box::new(filter),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::filter::AcceptAll;
    use crate::watcher::observer::FnObserver;
    use crate::watcher::scripted::Script;
    use std::path::Path;
    use tempfile::TempDir;

    fn ignore() -> impl EventObserver + 'static {
        FnObserver::new(|_: &Path, _| {})
    }

    #[test]
    fn test_setup_populates_registry() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("x/y")).unwrap();
        let script = Script::new();

        let dispatch = WatchTree::new(temp_dir.path(), true, EventKinds::all())
            .setup_with(script.backend(), ignore(), AcceptAll)
            .unwrap();

        let root = temp_dir.path().canonicalize().unwrap();
        assert_eq!(dispatch.registry().len(), 3);
        assert!(dispatch.registry().contains_path(&root.join("x/y")));
    }

    #[test]
    fn test_setup_fails_for_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let script = Script::new();

        let result = WatchTree::new(temp_dir.path().join("gone"), true, EventKinds::all())
            .setup_with(script.backend(), ignore(), AcceptAll);

        assert!(matches!(result, Err(WatchError::Setup { .. })));
    }

    #[test]
    fn test_setup_fails_and_closes_when_root_refused() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();
        let script = Script::new();
        script.refuse(&root);

        let result = WatchTree::new(&root, true, EventKinds::all()).setup_with(
            script.backend(),
            ignore(),
            AcceptAll,
        );

        let err = result.err().unwrap();
        assert!(matches!(err, WatchError::Setup { .. }));
        assert_eq!(err.path(), Some(&root));
        assert!(script.is_closed());
    }

    #[test]
    fn test_relative_root_resolved() {
        let tree = WatchTree::new(".", false, EventKinds::all());
        let script = Script::new();

        let dispatch = tree
            .setup_with(script.backend(), ignore(), AcceptAll)
            .unwrap();

        let watched: Vec<&Path> = dispatch.registry().paths().collect();
        assert_eq!(watched.len(), 1);
        assert!(watched[0].is_absolute());
    }
}
