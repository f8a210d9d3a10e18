//! Registry mapping watch handles to the directories they watch.
//!
//! Owned by a single dispatch loop. Grows while the tree is walked and
//! shrinks only when a watch becomes invalid.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::event::WatchHandle;

/// Mapping from watch handles to absolute directory paths.
#[derive(Debug, Default)]
pub struct WatchRegistry {
    dirs: HashMap<WatchHandle, PathBuf>,
}

impl WatchRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the directory for a handle.
    ///
    /// Re-registering a handle replaces its path; it never adds a second entry.
    pub fn put(&mut self, handle: WatchHandle, path: PathBuf) {
        self.dirs.insert(handle, path);
    }

    pub fn get(&self, handle: WatchHandle) -> Option<&Path> {
        self.dirs.get(&handle).map(PathBuf::as_path)
    }

    pub fn remove(&mut self, handle: WatchHandle) -> Option<PathBuf> {
        self.dirs.remove(&handle)
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    /// Check if a directory is watched under any handle.
    pub fn contains_path(&self, path: &Path) -> bool {
        self.dirs.values().any(|p| p == path)
    }

    /// All watched directories, in no particular order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.dirs.values().map(PathBuf::as_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_basic() {
        let mut registry = WatchRegistry::new();
        assert!(registry.is_empty());

        let h1 = WatchHandle::from_raw(1);
        let h2 = WatchHandle::from_raw(2);
        registry.put(h1, PathBuf::from("/project"));
        registry.put(h2, PathBuf::from("/project/src"));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(h1), Some(Path::new("/project")));
        assert!(registry.contains_path(Path::new("/project/src")));
        assert_eq!(registry.get(WatchHandle::from_raw(3)), None);
    }

    #[test]
    fn test_registry_put_replaces() {
        let mut registry = WatchRegistry::new();
        let handle = WatchHandle::from_raw(7);

        registry.put(handle, PathBuf::from("/project/old"));
        registry.put(handle, PathBuf::from("/project/new"));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(handle), Some(Path::new("/project/new")));
        assert!(!registry.contains_path(Path::new("/project/old")));
    }

    #[test]
    fn test_registry_remove_until_empty() {
        let mut registry = WatchRegistry::new();
        let handle = WatchHandle::from_raw(1);
        registry.put(handle, PathBuf::from("/project"));

        assert_eq!(registry.remove(handle), Some(PathBuf::from("/project")));
        assert!(registry.is_empty());
        assert_eq!(registry.remove(handle), None);
    }
}
