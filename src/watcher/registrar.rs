//! Tree registrar: walks a directory tree and registers each accepted directory.

use std::path::Path;

use walkdir::WalkDir;

use super::backend::WatchBackend;
use super::error::WatchError;
use super::event::EventKinds;
use super::filter::PathFilter;
use super::registry::WatchRegistry;

/// Registers directory trees with a backend and records them in a registry.
///
/// The walk is pre-order (a parent is registered before its children),
/// children are visited in file-name order, and symbolic links are not
/// followed. A directory rejected by the filter hides its whole subtree.
#[derive(Debug, Clone, Copy)]
pub struct TreeRegistrar {
    recursive: bool,
    kinds: EventKinds,
}

impl TreeRegistrar {
    pub fn new(recursive: bool, kinds: EventKinds) -> Self {
        Self { recursive, kinds }
    }

    pub fn recursive(&self) -> bool {
        self.recursive
    }

    /// Register `root` and, when recursive, every accepted directory below it.
    ///
    /// `root` itself is registered without consulting the filter. Failing to
    /// read or register `root` is an error; failures below it abandon only
    /// the affected subtree and are logged. Returns the number of directories
    /// registered.
    pub fn register_tree<B>(
        &self,
        root: &Path,
        backend: &mut B,
        registry: &mut WatchRegistry,
        filter: &dyn PathFilter,
    ) -> Result<usize, WatchError>
    where
        B: WatchBackend + ?Sized,
    {
        let mut walker = WalkDir::new(root).follow_links(false).sort_by_file_name();
        if !self.recursive {
            walker = walker.max_depth(0);
        }

        let mut entries = walker.into_iter().filter_entry(|entry| {
            entry.depth() == 0
                || (entry.file_type().is_dir() && filter.accept_directory(entry.path()))
        });

        let mut registered = 0;
        while let Some(entry) = entries.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(source) if source.depth() == 0 => {
                    return Err(WatchError::List {
                        path: root.to_path_buf(),
                        source,
                    });
                }
                Err(e) => {
                    tracing::warn!("[registrar] skipping subtree: {e}");
                    continue;
                }
            };

            if entry.depth() == 0 && !entry.file_type().is_dir() {
                return Err(WatchError::Setup {
                    path: root.to_path_buf(),
                    reason: "not a directory".to_string(),
                });
            }

            match backend.register(entry.path(), self.kinds) {
                Ok(handle) => {
                    registry.put(handle, entry.path().to_path_buf());
                    registered += 1;
                    crate::debug_event!("registrar", "watching", "{}", entry.path().display());
                }
                Err(e) if entry.depth() == 0 => return Err(e),
                Err(e) => {
                    tracing::warn!("[registrar] {e}");
                    entries.skip_current_dir();
                }
            }
        }

        Ok(registered)
    }
}
