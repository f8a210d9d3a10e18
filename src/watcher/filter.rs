//! Path filters deciding which directories get watched and which events are reported.

use std::path::Path;

use glob::Pattern;

use super::WatchError;
use crate::config::FilterConfig;

/// Caller-supplied predicates over paths.
///
/// Called per path, potentially once per event, from the dispatch loop thread.
/// Implementations must be side-effect free and fast.
pub trait PathFilter: Send {
    /// Whether events for this file should reach the observer.
    fn accept_file(&self, path: &Path) -> bool;

    /// Whether this directory (and therefore its subtree) should be watched.
    fn accept_directory(&self, path: &Path) -> bool;
}

impl<T: PathFilter + ?Sized> PathFilter for Box<T> {
    fn accept_file(&self, path: &Path) -> bool {
        (**self).accept_file(path)
    }

    fn accept_directory(&self, path: &Path) -> bool {
        (**self).accept_directory(path)
    }
}

/// Accepts every file and directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl PathFilter for AcceptAll {
    fn accept_file(&self, _path: &Path) -> bool {
        true
    }

    fn accept_directory(&self, _path: &Path) -> bool {
        true
    }
}

/// Filter built from two closures: one for directories, one for files.
pub struct FnFilter<D, F> {
    dir_filter: D,
    file_filter: F,
}

impl<D, F> FnFilter<D, F>
where
    D: Fn(&Path) -> bool + Send,
    F: Fn(&Path) -> bool + Send,
{
    pub fn new(dir_filter: D, file_filter: F) -> Self {
        Self {
            dir_filter,
            file_filter,
        }
    }
}

impl<D, F> PathFilter for FnFilter<D, F>
where
    D: Fn(&Path) -> bool + Send,
    F: Fn(&Path) -> bool + Send,
{
    fn accept_file(&self, path: &Path) -> bool {
        (self.file_filter)(path)
    }

    fn accept_directory(&self, path: &Path) -> bool {
        (self.dir_filter)(path)
    }
}

/// Glob based filter.
///
/// Patterns are tested against the full path and against the final path
/// component, so `target` excludes every directory named `target` while
/// `/srv/data/**` excludes one subtree. Exclusion always wins over inclusion.
#[derive(Debug, Clone, Default)]
pub struct PatternFilter {
    ignore_hidden: bool,
    exclude_dirs: Vec<Pattern>,
    exclude_files: Vec<Pattern>,
    include_files: Vec<Pattern>,
}

impl PatternFilter {
    /// Create a filter that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a filter from the `[filter]` configuration section.
    pub fn from_config(config: &FilterConfig) -> Result<Self, WatchError> {
        let mut filter = Self::new().ignore_hidden(config.ignore_hidden);
        for pattern in &config.exclude_dirs {
            filter = filter.exclude_dir(pattern)?;
        }
        for pattern in &config.exclude_files {
            filter = filter.exclude_file(pattern)?;
        }
        for pattern in &config.include_files {
            filter = filter.include_file(pattern)?;
        }
        Ok(filter)
    }

    /// Reject entries whose name starts with a dot.
    pub fn ignore_hidden(mut self, ignore: bool) -> Self {
        self.ignore_hidden = ignore;
        self
    }

    pub fn exclude_dir(mut self, pattern: &str) -> Result<Self, WatchError> {
        self.exclude_dirs.push(compile(pattern)?);
        Ok(self)
    }

    pub fn exclude_file(mut self, pattern: &str) -> Result<Self, WatchError> {
        self.exclude_files.push(compile(pattern)?);
        Ok(self)
    }

    /// Restrict reported files to those matching at least one include pattern.
    pub fn include_file(mut self, pattern: &str) -> Result<Self, WatchError> {
        self.include_files.push(compile(pattern)?);
        Ok(self)
    }

    fn is_hidden(&self, path: &Path) -> bool {
        self.ignore_hidden
            && path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with('.'))
    }
}

impl PathFilter for PatternFilter {
    fn accept_file(&self, path: &Path) -> bool {
        if self.is_hidden(path) || any_match(&self.exclude_files, path) {
            return false;
        }
        self.include_files.is_empty() || any_match(&self.include_files, path)
    }

    fn accept_directory(&self, path: &Path) -> bool {
        !self.is_hidden(path) && !any_match(&self.exclude_dirs, path)
    }
}

fn compile(pattern: &str) -> Result<Pattern, WatchError> {
    Pattern::new(pattern).map_err(|source| WatchError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

fn any_match(patterns: &[Pattern], path: &Path) -> bool {
    let name = path.file_name().and_then(|name| name.to_str());
    patterns
        .iter()
        .any(|p| p.matches_path(path) || name.is_some_and(|name| p.matches(name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_all() {
        let filter = AcceptAll;
        assert!(filter.accept_file(Path::new("/a/b.txt")));
        assert!(filter.accept_directory(Path::new("/a/.git")));
    }

    #[test]
    fn test_fn_filter_routes_to_closures() {
        let filter = FnFilter::new(
            |p: &Path| !p.ends_with("target"),
            |p: &Path| p.extension().is_some_and(|e| e == "rs"),
        );

        assert!(filter.accept_directory(Path::new("/project/src")));
        assert!(!filter.accept_directory(Path::new("/project/target")));
        assert!(filter.accept_file(Path::new("/project/src/main.rs")));
        assert!(!filter.accept_file(Path::new("/project/src/main.c")));
    }

    #[test]
    fn test_pattern_filter_hidden() {
        let filter = PatternFilter::new().ignore_hidden(true);

        assert!(!filter.accept_directory(Path::new("/home/user/.cache")));
        assert!(!filter.accept_file(Path::new("/home/user/.bashrc")));
        assert!(filter.accept_file(Path::new("/home/user/notes.md")));
    }

    #[test]
    fn test_pattern_filter_excluded_names() {
        let filter = PatternFilter::new()
            .exclude_dir("target")
            .unwrap()
            .exclude_dir("Videos")
            .unwrap()
            .exclude_file("*.c")
            .unwrap();

        assert!(!filter.accept_directory(Path::new("/home/user/project/target")));
        assert!(!filter.accept_directory(Path::new("/home/user/Videos")));
        assert!(filter.accept_directory(Path::new("/home/user/project/src")));
        assert!(!filter.accept_file(Path::new("/home/user/project/main.c")));
        assert!(filter.accept_file(Path::new("/home/user/project/main.rs")));
    }

    #[test]
    fn test_pattern_filter_full_path_pattern() {
        let filter = PatternFilter::new().exclude_dir("/srv/data/**").unwrap();

        assert!(!filter.accept_directory(Path::new("/srv/data/cache")));
        assert!(filter.accept_directory(Path::new("/srv/www")));
    }

    #[test]
    fn test_pattern_filter_include_files() {
        let filter = PatternFilter::new()
            .include_file("*.rs")
            .unwrap()
            .exclude_file("build.rs")
            .unwrap();

        assert!(filter.accept_file(Path::new("/p/src/lib.rs")));
        assert!(!filter.accept_file(Path::new("/p/build.rs")));
        assert!(!filter.accept_file(Path::new("/p/README.md")));
        // Include patterns only restrict files.
        assert!(filter.accept_directory(Path::new("/p/docs")));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let err = PatternFilter::new().exclude_dir("[").unwrap_err();
        assert!(matches!(err, WatchError::InvalidPattern { .. }));
    }

    #[test]
    fn test_from_config() {
        let config = FilterConfig {
            ignore_hidden: true,
            exclude_dirs: vec!["node_modules".to_string()],
            exclude_files: vec!["*.tmp".to_string()],
            include_files: Vec::new(),
        };

        let filter = PatternFilter::from_config(&config).unwrap();
        assert!(!filter.accept_directory(Path::new("/w/node_modules")));
        assert!(!filter.accept_directory(Path::new("/w/.git")));
        assert!(!filter.accept_file(Path::new("/w/a.tmp")));
        assert!(filter.accept_file(Path::new("/w/a.txt")));
    }
}
