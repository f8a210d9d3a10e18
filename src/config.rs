//! Configuration module for treewatch.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides (applied by the caller)
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `TREEWATCH_` and use double
//! underscores to separate nested levels:
//! - `TREEWATCH_WATCH__RECURSIVE=false` sets `watch.recursive`
//! - `TREEWATCH_FILTER__IGNORE_HIDDEN=false` sets `filter.ignore_hidden`
//! - `TREEWATCH_LOGGING__DEFAULT=debug` sets `logging.default`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::watcher::{EventKinds, WatchError};

/// Directory holding the settings file.
pub const CONFIG_DIR: &str = ".treewatch";
/// Settings file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "settings.toml";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// What to watch
    #[serde(default)]
    pub watch: WatchConfig,

    /// Which paths get watched and reported
    #[serde(default)]
    pub filter: FilterConfig,

    /// Log levels
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WatchConfig {
    /// Root directory (defaults to the current directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// Watch subdirectories, including ones created later
    #[serde(default = "default_true")]
    pub recursive: bool,

    /// Event kinds to report
    #[serde(default = "default_events")]
    pub events: Vec<EventSelector>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FilterConfig {
    /// Skip entries whose name starts with a dot
    #[serde(default = "default_true")]
    pub ignore_hidden: bool,

    /// Directories never watched (glob, matched on name or full path)
    #[serde(default)]
    pub exclude_dirs: Vec<String>,

    /// Files never reported
    #[serde(default)]
    pub exclude_files: Vec<String>,

    /// When non-empty, only matching files are reported
    #[serde(default)]
    pub include_files: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default level for all modules
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `treewatch = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

/// An event kind as written in configuration and on the command line.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EventSelector {
    Create,
    Delete,
    Modify,
}

impl EventSelector {
    /// Combine selectors into a kind set.
    pub fn to_kinds(selectors: &[EventSelector]) -> EventKinds {
        selectors
            .iter()
            .fold(EventKinds::empty(), |kinds, selector| {
                kinds
                    | match selector {
                        EventSelector::Create => EventKinds::CREATED,
                        EventSelector::Delete => EventKinds::DELETED,
                        EventSelector::Modify => EventKinds::MODIFIED,
                    }
            })
    }
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_true() -> bool {
    true
}
fn default_events() -> Vec<EventSelector> {
    vec![
        EventSelector::Create,
        EventSelector::Delete,
        EventSelector::Modify,
    ]
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            watch: WatchConfig::default(),
            filter: FilterConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            root: None,
            recursive: true,
            events: default_events(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            ignore_hidden: true,
            exclude_dirs: vec![
                "target".to_string(),
                "node_modules".to_string(),
                ".git".to_string(),
            ],
            exclude_files: Vec::new(),
            include_files: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources.
    ///
    /// Uses the nearest `.treewatch/settings.toml` found from the current
    /// directory upwards, if any.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));
        Self::load_from(config_path)
    }

    /// Load configuration from a specific file, then environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nested levels; single underscores
            // stay part of the field name.
            .merge(Env::prefixed("TREEWATCH_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Find `.treewatch/settings.toml` from the current directory upwards.
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .map(|ancestor| ancestor.join(CONFIG_DIR))
            .find(|dir| dir.is_dir())
            .map(|dir| dir.join(CONFIG_FILE))
    }

    /// Selected event kinds as a set.
    pub fn event_kinds(&self) -> EventKinds {
        EventSelector::to_kinds(&self.watch.events)
    }

    /// Root to watch: configured root or the current directory.
    pub fn root(&self) -> Result<PathBuf, WatchError> {
        match &self.watch.root {
            Some(root) => Ok(root.clone()),
            None => std::env::current_dir().map_err(|e| WatchError::Config {
                reason: format!("cannot determine current directory: {e}"),
            }),
        }
    }

    /// Save current configuration to file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), WatchError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| WatchError::Config {
                reason: format!("cannot create {}: {e}", parent.display()),
            })?;
        }

        let toml_string = toml::to_string_pretty(self).map_err(|e| WatchError::Config {
            reason: e.to_string(),
        })?;
        std::fs::write(path, toml_string).map_err(|e| WatchError::Config {
            reason: format!("cannot write {}: {e}", path.display()),
        })
    }

    /// Create a default settings file under `dir`.
    pub fn init_config_file(dir: &Path, force: bool) -> Result<PathBuf, WatchError> {
        let config_path = dir.join(CONFIG_DIR).join(CONFIG_FILE);

        if !force && config_path.exists() {
            return Err(WatchError::Config {
                reason: format!(
                    "configuration file already exists at {}, use --force to overwrite",
                    config_path.display()
                ),
            });
        }

        Settings::default().save(&config_path)?;
        Ok(config_path)
    }
}
