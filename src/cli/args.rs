//! CLI argument parsing using clap.
//!
//! Contains the Cli struct, Commands enum, and the watch arguments.

use clap::{
    Args, Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

use crate::config::{EventSelector, Settings};

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Recursive directory-tree watcher
#[derive(Parser)]
#[command(
    name = "treewatch",
    version = env!("CARGO_PKG_VERSION"),
    about = "Watch a directory tree for changes",
    long_about = "Watch a directory tree for created, deleted and modified entries, \
                  following new subdirectories as they appear.",
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Initialize configuration
    #[command(about = "Set up .treewatch directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings")]
    Config,

    /// Watch a directory tree and print events
    #[command(
        about = "Watch a directory tree and print events",
        after_help = "Examples:\n  treewatch watch\n  treewatch watch src --events create,delete\n  treewatch watch . --exclude-dir build --exclude-file '*.swp' --json"
    )]
    Watch(WatchArgs),
}

/// Arguments of the watch command. Each one overrides the loaded settings.
#[derive(Args, Debug, Clone, Default)]
pub struct WatchArgs {
    /// Directory to watch (defaults to the configured root or the current directory)
    #[arg(value_name = "ROOT")]
    pub root: Option<PathBuf>,

    /// Watch only the root, not its subdirectories
    #[arg(long)]
    pub no_recursive: bool,

    /// Event kinds to report
    #[arg(long, value_enum, value_delimiter = ',')]
    pub events: Option<Vec<EventSelector>>,

    /// Directory glob never watched (repeatable, added to configured ones)
    #[arg(long, value_name = "GLOB")]
    pub exclude_dir: Vec<String>,

    /// File glob never reported (repeatable, added to configured ones)
    #[arg(long, value_name = "GLOB")]
    pub exclude_file: Vec<String>,

    /// Only report files matching this glob (repeatable)
    #[arg(long, value_name = "GLOB")]
    pub include_file: Vec<String>,

    /// Also watch and report hidden entries
    #[arg(long)]
    pub include_hidden: bool,

    /// Print one JSON object per event
    #[arg(long)]
    pub json: bool,
}

impl WatchArgs {
    /// Layer command-line overrides on top of loaded settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(root) = &self.root {
            settings.watch.root = Some(root.clone());
        }
        if self.no_recursive {
            settings.watch.recursive = false;
        }
        if let Some(events) = &self.events {
            settings.watch.events = events.clone();
        }
        if self.include_hidden {
            settings.filter.ignore_hidden = false;
        }
        settings
            .filter
            .exclude_dirs
            .extend(self.exclude_dir.iter().cloned());
        settings
            .filter
            .exclude_files
            .extend(self.exclude_file.iter().cloned());
        settings
            .filter
            .include_files
            .extend(self.include_file.iter().cloned());
    }
}
