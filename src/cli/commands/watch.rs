//! Watch command: run a watch tree until Ctrl-C or until the root goes away.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, bail};
use console::style;

use crate::config::Settings;
use crate::watcher::{EventKind, EventObserver, LoopExit, PatternFilter, ResolvedEvent, WatchTree};

/// Observer printing one line per event on stdout.
pub struct PrintObserver {
    json: bool,
}

impl PrintObserver {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    fn format(&self, kind: EventKind, path: &Path) -> String {
        if self.json {
            let event = ResolvedEvent {
                kind,
                path: path.to_path_buf(),
            };
            serde_json::to_string(&event)
                .unwrap_or_else(|e| format!(r#"{{"error":"{e}"}}"#))
        } else {
            let label = format!("{:<8}", kind.as_str());
            let label = match kind {
                EventKind::Created => style(label).green(),
                EventKind::Deleted => style(label).red(),
                _ => style(label).yellow(),
            };
            format!("{label} {}", path.display())
        }
    }

    fn print(&self, kind: EventKind, path: &Path) {
        let line = self.format(kind, path);
        let mut stdout = std::io::stdout().lock();
        // A closed stdout (e.g. piped into `head`) should not kill the loop.
        let _ = writeln!(stdout, "{line}");
        let _ = stdout.flush();
    }
}

impl EventObserver for PrintObserver {
    fn on_created(&mut self, path: &Path) {
        self.print(EventKind::Created, path);
    }

    fn on_deleted(&mut self, path: &Path) {
        self.print(EventKind::Deleted, path);
    }

    fn on_modified(&mut self, path: &Path) {
        self.print(EventKind::Modified, path);
    }
}

/// Set up the watch tree described by `settings` and run it.
///
/// The loop runs on a blocking worker; Ctrl-C stops it cooperatively.
pub async fn run_watch(settings: &Settings, json: bool) -> anyhow::Result<LoopExit> {
    let kinds = settings.event_kinds();
    if kinds.is_empty() {
        bail!("no event kinds selected");
    }

    let root = settings.root()?;
    let filter = PatternFilter::from_config(&settings.filter)?;
    let tree = WatchTree::new(root, settings.watch.recursive, kinds);

    let dispatch = tree
        .setup(PrintObserver::new(json), filter)
        .with_context(|| format!("cannot watch {}", tree.root().display()))?;

    crate::log_event!(
        "watch",
        "watching",
        "{} directories under {}",
        dispatch.registry().len(),
        tree.root().display()
    );

    let stop = dispatch.stop_handle();
    let mut task = tokio::task::spawn_blocking(move || dispatch.run());

    let exit = tokio::select! {
        res = &mut task => res.context("dispatch loop panicked")?,
        _ = tokio::signal::ctrl_c() => {
            crate::debug_event!("watch", "interrupted");
            stop.stop();
            task.await.context("dispatch loop panicked")?
        }
    };

    Ok(exit)
}
