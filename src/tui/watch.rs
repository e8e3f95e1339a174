use std::path::Path;
use std::sync::mpsc::{self, Receiver};

use anyhow::{Context, Result};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};

/// Change notifications for the `app_data/` directory.
///
/// JSON stores are replaced by rename and SQLite writes its WAL beside the
/// database, so the directory is watched rather than single files. Reads
/// (access events) are ignored so the dashboard's own reloads don't wake it.
pub struct DirWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<()>,
}

impl DirWatcher {
    pub fn new(dir: &Path) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                if !event.kind.is_access() {
                    let _ = tx.send(());
                }
            }
        })
        .context("failed to create file watcher")?;
        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {}", dir.display()))?;
        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    /// True when anything changed since the last call. Never blocks; a burst
    /// of events counts once.
    pub fn changed(&self) -> bool {
        let mut any = false;
        while self.rx.try_recv().is_ok() {
            any = true;
        }
        any
    }
}
