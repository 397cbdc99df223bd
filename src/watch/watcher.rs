// src/watch/watcher.rs

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::paths::glob_base;
use crate::watch::binding::WatchBinding;
use crate::watch::path_utils::collapse_watch_roots;

/// Keeps the underlying `RecommendedWatcher` alive. Dropping the handle
/// stops file watching and closes the event channel.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    roots: Vec<PathBuf>,
}

impl WatcherHandle {
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("roots", &self.roots)
            .finish_non_exhaustive()
    }
}

/// Directories to watch recursively: the existing literal bases of every
/// binding's glob, collapsed. Falls back to `source_root` when no base
/// exists yet.
pub fn watch_roots(project_dir: &Path, source_root: &Path, bindings: &[WatchBinding]) -> Vec<PathBuf> {
    let existing = bindings
        .iter()
        .map(|b| project_dir.join(glob_base(b.pattern())))
        .filter(|dir| dir.is_dir())
        .filter_map(|dir| dir.canonicalize().ok());
    let roots = collapse_watch_roots(existing);
    if !roots.is_empty() {
        return roots;
    }
    source_root.canonicalize().into_iter().collect()
}

/// Start watching `roots` and forward every created, modified, or removed
/// path into `path_tx`.
pub fn spawn_watcher(roots: Vec<PathBuf>, path_tx: mpsc::UnboundedSender<PathBuf>) -> Result<WatcherHandle> {
    if roots.is_empty() {
        bail!("nothing to watch: no watch directory exists");
    }

    // Runs synchronously on notify's thread.
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if !is_content_change(&event.kind) {
                    return;
                }
                for path in event.paths {
                    if path_tx.send(path).is_err() {
                        // Receiver gone: the dispatcher is shutting down.
                        return;
                    }
                }
            }
            Err(err) => {
                warn!(error = %err, "file watch error");
            }
        },
        Config::default(),
    )?;

    for root in &roots {
        match watcher.watch(root, RecursiveMode::Recursive) {
            Ok(()) => info!(root = ?root, "watching"),
            Err(err) => warn!(root = ?root, error = %err, "failed to watch directory"),
        }
    }
    debug!(count = roots.len(), "file watcher started");

    Ok(WatcherHandle {
        _inner: watcher,
        roots,
    })
}

fn is_content_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}
