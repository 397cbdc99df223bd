// src/watch/dispatch.rs

//! Turns changed paths into coalesced re-runs of watch targets.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::engine::{Admission, Completion, RunLock};
use crate::graph::{Executor, RunReport, TaskNode};
use crate::watch::binding::{targets_for, WatchBinding};
use crate::watch::path_utils::relative_str;

/// Sent once per finished watch-triggered run.
#[derive(Debug, Clone)]
pub struct RunCompleted {
    pub target: TaskNode,
    pub trigger: PathBuf,
    pub report: RunReport,
}

/// Owns the run locks and the in-flight run drivers.
///
/// `handle_path` only performs lock transitions and spawns; it never waits
/// for a run.
pub struct Dispatcher {
    project_dir: PathBuf,
    bindings: Vec<WatchBinding>,
    executor: Executor,
    locks: HashMap<String, Arc<RunLock>>,
    drivers: JoinSet<()>,
    completed_tx: mpsc::UnboundedSender<RunCompleted>,
    stopping: Arc<AtomicBool>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("project_dir", &self.project_dir)
            .field("bindings", &self.bindings)
            .field("in_flight", &self.drivers.len())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(
        project_dir: &Path,
        bindings: Vec<WatchBinding>,
        executor: Executor,
        completed_tx: mpsc::UnboundedSender<RunCompleted>,
    ) -> Self {
        // Watcher events carry canonical paths.
        let project_dir = project_dir
            .canonicalize()
            .unwrap_or_else(|_| project_dir.to_path_buf());

        Self {
            project_dir,
            bindings,
            executor,
            locks: HashMap::new(),
            drivers: JoinSet::new(),
            completed_tx,
            stopping: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Number of runs (including owed follow-ups) still being driven.
    pub fn in_flight(&self) -> usize {
        self.drivers.len()
    }

    /// Route one changed path to its targets. Returns what happened to each.
    pub fn handle_path(&mut self, path: &Path) -> Vec<(TaskNode, Admission)> {
        if self.stopping.load(Ordering::SeqCst) {
            return Vec::new();
        }
        let Some(rel) = relative_str(&self.project_dir, path) else {
            debug!(path = ?path, "change outside project directory; ignored");
            return Vec::new();
        };

        let targets = targets_for(&self.bindings, &rel);
        if targets.is_empty() {
            debug!(path = %rel, "no binding matches");
        }

        let mut outcomes = Vec::with_capacity(targets.len());
        for target in targets {
            let label = target.label();
            let lock = Arc::clone(self.locks.entry(label.clone()).or_default());
            let admission = lock.try_acquire(PathBuf::from(&rel));

            if admission == Admission::Started {
                info!(target = %label, trigger = %rel, "change detected; running");
                self.drivers.spawn(drive(
                    self.executor.clone(),
                    target.clone(),
                    lock,
                    PathBuf::from(&rel),
                    self.completed_tx.clone(),
                    Arc::clone(&self.stopping),
                ));
            }
            outcomes.push((target, admission));
        }
        outcomes
    }

    /// Consume paths until the channel closes or `shutdown` flips to true,
    /// then wait for in-flight runs.
    pub async fn run(
        mut self,
        mut paths: mpsc::UnboundedReceiver<PathBuf>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("shutdown requested; no longer accepting changes");
                        break;
                    }
                }
                path = paths.recv() => match path {
                    Some(path) => {
                        self.handle_path(&path);
                    }
                    None => {
                        debug!("watch channel closed");
                        break;
                    }
                },
                Some(joined) = self.drivers.join_next(), if !self.drivers.is_empty() => {
                    if let Err(err) = joined {
                        error!(error = %err, "run driver failed");
                    }
                }
            }
        }

        self.drain().await;
    }

    /// Suppress owed follow-ups and wait for in-flight runs to finish.
    pub async fn drain(mut self) {
        self.stopping.store(true, Ordering::SeqCst);
        let in_flight = self.drivers.len();
        if in_flight > 0 {
            info!(in_flight, "waiting for in-flight runs");
        }
        while let Some(joined) = self.drivers.join_next().await {
            if let Err(err) = joined {
                error!(error = %err, "run driver failed");
            }
        }
    }
}

/// Run `target` until its lock has no follow-up owed.
async fn drive(
    executor: Executor,
    target: TaskNode,
    lock: Arc<RunLock>,
    mut trigger: PathBuf,
    completed_tx: mpsc::UnboundedSender<RunCompleted>,
    stopping: Arc<AtomicBool>,
) {
    loop {
        let report = executor.execute(&target).await;

        for failed in report.failures() {
            for err in &failed.errors {
                warn!(
                    trigger = ?trigger,
                    target = %target,
                    stage = %failed.stage,
                    error = %err,
                    "watch-triggered run failed"
                );
            }
        }

        let _ = completed_tx.send(RunCompleted {
            target: target.clone(),
            trigger: trigger.clone(),
            report,
        });

        if stopping.load(Ordering::SeqCst) {
            if lock.release() {
                debug!(target = %target, "follow-up suppressed by shutdown");
            }
            return;
        }

        match lock.finish() {
            Completion::RunAgain(next) => {
                info!(target = %target, trigger = ?next, "running queued follow-up");
                trigger = next;
            }
            Completion::Released => return,
        }
    }
}
