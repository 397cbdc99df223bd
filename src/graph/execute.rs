// src/graph/execute.rs

//! Executes a [`TaskNode`] tree.
//!
//! Sequences run children one after another and stop at the first failure.
//! Parallel children are spawned onto the Tokio runtime and always awaited in
//! full; a child that panics becomes a failed result. Leaf invocations share
//! a worker semaphore and a per-class mutex, so the same stage never runs
//! twice at once even when two watch targets overlap.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, error, info, trace};

use crate::config::{Layout, PathSpec};
use crate::freshness::StalenessOracle;
use crate::fs::FileSystem;
use crate::graph::clean::clean_output;
use crate::graph::{RunReport, TaskNode};
use crate::stage::{collect_inputs, Inputs, Stage, StageError, StageJob, StageResult};
use crate::types::{AssetClass, BuildMode};

/// A stage plus what the executor needs to feed it.
#[derive(Clone)]
pub struct StageBinding {
    pub stage: Arc<dyn Stage>,
    pub paths: PathSpec,
    pub incremental: bool,
}

impl fmt::Debug for StageBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageBinding")
            .field("stage", &self.stage.name())
            .field("paths", &self.paths)
            .field("incremental", &self.incremental)
            .finish()
    }
}

/// Stage bindings keyed by asset class.
#[derive(Debug, Clone, Default)]
pub struct StageSet {
    bindings: HashMap<AssetClass, StageBinding>,
}

impl StageSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, class: AssetClass, binding: StageBinding) {
        self.bindings.insert(class, binding);
    }

    pub fn get(&self, class: AssetClass) -> Option<&StageBinding> {
        self.bindings.get(&class)
    }
}

/// Cheaply cloneable handle; clones share the worker pool and leaf guards.
#[derive(Clone)]
pub struct Executor {
    inner: Arc<ExecutorInner>,
}

struct ExecutorInner {
    stages: StageSet,
    fs: Arc<dyn FileSystem>,
    layout: Arc<Layout>,
    mode: BuildMode,
    workers: Semaphore,
    leaf_guards: HashMap<AssetClass, Mutex<()>>,
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("layout", &self.inner.layout)
            .field("mode", &self.inner.mode)
            .field("workers", &self.inner.workers.available_permits())
            .finish_non_exhaustive()
    }
}

impl Executor {
    pub fn new(
        stages: StageSet,
        fs: Arc<dyn FileSystem>,
        layout: Layout,
        mode: BuildMode,
        workers: usize,
    ) -> Self {
        let leaf_guards = AssetClass::ALL
            .into_iter()
            .map(|class| (class, Mutex::new(())))
            .collect();

        Self {
            inner: Arc::new(ExecutorInner {
                stages,
                fs,
                layout: Arc::new(layout),
                mode,
                workers: Semaphore::new(workers.max(1)),
                leaf_guards,
            }),
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.inner.layout
    }

    pub fn mode(&self) -> BuildMode {
        self.inner.mode
    }

    /// Execute `node` and everything below it.
    pub fn execute<'a>(
        &'a self,
        node: &'a TaskNode,
    ) -> Pin<Box<dyn Future<Output = RunReport> + Send + 'a>> {
        Box::pin(async move {
            match node {
                TaskNode::Clean => RunReport::single(clean_output(
                    self.inner.fs.as_ref(),
                    &self.inner.layout.output_root,
                )),
                TaskNode::Leaf(class) => RunReport::single(self.run_leaf(*class).await),
                TaskNode::Sequence(children) => self.run_sequence(children).await,
                TaskNode::Parallel(children) => self.run_parallel(children).await,
            }
        })
    }

    async fn run_sequence(&self, children: &[TaskNode]) -> RunReport {
        let mut report = RunReport::default();
        for (i, child) in children.iter().enumerate() {
            let child_report = self.execute(child).await;
            let failed = !child_report.succeeded();
            report.extend(child_report);
            if failed {
                let skipped: Vec<String> = children[i + 1..].iter().map(TaskNode::label).collect();
                info!(failed = %child, ?skipped, "sequence stopped after failure");
                break;
            }
        }
        report
    }

    async fn run_parallel(&self, children: &[TaskNode]) -> RunReport {
        let handles: Vec<_> = children
            .iter()
            .map(|child| {
                let executor = self.clone();
                let child = child.clone();
                tokio::spawn(async move { executor.execute(&child).await })
            })
            .collect();

        // Every child is already running; awaiting in order only fixes the
        // order of results.
        let mut report = RunReport::default();
        for (child, handle) in children.iter().zip(handles) {
            match handle.await {
                Ok(child_report) => report.extend(child_report),
                Err(err) => {
                    error!(child = %child, error = %err, "parallel child panicked");
                    report.extend(RunReport::single(StageResult::failed(
                        child.label(),
                        StageError::general(format!("task panicked: {err}")),
                    )));
                }
            }
        }
        report
    }

    async fn run_leaf(&self, class: AssetClass) -> StageResult {
        let Some(binding) = self.inner.stages.get(class) else {
            return StageResult::failed(
                class.as_str(),
                StageError::general(format!("no stage configured for {class}")),
            );
        };
        let name = binding.stage.name().to_string();

        let _guard = match self.inner.leaf_guards.get(&class) {
            Some(guard) => Some(guard.lock().await),
            None => None,
        };

        let _permit = match self.inner.workers.acquire().await {
            Ok(permit) => permit,
            Err(err) => {
                return StageResult::failed(name, StageError::general(format!("worker pool closed: {err}")));
            }
        };

        let fs = Arc::clone(&self.inner.fs);
        let inputs = match collect_inputs(fs.as_ref(), &self.inner.layout, &binding.paths) {
            Ok(inputs) => inputs,
            Err(err) => {
                return StageResult::failed(
                    name,
                    StageError::general(format!("collecting inputs: {err:#}")),
                );
            }
        };
        debug!(stage = %name, candidates = inputs.len(), incremental = binding.incremental, "running stage");

        let inputs: Inputs = if binding.incremental {
            let oracle = StalenessOracle::new(fs, Arc::clone(&binding.stage));
            Box::new(inputs.into_iter().filter(move |input| {
                let stale = oracle.is_stale_input(input);
                if !stale {
                    trace!(input = ?input.source, "output up to date; skipping");
                }
                stale
            }))
        } else {
            Box::new(inputs.into_iter())
        };

        binding
            .stage
            .run(StageJob {
                inputs,
                mode: self.inner.mode,
                layout: Arc::clone(&self.inner.layout),
            })
            .await
    }
}
