//! A `Stage` that records how it was called instead of transforming files.

use std::ffi::OsString;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use assetflow::config::ConfigFile;
use assetflow::fs::FileSystem;
use assetflow::graph::{Executor, StageBinding, StageSet};
use assetflow::stage::{OutputNaming, Stage, StageError, StageJob, StageResult};
use assetflow::types::{AssetClass, BuildMode};

/// Records invocations and the inputs each one received.
///
/// - `failing()` makes every run report an error.
/// - `panicking()` makes every run panic.
/// - `gated(notify)` holds each run open until `notify.notify_one()`.
/// - `reporting(paths)` lists `paths` as written outputs.
#[derive(Debug)]
pub struct RecordingStage {
    name: String,
    fail: bool,
    panic: bool,
    gate: Option<Arc<Notify>>,
    outputs: Vec<PathBuf>,
    started: Arc<Notify>,
    invocations: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    inputs: Mutex<Vec<Vec<PathBuf>>>,
}

impl RecordingStage {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fail: false,
            panic: false,
            gate: None,
            outputs: Vec::new(),
            started: Arc::new(Notify::new()),
            invocations: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic = true;
        self
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn reporting(mut self, outputs: &[&str]) -> Self {
        self.outputs = outputs.iter().map(PathBuf::from).collect();
        self
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    /// Highest number of runs of this stage that overlapped.
    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// Inputs received by each invocation, in call order.
    pub fn inputs(&self) -> Vec<Vec<PathBuf>> {
        self.inputs.lock().unwrap().clone()
    }

    /// Notified each time a run starts.
    pub fn started(&self) -> Arc<Notify> {
        Arc::clone(&self.started)
    }
}

impl OutputNaming for RecordingStage {
    fn output_name(&self, input: &Path) -> Option<OsString> {
        input.file_name().map(OsString::from)
    }
}

impl Stage for RecordingStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, job: StageJob) -> Pin<Box<dyn Future<Output = StageResult> + Send + '_>> {
        Box::pin(async move {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);

            let seen: Vec<PathBuf> = job.inputs.map(|i| i.source).collect();
            self.inputs.lock().unwrap().push(seen);
            self.started.notify_one();

            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.active.fetch_sub(1, Ordering::SeqCst);

            if self.panic {
                panic!("{} panicked on purpose", self.name);
            }

            let mut result = StageResult::new(&self.name);
            for output in &self.outputs {
                result.record_output(output.clone());
            }
            if self.fail {
                result.record_error(StageError::general(format!("{} failed on purpose", self.name)));
            }
            result
        })
    }
}

/// Executor whose leaves are the given stages, using `cfg`'s path table.
/// Classes without a stage fail when executed.
pub fn executor_with(
    cfg: &ConfigFile,
    fs: Arc<dyn FileSystem>,
    stages: Vec<(AssetClass, Arc<dyn Stage>)>,
) -> Executor {
    let mut set = StageSet::new();
    for (class, stage) in stages {
        set.insert(
            class,
            StageBinding {
                stage,
                paths: cfg.paths().get(class).clone(),
                incremental: cfg.stage(class).effective_incremental(class),
            },
        );
    }
    Executor::new(set, fs, cfg.layout(), BuildMode::Production, cfg.project().workers)
}
