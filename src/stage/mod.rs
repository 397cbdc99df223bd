// src/stage/mod.rs

//! Transform stages.
//!
//! A stage turns a lazy sequence of inputs into outputs under a destination
//! directory. The engine only talks to the [`Stage`] trait; production code
//! uses [`CommandStage`], tests plug in their own implementations.

use std::ffi::OsString;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use crate::config::Layout;
use crate::types::BuildMode;

pub mod command;
pub mod inputs;
pub mod result;
pub mod template;

pub use command::CommandStage;
pub use inputs::collect_inputs;
pub use result::{StageError, StageResult};

/// One source file and the directory its output goes to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Input {
    pub source: PathBuf,
    pub dest_dir: PathBuf,
}

/// Inputs are pulled one at a time so staleness checks can run lazily.
pub type Inputs = Box<dyn Iterator<Item = Input> + Send>;

/// Everything a stage needs for one invocation.
pub struct StageJob {
    pub inputs: Inputs,
    pub mode: BuildMode,
    pub layout: Arc<Layout>,
}

impl fmt::Debug for StageJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageJob")
            .field("mode", &self.mode)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

/// Maps an input file to the name of the output it produces.
pub trait OutputNaming: Send + Sync {
    /// `None` if the input has no usable file name.
    fn output_name(&self, input: &Path) -> Option<OsString>;
}

/// A build stage for one asset class.
///
/// Implementations must not abort on a single bad input: record the error in
/// the result and carry on with the next one.
pub trait Stage: OutputNaming {
    fn name(&self) -> &str;

    fn run(&self, job: StageJob) -> Pin<Box<dyn Future<Output = StageResult> + Send + '_>>;
}

/// Hidden sibling a stage writes to before the output is committed.
pub fn staged_path(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    output.with_file_name(format!(".{name}.assetflow-tmp"))
}
