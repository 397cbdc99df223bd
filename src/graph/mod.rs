// src/graph/mod.rs

//! The build tree and its execution.
//!
//! - [`node`]: the `TaskNode` enum and its labels.
//! - [`topology`]: the fixed shape of the build and the watch sub-trees.
//! - [`execute`]: the async executor (worker pool, per-class guards).
//! - [`pipeline`]: assembly from configuration.

pub mod clean;
pub mod execute;
pub mod node;
pub mod pipeline;
pub mod report;
pub mod topology;

pub use execute::{Executor, StageBinding, StageSet};
pub use node::TaskNode;
pub use pipeline::Pipeline;
pub use report::RunReport;
