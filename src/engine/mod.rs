// src/engine/mod.rs

//! Orchestration for the three run modes.
//!
//! - [`run_lock`]: per-target coalescing state machine used by watch mode.
//! - [`runtime`]: one-shot build, development session, and preview-only
//!   entry points.

pub mod run_lock;
pub mod runtime;

pub use run_lock::{Admission, Completion, RunLock};
pub use runtime::{run_build, run_development, run_preview};
