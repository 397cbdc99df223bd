// src/graph/clean.rs

use std::path::Path;

use tracing::info;

use crate::fs::FileSystem;
use crate::stage::{StageError, StageResult};

pub const CLEAN_STAGE: &str = "clean";

/// Recursively delete the output root. A missing root is not an error.
pub fn clean_output(fs: &dyn FileSystem, output_root: &Path) -> StageResult {
    let mut result = StageResult::new(CLEAN_STAGE);
    if !fs.exists(output_root) {
        info!(output_root = ?output_root, "nothing to clean");
        return result;
    }

    match fs.remove_dir_all(output_root) {
        Ok(()) => info!(output_root = ?output_root, "output cleaned"),
        Err(err) => result.record_error(StageError::general(format!("{err:#}"))),
    }
    result
}
