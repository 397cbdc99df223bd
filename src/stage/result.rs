// src/stage/result.rs

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// A failure recorded by a stage, optionally tied to the input that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageError {
    pub input: Option<PathBuf>,
    pub message: String,
}

impl StageError {
    pub fn for_input(input: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            input: Some(input.into()),
            message: message.into(),
        }
    }

    pub fn general(message: impl Into<String>) -> Self {
        Self {
            input: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.input {
            Some(input) => write!(f, "{}: {}", input.display(), self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Outcome of one stage invocation.
///
/// `succeeded` is kept in sync with `errors`: recording an error flips it to
/// false. `outputs_written` only lists files whose bytes changed on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageResult {
    pub stage: String,
    pub succeeded: bool,
    pub errors: Vec<StageError>,
    pub outputs_written: BTreeSet<PathBuf>,
}

impl StageResult {
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            succeeded: true,
            errors: Vec::new(),
            outputs_written: BTreeSet::new(),
        }
    }

    /// A result that failed before processing any input.
    pub fn failed(stage: impl Into<String>, error: StageError) -> Self {
        let mut result = Self::new(stage);
        result.record_error(error);
        result
    }

    pub fn record_output(&mut self, path: impl Into<PathBuf>) {
        self.outputs_written.insert(path.into());
    }

    pub fn record_error(&mut self, error: StageError) {
        self.succeeded = false;
        self.errors.push(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_an_error_fails_the_result() {
        let mut result = StageResult::new("images");
        result.record_output("dist/images/a.webp");
        assert!(result.succeeded);

        result.record_error(StageError::for_input("src/images/b.png", "cwebp exited with 1"));
        assert!(!result.succeeded);
        assert_eq!(result.outputs_written.len(), 1);
        assert_eq!(
            result.errors[0].to_string(),
            "src/images/b.png: cwebp exited with 1"
        );
    }
}
