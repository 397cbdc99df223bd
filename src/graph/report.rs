// src/graph/report.rs

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::stage::StageResult;

/// Results of every leaf that ran while executing a node, in completion
/// order for sequences and declaration order for parallel children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub results: Vec<StageResult>,
}

impl RunReport {
    pub fn single(result: StageResult) -> Self {
        Self {
            results: vec![result],
        }
    }

    pub fn extend(&mut self, other: RunReport) {
        self.results.extend(other.results);
    }

    pub fn succeeded(&self) -> bool {
        self.results.iter().all(|r| r.succeeded)
    }

    pub fn failures(&self) -> impl Iterator<Item = &StageResult> {
        self.results.iter().filter(|r| !r.succeeded)
    }

    /// Union of all outputs written by every stage in the report.
    pub fn outputs_written(&self) -> BTreeSet<PathBuf> {
        self.results
            .iter()
            .flat_map(|r| r.outputs_written.iter().cloned())
            .collect()
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.stage.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::StageError;

    #[test]
    fn any_failed_result_fails_the_report() {
        let mut report = RunReport::single(StageResult::new("fonts"));
        assert!(report.succeeded());

        report.extend(RunReport::single(StageResult::failed(
            "images",
            StageError::general("boom"),
        )));
        assert!(!report.succeeded());
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.stage_names(), vec!["fonts", "images"]);
    }
}
