// src/graph/pipeline.rs

use std::sync::Arc;

use anyhow::Result;

use crate::config::ConfigFile;
use crate::fs::FileSystem;
use crate::graph::execute::{Executor, StageBinding, StageSet};
use crate::graph::{topology, RunReport, TaskNode};
use crate::stage::{CommandStage, Stage};
use crate::types::{AssetClass, BuildMode};

/// The build tree plus an executor wired to the configured stages.
#[derive(Debug, Clone)]
pub struct Pipeline {
    root: TaskNode,
    executor: Executor,
}

impl Pipeline {
    /// Assemble the standard pipeline. `mode` decides whether stages use
    /// their development commands.
    pub fn assemble(cfg: &ConfigFile, mode: BuildMode, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let mut stages = StageSet::new();
        for class in AssetClass::ALL {
            let stage_cfg = cfg.stage(class);
            let stage: Arc<dyn Stage> =
                Arc::new(CommandStage::from_config(class, stage_cfg, Arc::clone(&fs))?);
            stages.insert(
                class,
                StageBinding {
                    stage,
                    paths: cfg.paths().get(class).clone(),
                    incremental: stage_cfg.effective_incremental(class),
                },
            );
        }

        let executor = Executor::new(stages, fs, cfg.layout(), mode, cfg.project().workers);
        Ok(Self::from_parts(topology::full_build(), executor))
    }

    pub fn from_parts(root: TaskNode, executor: Executor) -> Self {
        Self { root, executor }
    }

    pub fn root(&self) -> &TaskNode {
        &self.root
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Run the whole tree once.
    pub async fn run(&self) -> RunReport {
        self.executor.execute(&self.root).await
    }
}
