#![allow(dead_code)]

use std::path::PathBuf;

use assetflow::config::{ConfigFile, PathSpecConfig, RawConfigFile, RuleConfig, StageConfig};
use assetflow::types::AssetClass;

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the built-in path table, but with every stage reduced to
/// plain copies so tests never depend on external tools.
pub struct ConfigFileBuilder {
    raw: RawConfigFile,
    project_dir: PathBuf,
}

impl ConfigFileBuilder {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        let mut raw = RawConfigFile::default();
        for class in AssetClass::ALL {
            raw.stage.set(class, StageConfig::default());
        }
        Self {
            raw,
            project_dir: project_dir.into(),
        }
    }

    pub fn with_paths(mut self, class: AssetClass, source: &str, dest: &str, watch: &str) -> Self {
        self.raw.paths.set(
            class,
            PathSpecConfig {
                source: source.to_string(),
                dest: PathBuf::from(dest),
                watch: watch.to_string(),
            },
        );
        self
    }

    pub fn with_rule(mut self, class: AssetClass, rule: RuleConfig) -> Self {
        let mut stage = self.raw.stage.effective(class);
        stage.rules.push(rule);
        self.raw.stage.set(class, stage);
        self
    }

    pub fn incremental(mut self, class: AssetClass, incremental: bool) -> Self {
        let mut stage = self.raw.stage.effective(class);
        stage.incremental = Some(incremental);
        self.raw.stage.set(class, stage);
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.raw.project.workers = workers;
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.raw)
            .expect("Failed to build valid config from builder")
            .with_project_dir(self.project_dir)
    }
}

/// Builder for a copy-or-command `RuleConfig`.
pub struct RuleBuilder {
    rule: RuleConfig,
}

impl RuleBuilder {
    pub fn new(extensions: &[&str]) -> Self {
        Self {
            rule: RuleConfig {
                extensions: extensions.iter().map(|e| e.to_string()).collect(),
                ..RuleConfig::default()
            },
        }
    }

    pub fn cmd(mut self, cmd: &str) -> Self {
        self.rule.cmd = Some(cmd.to_string());
        self
    }

    pub fn extension(mut self, ext: &str) -> Self {
        self.rule.extension = Some(ext.to_string());
        self
    }

    pub fn suffix(mut self, suffix: &str) -> Self {
        self.rule.suffix = suffix.to_string();
        self
    }

    pub fn build(self) -> RuleConfig {
        self.rule
    }
}
