// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile, StageConfig};
use crate::config::paths::{normalize, overlaps, PathSpec, PathTable};
use crate::errors::{AssetflowError, Result};
use crate::stage::template::CommandTemplate;
use crate::types::AssetClass;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = AssetflowError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_project(&raw)?;
        let paths = compile_paths(&raw)?;
        validate_destinations(&raw, &paths)?;
        let stages = validate_stages(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.project, raw.serve, paths, stages))
    }
}

fn validate_project(cfg: &RawConfigFile) -> Result<()> {
    if cfg.project.workers == 0 {
        return Err(AssetflowError::ConfigError(
            "[project].workers must be >= 1 (got 0)".to_string(),
        ));
    }

    let source = &cfg.project.source_root;
    let output = &cfg.project.output_root;
    if normalize(output).as_os_str().is_empty() {
        return Err(AssetflowError::ConfigError(
            "[project].output_root must not be the project directory itself".to_string(),
        ));
    }
    if overlaps(source, output) {
        return Err(AssetflowError::ConfigError(format!(
            "[project].output_root {:?} must not alias or nest with source_root {:?}",
            output, source
        )));
    }

    Ok(())
}

fn compile_paths(cfg: &RawConfigFile) -> Result<PathTable> {
    let mut specs = Vec::with_capacity(AssetClass::ALL.len());
    for class in AssetClass::ALL {
        let raw = cfg.paths.effective(class);
        let spec = PathSpec::compile(class, &raw)
            .map_err(|e| AssetflowError::ConfigError(format!("[paths.{class}]: {e:#}")))?;
        specs.push(spec);
    }
    Ok(PathTable::new(specs))
}

/// Every stage writes inside the output root, and no two stages share a
/// destination directory.
fn validate_destinations(cfg: &RawConfigFile, paths: &PathTable) -> Result<()> {
    let output_root = normalize(&cfg.project.output_root);

    for spec in paths.iter() {
        let dest = normalize(spec.dest());
        if !dest.starts_with(&output_root) {
            return Err(AssetflowError::ConfigError(format!(
                "[paths.{}].dest {:?} is outside output_root {:?}",
                spec.class(),
                spec.dest(),
                cfg.project.output_root
            )));
        }
    }

    let specs: Vec<&PathSpec> = paths.iter().collect();
    for (i, a) in specs.iter().enumerate() {
        for b in &specs[i + 1..] {
            if normalize(a.dest()) == normalize(b.dest()) {
                return Err(AssetflowError::ConfigError(format!(
                    "[paths.{}] and [paths.{}] share the destination {:?}",
                    a.class(),
                    b.class(),
                    a.dest()
                )));
            }
        }
    }

    Ok(())
}

fn validate_stages(cfg: &RawConfigFile) -> Result<Vec<StageConfig>> {
    let mut stages = Vec::with_capacity(AssetClass::ALL.len());
    for class in AssetClass::ALL {
        let stage = cfg.stage.effective(class);
        for (i, rule) in stage.rules.iter().enumerate() {
            for cmd in rule.cmd.iter().chain(rule.dev_cmd.iter()) {
                CommandTemplate::parse(cmd).map_err(|e| {
                    AssetflowError::ConfigError(format!("[stage.{class}] rule {}: {e}", i + 1))
                })?;
            }
            if rule.cmd.is_none() && rule.dev_cmd.is_some() {
                return Err(AssetflowError::ConfigError(format!(
                    "[stage.{class}] rule {}: dev_cmd requires cmd",
                    i + 1
                )));
            }
        }
        stages.push(stage);
    }
    Ok(stages)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::config::model::{PathSpecConfig, RuleConfig};

    #[test]
    fn defaults_are_valid() {
        let cfg = ConfigFile::try_from(RawConfigFile::default()).unwrap();
        assert_eq!(cfg.paths().get(AssetClass::Styles).dest(), PathBuf::from("dist/styles/"));
        assert!(cfg.stage(AssetClass::Images).effective_incremental(AssetClass::Images));
        assert!(!cfg.stage(AssetClass::Markup).effective_incremental(AssetClass::Markup));
    }

    #[test]
    fn rejects_output_root_nested_in_source_root() {
        let mut raw = RawConfigFile::default();
        raw.project.output_root = PathBuf::from("src/dist");
        let err = ConfigFile::try_from(raw).unwrap_err();
        assert!(err.to_string().contains("must not alias"), "{err}");
    }

    #[test]
    fn rejects_zero_workers() {
        let mut raw = RawConfigFile::default();
        raw.project.workers = 0;
        assert!(ConfigFile::try_from(raw).is_err());
    }

    #[test]
    fn rejects_destination_outside_output_root() {
        let mut raw = RawConfigFile::default();
        raw.paths.set(
            AssetClass::Fonts,
            PathSpecConfig {
                source: "src/fonts/*.ttf".into(),
                dest: "public/fonts".into(),
                watch: "src/fonts/*.ttf".into(),
            },
        );
        let err = ConfigFile::try_from(raw).unwrap_err();
        assert!(err.to_string().contains("outside output_root"), "{err}");
    }

    #[test]
    fn rejects_shared_destinations() {
        let mut raw = RawConfigFile::default();
        raw.paths.set(
            AssetClass::Fonts,
            PathSpecConfig {
                source: "src/fonts/*.ttf".into(),
                dest: "./dist/images".into(),
                watch: "src/fonts/*.ttf".into(),
            },
        );
        let err = ConfigFile::try_from(raw).unwrap_err();
        assert!(err.to_string().contains("share the destination"), "{err}");
    }

    #[test]
    fn rejects_command_without_output() {
        let mut raw = RawConfigFile::default();
        raw.stage.set(
            AssetClass::Scripts,
            StageConfig {
                incremental: None,
                rules: vec![RuleConfig {
                    cmd: Some("esbuild {input}".into()),
                    ..RuleConfig::default()
                }],
            },
        );
        let err = ConfigFile::try_from(raw).unwrap_err();
        assert!(err.to_string().contains("[stage.scripts] rule 1"), "{err}");
    }
}
