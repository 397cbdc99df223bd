// src/watch/binding.rs

use std::fmt;

use anyhow::{Context, Result};
use globset::GlobMatcher;

use crate::config::paths::path_glob;
use crate::config::PathTable;
use crate::graph::{topology, TaskNode};
use crate::types::AssetClass;

/// A watch glob and the sub-tree it reruns.
#[derive(Clone)]
pub struct WatchBinding {
    class: AssetClass,
    pattern: String,
    matcher: GlobMatcher,
    target: TaskNode,
}

impl fmt::Debug for WatchBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchBinding")
            .field("pattern", &self.pattern)
            .field("target", &self.target.label())
            .finish_non_exhaustive()
    }
}

impl WatchBinding {
    pub fn new(class: AssetClass, pattern: &str, target: TaskNode) -> Result<Self> {
        let matcher = path_glob(pattern)
            .with_context(|| format!("invalid watch glob for {class}: {pattern}"))?
            .compile_matcher();
        Ok(Self {
            class,
            pattern: pattern.to_string(),
            matcher,
            target,
        })
    }

    pub fn class(&self) -> AssetClass {
        self.class
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn target(&self) -> &TaskNode {
        &self.target
    }

    /// `rel_path` is relative to the project directory, with forward slashes.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.matcher.is_match(rel_path)
    }
}

/// One binding per asset class, using each class's watch glob.
pub fn build_bindings(paths: &PathTable) -> Result<Vec<WatchBinding>> {
    paths
        .iter()
        .map(|spec| WatchBinding::new(spec.class(), spec.watch(), topology::watch_target(spec.class())))
        .collect()
}

/// Targets to run for a changed path.
///
/// When a path matches several bindings, a target that is contained in
/// another matched target is dropped, so only the outermost runs.
pub fn targets_for(bindings: &[WatchBinding], rel_path: &str) -> Vec<TaskNode> {
    let mut matched: Vec<&TaskNode> = Vec::new();
    for binding in bindings.iter().filter(|b| b.matches(rel_path)) {
        if !matched.contains(&binding.target()) {
            matched.push(binding.target());
        }
    }

    matched
        .iter()
        .filter(|candidate| {
            !matched
                .iter()
                .any(|other| other != *candidate && other.contains(candidate))
        })
        .map(|t| (*t).clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigFile, RawConfigFile};

    fn default_bindings() -> Vec<WatchBinding> {
        let cfg = ConfigFile::try_from(RawConfigFile::default()).unwrap();
        build_bindings(cfg.paths()).unwrap()
    }

    #[test]
    fn markup_edit_reruns_markup_then_styles() {
        let targets = targets_for(&default_bindings(), "src/partials/header.html");
        assert_eq!(targets, vec![topology::documents()]);
    }

    #[test]
    fn each_class_binds_its_own_leaf() {
        let bindings = default_bindings();
        assert_eq!(
            targets_for(&bindings, "src/styles/_vars.sass"),
            vec![TaskNode::leaf(AssetClass::Styles)]
        );
        assert_eq!(
            targets_for(&bindings, "src/images/icons/a.png"),
            vec![TaskNode::leaf(AssetClass::Images)]
        );
        assert!(targets_for(&bindings, "README.md").is_empty());
    }

    #[test]
    fn overlapping_matches_keep_only_outermost_target() -> Result<()> {
        let bindings = vec![
            WatchBinding::new(AssetClass::Markup, "src/**/*", topology::documents())?,
            WatchBinding::new(AssetClass::Styles, "src/**/*.sass", TaskNode::leaf(AssetClass::Styles))?,
            WatchBinding::new(AssetClass::Scripts, "src/**/*.js", TaskNode::leaf(AssetClass::Scripts))?,
        ];

        assert_eq!(targets_for(&bindings, "src/styles/main.sass"), vec![topology::documents()]);

        let mut both = targets_for(&bindings, "src/scripts/main.js");
        both.sort_by_key(TaskNode::label);
        assert_eq!(both, vec![TaskNode::leaf(AssetClass::Scripts), topology::documents()]);
        Ok(())
    }
}
