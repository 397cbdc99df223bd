// src/config/paths.rs

//! Compiled path specs and the project layout.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobBuilder, GlobMatcher};

use crate::config::model::PathSpecConfig;
use crate::types::AssetClass;

/// Immutable `{source, dest, watch}` triple for one asset class, with its
/// source glob compiled.
#[derive(Clone)]
pub struct PathSpec {
    class: AssetClass,
    source: String,
    dest: PathBuf,
    watch: String,
    base: PathBuf,
    source_matcher: GlobMatcher,
}

impl fmt::Debug for PathSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathSpec")
            .field("class", &self.class)
            .field("source", &self.source)
            .field("dest", &self.dest)
            .field("watch", &self.watch)
            .finish_non_exhaustive()
    }
}

impl PathSpec {
    pub fn compile(class: AssetClass, raw: &PathSpecConfig) -> Result<Self> {
        let source_matcher = path_glob(&raw.source)
            .with_context(|| format!("invalid source glob for {class}: {}", raw.source))?
            .compile_matcher();
        // Compile once here so a bad watch glob is reported at startup.
        path_glob(&raw.watch)
            .with_context(|| format!("invalid watch glob for {class}: {}", raw.watch))?;

        Ok(Self {
            class,
            source: raw.source.clone(),
            dest: raw.dest.clone(),
            watch: raw.watch.clone(),
            base: glob_base(&raw.source),
            source_matcher,
        })
    }

    pub fn class(&self) -> AssetClass {
        self.class
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn dest(&self) -> &Path {
        &self.dest
    }

    pub fn watch(&self) -> &str {
        &self.watch
    }

    /// Literal directory prefix of the source pattern. Outputs mirror the
    /// input's position relative to this directory.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Whether a path relative to the project directory (forward slashes)
    /// is an input of this spec.
    pub fn is_source(&self, rel_path: &str) -> bool {
        self.source_matcher.is_match(rel_path)
    }
}

/// The five path specs, one per class.
#[derive(Debug, Clone)]
pub struct PathTable {
    specs: Vec<PathSpec>,
}

impl PathTable {
    /// `specs` must hold one entry per class, in [`AssetClass::ALL`] order.
    pub(crate) fn new(specs: Vec<PathSpec>) -> Self {
        debug_assert_eq!(specs.len(), AssetClass::ALL.len());
        Self { specs }
    }

    pub fn get(&self, class: AssetClass) -> &PathSpec {
        &self.specs[class.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathSpec> {
        self.specs.iter()
    }
}

/// Project directory plus the resolved source and output roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub project_dir: PathBuf,
    pub source_root: PathBuf,
    pub output_root: PathBuf,
}

impl Layout {
    pub fn new(project_dir: PathBuf, source_root: &Path, output_root: &Path) -> Self {
        Self {
            source_root: project_dir.join(source_root),
            output_root: project_dir.join(output_root),
            project_dir,
        }
    }

    /// Resolve a project-relative path.
    pub fn resolve(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.project_dir.join(rel)
    }
}

/// Compile a project-relative glob where `*` never crosses a `/`
/// (`src/*.html` matches top-level pages only; use `**` to recurse).
pub fn path_glob(pattern: &str) -> Result<Glob> {
    Ok(GlobBuilder::new(pattern).literal_separator(true).build()?)
}

/// Directory part of a glob that contains no wildcard.
///
/// The last component is always treated as the file-name part, so a literal
/// pattern such as `src/styles/main.sass` has base `src/styles`.
pub fn glob_base(pattern: &str) -> PathBuf {
    let components: Vec<&str> = pattern.split('/').filter(|c| !c.is_empty()).collect();
    let wildcard_at = components
        .iter()
        .position(|c| c.contains(['*', '?', '[', '{']))
        .unwrap_or(components.len());
    let end = wildcard_at.min(components.len().saturating_sub(1));

    components[..end].iter().collect()
}

/// Lexical normalisation used for comparing configured paths: drops `.`
/// components and trailing separators.
pub fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// True if either path contains the other (or they are equal), lexically.
pub fn overlaps(a: &Path, b: &Path) -> bool {
    let (a, b) = (normalize(a), normalize(b));
    a.starts_with(&b) || b.starts_with(&a)
}
