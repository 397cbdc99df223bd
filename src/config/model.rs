// src/config/model.rs

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::defaults;
use crate::config::paths::{Layout, PathTable};
use crate::types::AssetClass;

/// Configuration exactly as read from a TOML file, before validation.
///
/// ```toml
/// [project]
/// source_root = "src"
/// output_root = "dist"
/// workers = 4
///
/// [serve]
/// port = 3000
/// reload_port = 35729
///
/// [paths.images]
/// source = "src/images/**/*.{png,jpg,jpeg,gif,svg,webp}"
/// dest = "dist/images/"
/// watch = "src/images/**/*.{png,jpg,jpeg,gif,svg,webp}"
///
/// [stage.images]
/// incremental = true
///
/// [[stage.images.rule]]
/// extensions = ["png", "jpg", "jpeg"]
/// cmd = "cwebp -quiet -q 90 {input} -o {output}"
/// extension = "webp"
/// ```
///
/// All sections are optional; a `[paths.<class>]` or `[stage.<class>]` table
/// replaces the built-in default for that class as a whole.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub project: ProjectSection,

    #[serde(default)]
    pub serve: ServeSection,

    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub stage: StagesSection,
}

/// `[project]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSection {
    /// Root of the source tree. Only used for validation and watching.
    #[serde(default = "default_source_root")]
    pub source_root: PathBuf,

    /// Root of the output tree. Fully owned: `clean` deletes it.
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,

    /// Maximum number of stage invocations running at the same time.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_source_root() -> PathBuf {
    PathBuf::from("src")
}

fn default_output_root() -> PathBuf {
    PathBuf::from("dist")
}

fn default_workers() -> usize {
    4
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            source_root: default_source_root(),
            output_root: default_output_root(),
            workers: default_workers(),
        }
    }
}

/// `[serve]` section: where the preview server and reload channel listen.
#[derive(Debug, Clone, Deserialize)]
pub struct ServeSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// WebSocket port for reload notifications. If taken, an ephemeral port
    /// is used instead.
    #[serde(default = "default_reload_port")]
    pub reload_port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_reload_port() -> u16 {
    35729
}

impl Default for ServeSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            reload_port: default_reload_port(),
        }
    }
}

/// `[paths.<class>]` tables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsSection {
    pub markup: Option<PathSpecConfig>,
    pub styles: Option<PathSpecConfig>,
    pub scripts: Option<PathSpecConfig>,
    pub images: Option<PathSpecConfig>,
    pub fonts: Option<PathSpecConfig>,
}

impl PathsSection {
    pub fn get(&self, class: AssetClass) -> Option<&PathSpecConfig> {
        match class {
            AssetClass::Markup => self.markup.as_ref(),
            AssetClass::Styles => self.styles.as_ref(),
            AssetClass::Scripts => self.scripts.as_ref(),
            AssetClass::Images => self.images.as_ref(),
            AssetClass::Fonts => self.fonts.as_ref(),
        }
    }

    pub fn set(&mut self, class: AssetClass, spec: PathSpecConfig) {
        let slot = match class {
            AssetClass::Markup => &mut self.markup,
            AssetClass::Styles => &mut self.styles,
            AssetClass::Scripts => &mut self.scripts,
            AssetClass::Images => &mut self.images,
            AssetClass::Fonts => &mut self.fonts,
        };
        *slot = Some(spec);
    }

    /// Effective (possibly default) spec for a class.
    pub fn effective(&self, class: AssetClass) -> PathSpecConfig {
        self.get(class)
            .cloned()
            .unwrap_or_else(|| defaults::path_spec(class))
    }
}

/// One `[paths.<class>]` table. Patterns and `dest` are relative to the
/// project directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PathSpecConfig {
    /// Glob selecting the inputs of the stage.
    pub source: String,
    /// Directory the stage writes into.
    pub dest: PathBuf,
    /// Glob whose changes re-run the stage in development mode.
    pub watch: String,
}

/// `[stage.<class>]` tables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StagesSection {
    pub markup: Option<StageConfig>,
    pub styles: Option<StageConfig>,
    pub scripts: Option<StageConfig>,
    pub images: Option<StageConfig>,
    pub fonts: Option<StageConfig>,
}

impl StagesSection {
    pub fn get(&self, class: AssetClass) -> Option<&StageConfig> {
        match class {
            AssetClass::Markup => self.markup.as_ref(),
            AssetClass::Styles => self.styles.as_ref(),
            AssetClass::Scripts => self.scripts.as_ref(),
            AssetClass::Images => self.images.as_ref(),
            AssetClass::Fonts => self.fonts.as_ref(),
        }
    }

    pub fn set(&mut self, class: AssetClass, stage: StageConfig) {
        let slot = match class {
            AssetClass::Markup => &mut self.markup,
            AssetClass::Styles => &mut self.styles,
            AssetClass::Scripts => &mut self.scripts,
            AssetClass::Images => &mut self.images,
            AssetClass::Fonts => &mut self.fonts,
        };
        *slot = Some(stage);
    }

    pub fn effective(&self, class: AssetClass) -> StageConfig {
        self.get(class)
            .cloned()
            .unwrap_or_else(|| defaults::stage(class))
    }
}

/// One `[stage.<class>]` table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StageConfig {
    /// Skip inputs whose output is already at least as new as the input.
    ///
    /// If `None`, images and fonts are incremental and everything else
    /// always runs in full.
    #[serde(default)]
    pub incremental: Option<bool>,

    /// Transform rules, tried in order. Inputs that no rule matches are
    /// copied verbatim.
    #[serde(default, rename = "rule")]
    pub rules: Vec<RuleConfig>,
}

impl StageConfig {
    pub fn effective_incremental(&self, class: AssetClass) -> bool {
        self.incremental
            .unwrap_or(matches!(class, AssetClass::Images | AssetClass::Fonts))
    }
}

/// `[[stage.<class>.rule]]` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RuleConfig {
    /// Input extensions (without dot, case-insensitive) this rule applies
    /// to. Empty means every input.
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Shell command template. `None` copies the input.
    #[serde(default)]
    pub cmd: Option<String>,

    /// Command used instead of `cmd` in development mode.
    #[serde(default)]
    pub dev_cmd: Option<String>,

    /// Replacement extension for the output file name.
    #[serde(default)]
    pub extension: Option<String>,

    /// Appended to the output file stem, e.g. `".min"`.
    #[serde(default)]
    pub suffix: String,
}

/// Validated configuration.
///
/// Construct via `ConfigFile::try_from(RawConfigFile)` (see `validate.rs`)
/// or the loader functions.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    project_dir: PathBuf,
    project: ProjectSection,
    serve: ServeSection,
    paths: PathTable,
    stages: Vec<StageConfig>,
}

impl ConfigFile {
    /// Internal constructor used by validation.
    pub(crate) fn new_unchecked(
        project: ProjectSection,
        serve: ServeSection,
        paths: PathTable,
        stages: Vec<StageConfig>,
    ) -> Self {
        Self {
            project_dir: PathBuf::from("."),
            project,
            serve,
            paths,
            stages,
        }
    }

    /// Resolve every relative path against `dir` instead of `.`.
    pub fn with_project_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project_dir = dir.into();
        self
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn project(&self) -> &ProjectSection {
        &self.project
    }

    pub fn serve(&self) -> &ServeSection {
        &self.serve
    }

    pub fn paths(&self) -> &PathTable {
        &self.paths
    }

    /// Effective stage settings for a class.
    pub fn stage(&self, class: AssetClass) -> &StageConfig {
        &self.stages[class.index()]
    }

    /// Absolute-ish roots derived from the project directory.
    pub fn layout(&self) -> Layout {
        Layout::new(
            self.project_dir.clone(),
            &self.project.source_root,
            &self.project.output_root,
        )
    }
}
