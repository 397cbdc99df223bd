// src/stage/command.rs

//! Rule-driven stage that shells out to external transform tools.

use std::ffi::OsString;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::{Layout, StageConfig};
use crate::fs::{commit_staged, FileSystem};
use crate::stage::template::{CommandTemplate, TemplateVars};
use crate::stage::{staged_path, Input, OutputNaming, Stage, StageError, StageJob, StageResult};
use crate::types::{AssetClass, BuildMode};

/// What a rule does with a matching input.
#[derive(Debug, Clone)]
enum Action {
    Copy,
    Command {
        cmd: CommandTemplate,
        dev_cmd: Option<CommandTemplate>,
    },
}

#[derive(Debug, Clone)]
struct Rule {
    /// Lowercased, without dot. Empty matches everything.
    extensions: Vec<String>,
    action: Action,
    extension: Option<String>,
    suffix: String,
}

impl Rule {
    fn matches(&self, input: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        let ext = input
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        self.extensions.iter().any(|e| *e == ext)
    }

    fn output_name(&self, input: &Path) -> Option<OsString> {
        let stem = input.file_stem()?.to_string_lossy();
        let ext = match &self.extension {
            Some(ext) => Some(ext.clone()),
            None => input.extension().map(|e| e.to_string_lossy().into_owned()),
        };
        let name = match ext {
            Some(ext) => format!("{stem}{}.{ext}", self.suffix),
            None => format!("{stem}{}", self.suffix),
        };
        Some(OsString::from(name))
    }
}

/// Stage configured from a `[stage.<class>]` table.
///
/// The first rule whose extension list matches an input decides how that
/// input is processed; inputs no rule matches are copied unchanged.
#[derive(Debug)]
pub struct CommandStage {
    name: String,
    rules: Vec<Rule>,
    fs: Arc<dyn FileSystem>,
}

impl CommandStage {
    pub fn from_config(
        class: AssetClass,
        config: &StageConfig,
        fs: Arc<dyn FileSystem>,
    ) -> Result<Self> {
        let mut rules = Vec::with_capacity(config.rules.len());
        for raw in &config.rules {
            let action = match &raw.cmd {
                None => Action::Copy,
                Some(cmd) => Action::Command {
                    cmd: CommandTemplate::parse(cmd).map_err(|e| anyhow!(e))?,
                    dev_cmd: raw
                        .dev_cmd
                        .as_deref()
                        .map(CommandTemplate::parse)
                        .transpose()
                        .map_err(|e| anyhow!(e))?,
                },
            };
            rules.push(Rule {
                extensions: raw
                    .extensions
                    .iter()
                    .map(|e| e.trim_start_matches('.').to_lowercase())
                    .collect(),
                action,
                extension: raw.extension.clone(),
                suffix: raw.suffix.clone(),
            });
        }

        Ok(Self {
            name: class.to_string(),
            rules,
            fs,
        })
    }

    fn rule_for(&self, input: &Path) -> Option<&Rule> {
        self.rules.iter().find(|r| r.matches(input))
    }

    /// Produce the output for one input. Returns the output path if its
    /// bytes changed.
    async fn process(&self, input: &Input, mode: BuildMode, layout: &Layout) -> Result<Option<PathBuf>> {
        let name = self
            .output_name(&input.source)
            .ok_or_else(|| anyhow!("input has no file name"))?;
        let output = input.dest_dir.join(name);
        let staged = staged_path(&output);

        self.fs.create_dir_all(&input.dest_dir)?;

        let action = self.rule_for(&input.source).map(|r| &r.action);
        let produced = match action {
            None | Some(Action::Copy) => self
                .fs
                .copy(&input.source, &staged)
                .with_context(|| format!("copying {:?}", input.source)),
            Some(Action::Command { cmd, dev_cmd }) => {
                let template = match (mode, dev_cmd) {
                    (BuildMode::Development, Some(dev)) => dev,
                    _ => cmd,
                };
                let vars = TemplateVars {
                    input: &input.source,
                    output: &staged,
                    source_root: &layout.source_root,
                    output_root: &layout.output_root,
                };
                run_shell(&template.render(&vars)).await.and_then(|()| {
                    if self.fs.is_file(&staged) {
                        Ok(())
                    } else {
                        Err(anyhow!("command succeeded but did not write {:?}", staged))
                    }
                })
            }
        };

        if let Err(err) = produced {
            if self.fs.exists(&staged) {
                let _ = self.fs.remove_file(&staged);
            }
            return Err(err);
        }

        let written = commit_staged(
            self.fs.as_ref(),
            &staged,
            &output,
            self.fs.modified(&input.source),
        )?;
        Ok(written.then_some(output))
    }
}

impl OutputNaming for CommandStage {
    fn output_name(&self, input: &Path) -> Option<OsString> {
        match self.rule_for(input) {
            Some(rule) => rule.output_name(input),
            None => input.file_name().map(OsString::from),
        }
    }
}

impl Stage for CommandStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, job: StageJob) -> Pin<Box<dyn Future<Output = StageResult> + Send + '_>> {
        Box::pin(async move {
            let StageJob {
                inputs,
                mode,
                layout,
            } = job;
            let mut result = StageResult::new(&self.name);
            let mut processed = 0usize;

            for input in inputs {
                processed += 1;
                match self.process(&input, mode, &layout).await {
                    Ok(Some(output)) => {
                        debug!(stage = %self.name, output = ?output, "output written");
                        result.record_output(output);
                    }
                    Ok(None) => {}
                    Err(err) => {
                        let message = format!("{err:#}");
                        warn!(stage = %self.name, input = ?input.source, error = %message, "input failed");
                        result.record_error(StageError::for_input(&input.source, message));
                    }
                }
            }

            info!(
                stage = %self.name,
                inputs = processed,
                written = result.outputs_written.len(),
                errors = result.errors.len(),
                "stage finished"
            );
            result
        })
    }
}

/// Run a command line through the platform shell. A non-zero exit is an
/// error carrying the command's trimmed stderr.
async fn run_shell(command_line: &str) -> Result<()> {
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command_line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command_line);
        c
    };

    debug!(cmd = %command_line, "running transform command");

    let output = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .with_context(|| format!("spawning `{command_line}`"))?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let code = output
        .status
        .code()
        .map_or_else(|| "signal".to_string(), |c| c.to_string());
    Err(anyhow!(
        "`{command_line}` exited with {code}: {}",
        stderr.trim()
    ))
}
