// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

use crate::types::BuildMode;

/// Command-line arguments for `assetflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetflow",
    version,
    about = "Build front-end assets into an optimized output tree, with watch mode and live reload.",
    long_about = None
)]
pub struct CliArgs {
    /// What to do; defaults to `build`.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Development mode: build once, then serve the output, watch sources,
    /// and live-reload connected browsers until interrupted.
    #[arg(long, global = true)]
    pub dev: bool,

    /// Path to the config file (TOML).
    ///
    /// If omitted, `Assetflow.toml` in the current directory is used when it
    /// exists; otherwise built-in defaults apply.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    /// Parse + validate config, print the pipeline, but don't run anything.
    #[arg(long, global = true)]
    pub dry_run: bool,
}

/// Top-level modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the build pipeline (the default).
    Build,
    /// Serve an already-built output tree with live reload, without building.
    Preview,
}

impl CliArgs {
    /// Effective subcommand (`build` when none was given).
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Build)
    }

    /// Build mode selected by the `--dev` switch.
    pub fn mode(&self) -> BuildMode {
        if self.dev {
            BuildMode::Development
        } else {
            BuildMode::Production
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_production_build() {
        let args = CliArgs::parse_from(["assetflow"]);
        assert_eq!(args.command(), Command::Build);
        assert_eq!(args.mode(), BuildMode::Production);
    }

    #[test]
    fn dev_switch_selects_development_mode() {
        let args = CliArgs::parse_from(["assetflow", "--dev"]);
        assert_eq!(args.mode(), BuildMode::Development);

        let args = CliArgs::parse_from(["assetflow", "build", "--dev"]);
        assert_eq!(args.command(), Command::Build);
        assert_eq!(args.mode(), BuildMode::Development);
    }

    #[test]
    fn preview_subcommand_is_recognised() {
        let args = CliArgs::parse_from(["assetflow", "preview", "--config", "site/Assetflow.toml"]);
        assert_eq!(args.command(), Command::Preview);
        assert_eq!(args.config.as_deref(), Some("site/Assetflow.toml"));
    }
}
