// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod freshness;
pub mod fs;
pub mod graph;
pub mod live;
pub mod logging;
pub mod stage;
pub mod types;
pub mod watch;

use anyhow::Result;
use tracing::debug;

use crate::cli::{CliArgs, Command};
use crate::config::ConfigFile;
use crate::engine::{run_build, run_development, run_preview};
use crate::graph::topology;
use crate::types::BuildMode;
use crate::watch::build_bindings;

/// High-level entry point used by `main.rs`.
///
/// Loads configuration, then dispatches to one of:
/// - one-shot build (`build`)
/// - development session (`build --dev`)
/// - preview-only server (`preview`)
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = config::resolve(args.config.as_deref())?;

    if args.dry_run {
        print_dry_run(&cfg, &args)?;
        return Ok(());
    }

    match (args.command(), args.mode()) {
        (Command::Preview, _) => run_preview(&cfg).await,
        (Command::Build, BuildMode::Development) => run_development(&cfg).await,
        (Command::Build, mode) => {
            run_build(&cfg, mode).await?;
            Ok(())
        }
    }
}

/// Print the resolved path table, build tree and watch bindings.
fn print_dry_run(cfg: &ConfigFile, args: &CliArgs) -> Result<()> {
    let layout = cfg.layout();
    println!("assetflow dry-run");
    println!("  command = {:?}", args.command());
    println!("  mode = {}", args.mode());
    println!("  project_dir = {}", layout.project_dir.display());
    println!("  source_root = {}", layout.source_root.display());
    println!("  output_root = {}", layout.output_root.display());
    println!("  workers = {}", cfg.project().workers);
    println!();

    println!("paths:");
    for spec in cfg.paths().iter() {
        let stage = cfg.stage(spec.class());
        println!("  - {}", spec.class());
        println!("      source: {}", spec.source());
        println!("      dest: {}", spec.dest().display());
        println!("      watch: {}", spec.watch());
        println!("      incremental: {}", stage.effective_incremental(spec.class()));
        for rule in &stage.rules {
            let exts = if rule.extensions.is_empty() {
                "*".to_string()
            } else {
                rule.extensions.join(",")
            };
            let cmd = match (args.mode(), &rule.dev_cmd, &rule.cmd) {
                (BuildMode::Development, Some(dev), _) => dev.as_str(),
                (_, _, Some(cmd)) => cmd.as_str(),
                (_, _, None) => "<copy>",
            };
            println!("      rule [{exts}]: {cmd}");
        }
    }
    println!();

    println!("tree: {}", topology::full_build());
    println!();

    println!("watch bindings:");
    for binding in build_bindings(cfg.paths())? {
        println!("  - {} -> {}", binding.pattern(), binding.target());
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
