// src/engine/runtime.rs

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use crate::config::ConfigFile;
use crate::errors::AssetflowError;
use crate::fs::{FileSystem, RealFileSystem};
use crate::graph::{Pipeline, RunReport};
use crate::live::LiveSession;
use crate::types::BuildMode;
use crate::watch::{build_bindings, spawn_watcher, watch_roots, Dispatcher, RunCompleted};

/// One-shot build. Fails with [`AssetflowError::BuildFailed`] if any stage
/// failed.
pub async fn run_build(cfg: &ConfigFile, mode: BuildMode) -> Result<RunReport> {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let pipeline = Pipeline::assemble(cfg, mode, fs)?;
    info!(%mode, tree = %pipeline.root(), "starting build");

    let report = pipeline.run().await;
    log_summary(&report);
    print_summary(&report);

    if report.succeeded() {
        Ok(report)
    } else {
        Err(AssetflowError::BuildFailed(failure_summary(&report)).into())
    }
}

/// Development run: initial build, then preview server, reload channel and
/// file watching until Ctrl-C.
pub async fn run_development(cfg: &ConfigFile) -> Result<()> {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let pipeline = Pipeline::assemble(cfg, BuildMode::Development, fs)?;
    let layout = cfg.layout();

    info!(tree = %pipeline.root(), "running initial build");
    let initial = pipeline.run().await;
    log_summary(&initial);
    if !initial.succeeded() {
        warn!("initial build failed; watching for fixes");
    }

    let session = LiveSession::start(cfg.serve(), &layout.output_root).await?;

    let bindings = build_bindings(cfg.paths())?;
    let roots = watch_roots(&layout.project_dir, &layout.source_root, &bindings);
    let (path_tx, path_rx) = mpsc::unbounded_channel();
    let watcher = spawn_watcher(roots, path_tx)?;

    let (completed_tx, completed_rx) = mpsc::unbounded_channel::<RunCompleted>();
    let dispatcher = Dispatcher::new(
        &layout.project_dir,
        bindings,
        pipeline.executor().clone(),
        completed_tx,
    );

    let shutdown_rx = spawn_interrupt_listener();
    let session_task = tokio::spawn(session.run(completed_rx));

    info!(roots = ?watcher.roots(), "watching for changes; press Ctrl-C to stop");
    dispatcher.run(path_rx, shutdown_rx).await;
    drop(watcher);

    session_task.await??;
    info!("development session finished");
    Ok(())
}

/// Serve an existing output tree without building.
pub async fn run_preview(cfg: &ConfigFile) -> Result<()> {
    let layout = cfg.layout();
    if !layout.output_root.is_dir() {
        warn!(output_root = ?layout.output_root, "output root does not exist yet; serving nothing");
    }

    let session = LiveSession::start(cfg.serve(), &layout.output_root).await?;
    let mut shutdown_rx = spawn_interrupt_listener();
    while !*shutdown_rx.borrow() {
        if shutdown_rx.changed().await.is_err() {
            break;
        }
    }
    session.stop().await
}

/// Flips to `true` on Ctrl-C.
fn spawn_interrupt_listener() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl-C");
            return;
        }
        let _ = tx.send(true);
        // Keep the sender alive so receivers see `true` rather than a
        // closed channel.
        std::future::pending::<()>().await;
    });
    rx
}

fn log_summary(report: &RunReport) {
    for result in &report.results {
        if result.succeeded {
            info!(
                stage = %result.stage,
                written = result.outputs_written.len(),
                "stage ok"
            );
        } else {
            for err in &result.errors {
                error!(stage = %result.stage, error = %err, "stage failed");
            }
        }
    }
}

/// One line per stage on stdout.
fn print_summary(report: &RunReport) {
    for result in &report.results {
        let status = if result.succeeded { "ok" } else { "FAILED" };
        println!(
            "{:<8} {:<6} {} written, {} errors",
            result.stage,
            status,
            result.outputs_written.len(),
            result.errors.len()
        );
    }
}

fn failure_summary(report: &RunReport) -> String {
    report
        .failures()
        .map(|r| {
            let errors: Vec<String> = r.errors.iter().map(ToString::to_string).collect();
            format!("{}: {}", r.stage, errors.join("; "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
