// src/live/session.rs

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ServeSection;
use crate::graph::RunReport;
use crate::live::event::ReloadEvent;
use crate::live::hub::ReloadHub;
use crate::live::server;
use crate::watch::RunCompleted;

/// Preview server plus reload channel for one development or preview run.
#[derive(Debug)]
pub struct LiveSession {
    output_root: PathBuf,
    hub: ReloadHub,
    http_addr: SocketAddr,
    server: JoinHandle<Result<()>>,
    stop_tx: oneshot::Sender<()>,
}

impl LiveSession {
    /// Start the reload hub and the preview server for `output_root`.
    pub async fn start(serve: &ServeSection, output_root: &Path) -> Result<Self> {
        let hub = ReloadHub::start(&serve.host, serve.reload_port)?;

        let listener = server::bind(&serve.host, serve.port).await?;
        let http_addr = listener.local_addr()?;
        let router = server::router(output_root.to_path_buf(), hub.port());

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(server::serve(listener, router, async {
            let _ = stop_rx.await;
        }));

        info!(
            preview = %format!("http://{http_addr}/"),
            reload_port = hub.port(),
            "live session started"
        );

        Ok(Self {
            output_root: output_root.to_path_buf(),
            hub,
            http_addr,
            server,
            stop_tx,
        })
    }

    pub fn http_addr(&self) -> SocketAddr {
        self.http_addr
    }

    pub fn reload_port(&self) -> u16 {
        self.hub.port()
    }

    /// Browsers currently connected to the reload channel.
    pub fn client_count(&self) -> usize {
        self.hub.client_count()
    }

    /// Classify a finished run and broadcast the matching reload event.
    /// Returns the event that was sent, if any.
    pub fn notify(&self, report: &RunReport) -> Option<ReloadEvent> {
        let event = ReloadEvent::from_outputs(&report.outputs_written(), &self.output_root)?;
        let json = match event.to_json() {
            Ok(json) => json,
            Err(err) => {
                warn!(error = %err, "failed to encode reload event");
                return None;
            }
        };

        info!(scope = ?event.scope, paths = ?event.affected_paths, "notifying browsers");
        if let Err(err) = self.hub.broadcast(json) {
            warn!(error = %format!("{err:#}"), "reload broadcast failed");
        }
        Some(event)
    }

    /// Forward every completed run to connected browsers until the channel
    /// closes, then stop the preview server.
    pub async fn run(self, mut completed: mpsc::UnboundedReceiver<RunCompleted>) -> Result<()> {
        while let Some(run) = completed.recv().await {
            debug!(target = %run.target, trigger = ?run.trigger, "run completed");
            self.notify(&run.report);
        }
        self.stop().await
    }

    /// Stop the preview server and wait for it to exit.
    pub async fn stop(self) -> Result<()> {
        let _ = self.stop_tx.send(());
        self.server.await.context("preview server task panicked")??;
        info!("live session stopped");
        Ok(())
    }
}
