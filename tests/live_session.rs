// tests/live_session.rs

use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;

use assetflow::config::ServeSection;
use assetflow::graph::{topology, RunReport, TaskNode};
use assetflow::live::{LiveSession, ReloadScope};
use assetflow::stage::StageResult;
use assetflow::types::AssetClass;
use assetflow::watch::RunCompleted;
use assetflow_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error + Send + Sync>>;

fn ephemeral() -> ServeSection {
    ServeSection {
        host: "127.0.0.1".to_string(),
        port: 0,
        reload_port: 0,
    }
}

fn report_writing(stage: &str, outputs: &[PathBuf]) -> RunReport {
    let mut result = StageResult::new(stage);
    for output in outputs {
        result.record_output(output.clone());
    }
    RunReport::single(result)
}

async fn wait_for_client(session: &LiveSession) {
    while session.client_count() == 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn completed_runs_reach_connected_browsers() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let output_root = dir.path().join("dist");
    let session = LiveSession::start(&ephemeral(), &output_root).await?;

    let url = format!("ws://127.0.0.1:{}", session.reload_port());
    let client = tokio::task::spawn_blocking(move || -> Result<Vec<String>, tungstenite::Error> {
        let (mut socket, _) = tungstenite::connect(url.as_str())?;
        let mut messages = Vec::new();
        for _ in 0..2 {
            messages.push(socket.read()?.into_text()?.as_str().to_string());
        }
        Ok(messages)
    });
    with_timeout(wait_for_client(&session)).await;

    let (completed_tx, completed_rx) = mpsc::unbounded_channel();
    let running = tokio::spawn(session.run(completed_rx));

    // Nothing written: no message.
    completed_tx.send(RunCompleted {
        target: TaskNode::leaf(AssetClass::Fonts),
        trigger: PathBuf::from("src/fonts/a.woff2"),
        report: report_writing("fonts", &[]),
    })?;
    completed_tx.send(RunCompleted {
        target: topology::documents(),
        trigger: PathBuf::from("src/styles/main.sass"),
        report: report_writing("styles", &[output_root.join("styles/main.min.css")]),
    })?;
    completed_tx.send(RunCompleted {
        target: TaskNode::leaf(AssetClass::Scripts),
        trigger: PathBuf::from("src/scripts/main.js"),
        report: report_writing("scripts", &[output_root.join("scripts/main.min.js")]),
    })?;

    let messages = with_timeout(client).await??;
    assert_eq!(
        messages,
        vec![
            r#"{"scope":"style","paths":["/styles/main.min.css"]}"#.to_string(),
            r#"{"scope":"full","paths":["/scripts/main.min.js"]}"#.to_string(),
        ]
    );

    drop(completed_tx);
    with_timeout(running).await??;
    Ok(())
}

#[tokio::test]
async fn notify_classifies_without_clients() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let output_root = dir.path().join("dist");
    let session = LiveSession::start(&ephemeral(), &output_root).await?;

    let event = session
        .notify(&report_writing(
            "markup",
            &[output_root.join("index.html"), output_root.join("styles/main.min.css")],
        ))
        .ok_or("expected an event")?;
    assert_eq!(event.scope, ReloadScope::FullPage);
    assert_eq!(event.affected_paths, vec!["/index.html", "/styles/main.min.css"]);

    assert!(session.notify(&report_writing("images", &[])).is_none());

    session.stop().await?;
    Ok(())
}
