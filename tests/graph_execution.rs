// tests/graph_execution.rs

use std::error::Error;
use std::sync::Arc;

use tokio::sync::Notify;

use assetflow::fs::mock::MockFileSystem;
use assetflow::graph::TaskNode;
use assetflow::stage::Stage;
use assetflow::types::AssetClass;
use assetflow_test_utils::builders::ConfigFileBuilder;
use assetflow_test_utils::fake_stage::{executor_with, RecordingStage};
use assetflow_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn leaf(class: AssetClass) -> TaskNode {
    TaskNode::leaf(class)
}

#[tokio::test]
async fn sequence_stops_at_first_failure() -> TestResult {
    init_tracing();

    let cfg = ConfigFileBuilder::new(".").build();
    let markup = Arc::new(RecordingStage::new("markup").failing());
    let styles = Arc::new(RecordingStage::new("styles"));
    let executor = executor_with(
        &cfg,
        Arc::new(MockFileSystem::new()),
        vec![
            (AssetClass::Markup, markup.clone() as Arc<dyn Stage>),
            (AssetClass::Styles, styles.clone() as Arc<dyn Stage>),
        ],
    );

    let node = TaskNode::seq([leaf(AssetClass::Markup), leaf(AssetClass::Styles)]);
    let report = with_timeout(executor.execute(&node)).await;

    assert!(!report.succeeded());
    assert_eq!(report.stage_names(), vec!["markup"]);
    assert_eq!(markup.invocations(), 1);
    assert_eq!(styles.invocations(), 0);
    Ok(())
}

#[tokio::test]
async fn parallel_runs_every_child_despite_failure() -> TestResult {
    init_tracing();

    let cfg = ConfigFileBuilder::new(".").build();
    let fonts = Arc::new(RecordingStage::new("fonts").failing());
    let images = Arc::new(RecordingStage::new("images"));
    let executor = executor_with(
        &cfg,
        Arc::new(MockFileSystem::new()),
        vec![
            (AssetClass::Fonts, fonts.clone() as Arc<dyn Stage>),
            (AssetClass::Images, images.clone() as Arc<dyn Stage>),
        ],
    );

    let node = TaskNode::par([leaf(AssetClass::Fonts), leaf(AssetClass::Images)]);
    let report = with_timeout(executor.execute(&node)).await;

    assert!(!report.succeeded());
    assert_eq!(report.stage_names(), vec!["fonts", "images"]);
    assert_eq!(report.failures().count(), 1);
    assert_eq!(images.invocations(), 1);
    Ok(())
}

#[tokio::test]
async fn panicking_parallel_child_becomes_failed_result() -> TestResult {
    init_tracing();

    let cfg = ConfigFileBuilder::new(".").build();
    let scripts = Arc::new(RecordingStage::new("scripts").panicking());
    let markup = Arc::new(RecordingStage::new("markup"));
    let styles = Arc::new(RecordingStage::new("styles"));
    let executor = executor_with(
        &cfg,
        Arc::new(MockFileSystem::new()),
        vec![
            (AssetClass::Scripts, scripts.clone() as Arc<dyn Stage>),
            (AssetClass::Markup, markup.clone() as Arc<dyn Stage>),
            (AssetClass::Styles, styles.clone() as Arc<dyn Stage>),
        ],
    );

    let node = assetflow::graph::topology::front_end();
    let report = with_timeout(executor.execute(&node)).await;

    assert!(!report.succeeded());
    assert_eq!(report.stage_names(), vec!["markup", "styles", "scripts"]);
    let failed: Vec<_> = report.failures().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].stage, "scripts");
    assert!(failed[0].errors[0].message.contains("panicked"));
    Ok(())
}

#[tokio::test]
async fn same_leaf_never_runs_twice_at_once() -> TestResult {
    init_tracing();

    let cfg = ConfigFileBuilder::new(".").workers(4).build();
    let gate = Arc::new(Notify::new());
    let styles = Arc::new(RecordingStage::new("styles").gated(gate.clone()));
    let markup = Arc::new(RecordingStage::new("markup"));
    let executor = executor_with(
        &cfg,
        Arc::new(MockFileSystem::new()),
        vec![
            (AssetClass::Styles, styles.clone() as Arc<dyn Stage>),
            (AssetClass::Markup, markup.clone() as Arc<dyn Stage>),
        ],
    );

    // Two overlapping watch targets, both containing the styles leaf.
    let docs = assetflow::graph::topology::documents();
    let lone = leaf(AssetClass::Styles);
    let first = {
        let executor = executor.clone();
        tokio::spawn(async move { executor.execute(&docs).await })
    };
    let second = {
        let executor = executor.clone();
        tokio::spawn(async move { executor.execute(&lone).await })
    };

    let started = styles.started();
    with_timeout(started.notified()).await;
    gate.notify_one();
    with_timeout(started.notified()).await;
    gate.notify_one();

    let (a, b) = with_timeout(async { (first.await, second.await) }).await;
    assert!(a?.succeeded());
    assert!(b?.succeeded());
    assert_eq!(styles.invocations(), 2);
    assert_eq!(styles.max_concurrent(), 1);
    Ok(())
}

#[tokio::test]
async fn unconfigured_leaf_fails_without_panicking() -> TestResult {
    let cfg = ConfigFileBuilder::new(".").build();
    let executor = executor_with(&cfg, Arc::new(MockFileSystem::new()), vec![]);

    let report = executor.execute(&leaf(AssetClass::Fonts)).await;

    assert!(!report.succeeded());
    assert!(report.results[0].errors[0].message.contains("no stage configured"));
    Ok(())
}
