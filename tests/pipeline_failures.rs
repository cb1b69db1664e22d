mod common;

use std::collections::HashSet;
use std::sync::Arc;

use common::{FakeRunner, MapFetcher};
use winchman::build::BuildRunner;
use winchman::config;
use winchman::dag::BuildGraph;
use winchman::engine::WaveEngine;
use winchman::errors::WinchmanError;
use winchman::invoke_build_with;

#[tokio::test]
async fn pushing_block_without_image_aborts_before_any_launch() {
    let yaml = r#"
blocks:
  - name: quiet
    dockerfile: Dockerfile.quiet
  - name: loud
    dockerfile: Dockerfile.loud
    push_image: true
"#;
    let cfg = config::parse_and_validate(yaml).unwrap();
    let graph = BuildGraph::from_config(&cfg);
    let initial = graph.frontier(&HashSet::new(), &HashSet::new());

    let context = tempfile::tempdir().unwrap();
    let runner = Arc::new(FakeRunner::new());
    let fetcher = Arc::new(MapFetcher::new());

    let err = WaveEngine::new(Arc::clone(&runner) as Arc<dyn BuildRunner>, fetcher)
        .run(&graph, initial, context.path(), &common::test_options())
        .await
        .unwrap_err();

    assert!(err
        .to_string()
        .contains("missing image_name for push_image block 'loud'"));

    // The error surfaced while assembling the wave, so nothing ran — not
    // even the well-formed sibling.
    assert!(runner.launched().is_empty());
}

#[tokio::test]
async fn empty_config_is_rejected_at_entry() {
    let runner = Arc::new(FakeRunner::new());
    let fetcher = Arc::new(MapFetcher::new());

    let err = invoke_build_with("blocks: []", common::test_options(), runner, fetcher)
        .await
        .unwrap_err();

    match err {
        WinchmanError::Config(message) => {
            assert_eq!(message, "no independent build units defined")
        }
        other => panic!("expected Config error, got {other:?}"),
    }
}

#[tokio::test]
async fn propagation_failure_aborts_the_pipeline() {
    let yaml = r#"
blocks:
  - name: a
    dockerfile: Dockerfile.a
  - name: b
    dockerfile: Dockerfile.b
    requires: [a]
"#;
    let cfg = config::parse_and_validate(yaml).unwrap();
    let graph = BuildGraph::from_config(&cfg);
    let initial = graph.frontier(&HashSet::new(), &HashSet::new());

    let context = tempfile::tempdir().unwrap();
    let runner = Arc::new(FakeRunner::new().succeeds("a", "img-a").succeeds("b", "img-b"));
    // No archive for img-a: propagation after wave 1 fails.
    let fetcher = Arc::new(MapFetcher::new());

    let err = WaveEngine::new(Arc::clone(&runner) as Arc<dyn BuildRunner>, fetcher)
        .run(&graph, initial, context.path(), &common::test_options())
        .await
        .unwrap_err();

    match err {
        WinchmanError::Propagation { block, .. } => assert_eq!(block, "a"),
        other => panic!("expected Propagation error, got {other:?}"),
    }

    // The pipeline stopped at the wave transition; b never launched.
    assert_eq!(runner.launched(), vec!["a"]);
}

#[tokio::test]
async fn all_failures_are_collected_before_terminating() {
    let yaml = r#"
blocks:
  - name: a
    dockerfile: Dockerfile.a
  - name: b
    dockerfile: Dockerfile.b
"#;
    let cfg = config::parse_and_validate(yaml).unwrap();
    let graph = BuildGraph::from_config(&cfg);
    let initial = graph.frontier(&HashSet::new(), &HashSet::new());

    let context = tempfile::tempdir().unwrap();
    let runner = Arc::new(
        FakeRunner::new()
            .fails("a", "first failure")
            .fails("b", "second failure"),
    );
    let fetcher = Arc::new(MapFetcher::new());

    let err = WaveEngine::new(Arc::clone(&runner) as Arc<dyn BuildRunner>, fetcher)
        .run(&graph, initial, context.path(), &common::test_options())
        .await
        .unwrap_err();

    // Both siblings ran to completion; the aggregate names both.
    match err {
        WinchmanError::BlocksFailed { broken } => assert_eq!(broken, vec!["a", "b"]),
        other => panic!("expected BlocksFailed, got {other:?}"),
    }
    assert_eq!(runner.launched().len(), 2);
}
