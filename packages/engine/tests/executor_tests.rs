// packages/engine/tests/executor_tests.rs
//! End-to-end batch runs against the in-memory runtime

mod common;

use common::{urls, write_manifest, FakeRuntime};
use mangabatch_engine::{BatchExecutor, EngineConfig, EngineError};
use std::path::Path;
use tempfile::TempDir;

fn config(dir: &Path, manifest: std::path::PathBuf, max_concurrency: usize) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.jobs.manifest = manifest;
    config.jobs.export_dir = Some(dir.join("exports"));
    config.jobs.max_concurrency = max_concurrency;
    config.runtime.poll_interval_ms = 1;
    config
}

#[tokio::test]
async fn test_five_urls_two_containers() {
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(dir.path(), &urls(&["aa", "bb", "cc", "dd", "ee"]));
    let config = config(dir.path(), manifest, 2);
    let runtime = FakeRuntime::new();
    
    let summary = BatchExecutor::new(&runtime, &config).run().await.unwrap();
    
    assert_eq!(summary.launched, 5);
    assert_eq!(summary.completed, 5);
    assert_eq!(summary.peak_in_flight, 2);
    assert_eq!(runtime.max_running(), 2);
    assert_eq!(runtime.running(), 0);
    
    let calls = runtime.calls();
    assert_eq!(calls.ping, 1);
    assert_eq!(calls.ensure_image, 1);
    assert_eq!(calls.list_running, 0);
    assert_eq!(calls.create_network, 0);
    
    assert!(runtime.launches().iter().all(|spec| spec.network.is_none()));
}

#[tokio::test]
async fn test_blank_lines_are_skipped() {
    let dir = TempDir::new().unwrap();
    let lines = vec![
        "https://x/aa".to_string(),
        String::new(),
        "https://x/bb".to_string(),
    ];
    let manifest = write_manifest(dir.path(), &lines);
    let config = config(dir.path(), manifest, 4);
    let runtime = FakeRuntime::new();
    
    let summary = BatchExecutor::new(&runtime, &config).run().await.unwrap();
    
    assert_eq!(summary.submitted, 2);
    assert_eq!(runtime.launched_names(), vec!["aa", "bb"]);
}

#[tokio::test]
async fn test_empty_manifest_is_a_clean_no_op() {
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(dir.path(), &[]);
    let config = config(dir.path(), manifest, 4);
    let runtime = FakeRuntime::new();
    
    let summary = BatchExecutor::new(&runtime, &config).run().await.unwrap();
    
    assert_eq!(summary.submitted, 0);
    assert_eq!(summary.launched, 0);
    assert_eq!(runtime.calls().launch, 0);
}

#[tokio::test]
async fn test_missing_manifest() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path(), dir.path().join("nope.txt"), 4);
    let runtime = FakeRuntime::new();
    
    let err = BatchExecutor::new(&runtime, &config).run().await.unwrap_err();
    
    assert!(matches!(err, EngineError::ManifestNotFound(_)));
    assert!(err.is_fatal());
    assert_eq!(runtime.calls().launch, 0);
    assert_eq!(runtime.calls().ping, 0);
}

#[tokio::test]
async fn test_runtime_unavailable_is_fatal() {
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(dir.path(), &urls(&["aa"]));
    let config = config(dir.path(), manifest, 4);
    let runtime = FakeRuntime::new().unreachable();
    
    let err = BatchExecutor::new(&runtime, &config).run().await.unwrap_err();
    
    assert!(matches!(err, EngineError::RuntimeUnavailable(_)));
    assert_eq!(runtime.calls().ensure_image, 0);
    assert_eq!(runtime.calls().launch, 0);
}

#[tokio::test]
async fn test_unpullable_image_is_fatal() {
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(dir.path(), &urls(&["aa"]));
    let config = config(dir.path(), manifest, 4);
    let runtime = FakeRuntime::new().pull_fails();
    
    let err = BatchExecutor::new(&runtime, &config).run().await.unwrap_err();
    
    assert!(matches!(err, EngineError::ImagePullFailed { .. }));
    assert_eq!(runtime.calls().launch, 0);
}

#[tokio::test]
async fn test_partial_failures_still_succeed() {
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(dir.path(), &urls(&["aa", "bb", "cc"]));
    let config = config(dir.path(), manifest, 2);
    let runtime = FakeRuntime::new().failing_launch("bb");
    
    let summary = BatchExecutor::new(&runtime, &config).run().await.unwrap();
    
    assert_eq!(summary.launched, 2);
    assert_eq!(summary.failed_to_start, 1);
}

#[tokio::test]
async fn test_runtime_lost_mid_batch_is_fatal() {
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(dir.path(), &urls(&["aa", "bb", "cc"]));
    let config = config(dir.path(), manifest, 3);
    let runtime = FakeRuntime::new().outage_after_launches(1);
    
    let err = BatchExecutor::new(&runtime, &config).run().await.unwrap_err();
    
    assert!(err.is_fatal());
    assert!(matches!(err, EngineError::RuntimeUnavailable(_)), "{:?}", err);
    assert_eq!(runtime.calls().launch, 2);
}

#[tokio::test]
async fn test_anonymized_run_bootstraps_proxy_first() {
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(dir.path(), &urls(&["aa", "bb"]));
    let mut config = config(dir.path(), manifest, 2);
    config.jobs.anonymize = true;
    let runtime = FakeRuntime::new();
    
    let summary = BatchExecutor::new(&runtime, &config).run().await.unwrap();
    assert_eq!(summary.launched, 2);
    
    let launches = runtime.launches();
    assert_eq!(launches.len(), 3);
    assert_eq!(launches[0].name.as_str(), "mangabatch-tor-proxy");
    
    for worker in &launches[1..] {
        assert_eq!(worker.network.as_deref(), Some("mangabatch-tor"));
        assert!(worker
            .env_vars
            .iter()
            .any(|(k, v)| k == "ALL_PROXY" && v == "socks5h://mangabatch-tor-proxy:9050"));
    }
    
    // Worker image plus proxy image
    assert_eq!(runtime.calls().ensure_image, 2);
}

#[tokio::test]
async fn test_anonymized_run_aborts_when_proxy_cannot_start() {
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(dir.path(), &urls(&["aa"]));
    let mut config = config(dir.path(), manifest, 2);
    config.jobs.anonymize = true;
    let runtime = FakeRuntime::new().network_create_fails();
    
    let err = BatchExecutor::new(&runtime, &config).run().await.unwrap_err();
    
    assert!(matches!(err, EngineError::ProxyBootstrapFailed(_)));
    assert_eq!(runtime.calls().launch, 0);
}
