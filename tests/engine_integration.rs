//! Integration tests for config acquisition and stage dispatch

use async_trait::async_trait;
use ignition_rs::IgnitionError;
use ignition_rs::config::{Config, PasswdGroup};
use ignition_rs::engine::Engine;
use ignition_rs::fetch::Fetcher;
use ignition_rs::providers::Platform;
use ignition_rs::providers::mock::MockProvider;
use ignition_rs::stages::{Stage, StageCreator, StageRegistry};
use ignition_rs::state::{ConfigCache, IgnitionPaths};
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Stage that keeps the config it was run with
#[derive(Clone, Default)]
struct Recorder {
    seen: Arc<Mutex<Option<Config>>>,
    fail: bool,
}

impl Recorder {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn seen(&self) -> Option<Config> {
        self.seen.lock().unwrap().clone()
    }
}

struct RecordingStage(Recorder);

#[async_trait]
impl Stage for RecordingStage {
    async fn run(&self, config: &Config) -> Result<(), IgnitionError> {
        *self.0.seen.lock().unwrap() = Some(config.clone());
        if self.0.fail {
            return Err(IgnitionError::stage("record", "disk full"));
        }
        Ok(())
    }
}

impl StageCreator for Recorder {
    fn name(&self) -> &'static str {
        "record"
    }

    fn create(&self, _root: &Path, _fetcher: Fetcher) -> Box<dyn Stage> {
        Box::new(RecordingStage(self.clone()))
    }
}

fn with_group(name: &str) -> Config {
    let mut config = Config::new();
    config.passwd.groups.push(PasswdGroup {
        name: name.to_string(),
        ..Default::default()
    });
    config
}

fn group_names(config: &Config) -> Vec<&str> {
    config.passwd.groups.iter().map(|g| g.name.as_str()).collect()
}

fn engine(
    temp: &TempDir,
    platform: MockProvider,
    user: MockProvider,
    recorder: &Recorder,
) -> Engine {
    let mut stages = StageRegistry::builtin();
    stages.register(Box::new(recorder.clone()));

    Engine::new(IgnitionPaths::with_base(temp.path()), Platform::Metal)
        .unwrap()
        .with_platform_provider(Box::new(platform))
        .with_providers(vec![Box::new(user)])
        .with_stages(stages)
}

#[tokio::test]
async fn test_layers_merge_in_order() {
    let temp = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let mut engine = engine(
        &temp,
        MockProvider::new().with_base(with_group("base")),
        MockProvider::new().with_config(with_group("user")),
        &recorder,
    );

    engine.run("record").await.unwrap();

    let seen = recorder.seen().unwrap();
    assert_eq!(group_names(&seen), vec!["base", "user"]);
    assert_eq!(seen.storage.filesystems.len(), 1);
    assert_eq!(seen.storage.filesystems[0].name, "root");
    assert_eq!(
        seen.storage.filesystems[0].path.as_deref(),
        Some(temp.path().join("sysroot").to_str().unwrap())
    );
    assert!(!seen.has_directives());
}

#[tokio::test]
async fn test_empty_user_config_falls_back_to_default() {
    let temp = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let mut engine = engine(
        &temp,
        MockProvider::new().with_default(with_group("default")),
        MockProvider::new().with_raw(""),
        &recorder,
    );

    engine.run("record").await.unwrap();

    let seen = recorder.seen().unwrap();
    assert_eq!(group_names(&seen), vec!["default"]);
    // Nothing usable was acquired, so nothing was cached
    assert!(!temp.path().join("run/ignition.json").exists());
}

#[tokio::test]
async fn test_cloud_config_without_default_gives_empty_layer() {
    let temp = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let mut engine = engine(
        &temp,
        MockProvider::new(),
        MockProvider::new().with_raw("#cloud-config\nhostname: node1\n"),
        &recorder,
    );

    engine.run("record").await.unwrap();
    assert!(recorder.seen().unwrap().passwd.groups.is_empty());
}

#[tokio::test]
async fn test_provider_error_is_fatal() {
    let temp = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let mut engine = engine(
        &temp,
        MockProvider::new().with_default(with_group("default")),
        MockProvider::new().with_error("connection refused"),
        &recorder,
    );

    let err = engine.run("record").await.unwrap_err();
    assert!(matches!(err, IgnitionError::Io(_)));
    assert!(recorder.seen().is_none());
}

#[tokio::test]
async fn test_no_applicable_provider_is_fatal() {
    let temp = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let mut engine = engine(
        &temp,
        MockProvider::new(),
        MockProvider::new().not_applicable(),
        &recorder,
    );

    let err = engine.run("record").await.unwrap_err();
    assert!(matches!(err, IgnitionError::NoProvider));
}

#[tokio::test]
async fn test_invalid_user_config_is_fatal() {
    let temp = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let mut engine = engine(
        &temp,
        MockProvider::new(),
        MockProvider::new().with_raw(r#"{"ignition": {"version": "3.0.0"}}"#),
        &recorder,
    );

    let err = engine.run("record").await.unwrap_err();
    assert!(matches!(err, IgnitionError::UnsupportedVersion(_)));
}

#[tokio::test]
async fn test_stage_failure_is_returned() {
    let temp = TempDir::new().unwrap();
    let recorder = Recorder::failing();
    let mut engine = engine(
        &temp,
        MockProvider::new(),
        MockProvider::new().with_config(with_group("user")),
        &recorder,
    );

    let err = engine.run("record").await.unwrap_err();
    match err {
        IgnitionError::Stage { stage, message } => {
            assert_eq!(stage, "record");
            assert_eq!(message, "disk full");
        }
        other => panic!("Expected stage error, got {:?}", other),
    }
    // The stage did receive the config
    assert!(recorder.seen().is_some());
}

#[tokio::test]
async fn test_cache_short_circuits_providers() {
    let temp = TempDir::new().unwrap();
    let mut cached = with_group("cached");
    cached.ignition.timeouts.http_total = Some(33);
    ConfigCache::new(temp.path().join("run/ignition.json"))
        .store(&cached)
        .await
        .unwrap();

    let user = MockProvider::new().with_config(with_group("fresh"));
    let calls = user.call_counter();
    let recorder = Recorder::default();
    let mut engine = engine(&temp, MockProvider::new(), user, &recorder);

    engine.run("record").await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(group_names(&recorder.seen().unwrap()), vec!["cached"]);
    assert_eq!(engine.fetcher().timeouts().http_total, Some(33));
}

#[tokio::test]
async fn test_second_stage_reads_cache() {
    let temp = TempDir::new().unwrap();
    let user = MockProvider::new().with_config(with_group("user"));
    let calls = user.call_counter();
    let recorder = Recorder::default();
    let mut engine = engine(&temp, MockProvider::new(), user, &recorder);

    engine.run("fetch").await.unwrap();
    engine.run("record").await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(group_names(&recorder.seen().unwrap()), vec!["user"]);
}

#[tokio::test]
async fn test_corrupt_cache_is_fatal() {
    let temp = TempDir::new().unwrap();
    let cache = temp.path().join("run/ignition.json");
    std::fs::create_dir_all(cache.parent().unwrap()).unwrap();
    std::fs::write(&cache, b"not json").unwrap();

    let recorder = Recorder::default();
    let mut engine = engine(&temp, MockProvider::new(), MockProvider::new(), &recorder);

    let err = engine.run("record").await.unwrap_err();
    assert!(matches!(err, IgnitionError::Cache { .. }));
}

#[tokio::test]
async fn test_unknown_stage() {
    let temp = TempDir::new().unwrap();
    let recorder = Recorder::default();
    let mut engine = engine(&temp, MockProvider::new(), MockProvider::new(), &recorder);

    let err = engine.run("files").await.unwrap_err();
    assert!(matches!(err, IgnitionError::UnknownStage(_)));
    assert!(!temp.path().join("run/ignition.json").exists());
}
