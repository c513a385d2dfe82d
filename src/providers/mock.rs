//! Mock provider for testing
//!
//! Provides a configurable provider that can stand in for the user config
//! source as well as for the platform base and default layers.

use super::{PlatformProvider, Provider};
use crate::config::{self, Config};
use crate::fetch::Fetcher;
use crate::{IgnitionError, report::Report};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone)]
enum Outcome {
    Config(Config),
    Raw(Vec<u8>),
    NotApplicable,
    Error(String),
}

/// Mock provider for testing
///
/// # Example
/// ```
/// use ignition_rs::config::Config;
/// use ignition_rs::providers::mock::MockProvider;
///
/// let mock = MockProvider::new()
///     .with_name("cloud")
///     .with_config(Config::new())
///     .with_base(Config::new());
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    name: &'static str,
    outcome: Outcome,
    base: Option<Config>,
    default: Option<Config>,
    calls: Arc<AtomicUsize>,
}

impl MockProvider {
    /// Create a mock that returns an empty config
    pub fn new() -> Self {
        Self {
            name: "mock",
            outcome: Outcome::Config(Config::new()),
            base: None,
            default: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Return this config from `fetch_config`
    pub fn with_config(mut self, config: Config) -> Self {
        self.outcome = Outcome::Config(config);
        self
    }

    /// Run these bytes through the config parser on fetch
    pub fn with_raw(mut self, raw: impl Into<Vec<u8>>) -> Self {
        self.outcome = Outcome::Raw(raw.into());
        self
    }

    /// Report that this provider does not apply
    pub fn not_applicable(mut self) -> Self {
        self.outcome = Outcome::NotApplicable;
        self
    }

    /// Fail the fetch with an I/O error carrying `message`
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.outcome = Outcome::Error(message.into());
        self
    }

    /// Platform base layer; without one the base is not applicable
    pub fn with_base(mut self, config: Config) -> Self {
        self.base = Some(config);
        self
    }

    /// Platform default layer; without one the default is not applicable
    pub fn with_default(mut self, config: Config) -> Self {
        self.default = Some(config);
        self
    }

    /// Shared counter of `fetch_config` calls
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch_config(
        &self,
        _fetcher: &Fetcher,
        report: &mut Report,
    ) -> Result<Config, IgnitionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Outcome::Config(config) => Ok(config.clone()),
            Outcome::Raw(raw) => config::parse(raw, report),
            Outcome::NotApplicable => Err(IgnitionError::NoProvider),
            Outcome::Error(message) => Err(std::io::Error::other(message.clone()).into()),
        }
    }
}

#[async_trait]
impl PlatformProvider for MockProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch_base_config(&self, _report: &mut Report) -> Result<Config, IgnitionError> {
        self.base.clone().ok_or(IgnitionError::NoProvider)
    }

    async fn fetch_default_config(&self, _report: &mut Report) -> Result<Config, IgnitionError> {
        self.default.clone().ok_or(IgnitionError::NoProvider)
    }
}
