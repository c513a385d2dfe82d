//! Provisioning stages
//!
//! A stage receives the fully merged config and applies its part of it to the
//! system under the provisioning root. Stages are looked up by name in a
//! [`StageRegistry`].

pub mod fetch;

use crate::IgnitionError;
use crate::config::Config;
use crate::fetch::Fetcher;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;

/// A unit of provisioning work
#[async_trait]
pub trait Stage: Send + Sync {
    /// Apply `config`
    async fn run(&self, config: &Config) -> Result<(), IgnitionError>;
}

/// Builds a stage for one run
pub trait StageCreator: Send + Sync {
    /// Name the stage is selected by (e.g., "fetch")
    fn name(&self) -> &'static str;

    /// Create the stage for the given provisioning root. The fetcher carries
    /// the timeouts and trust roots of the acquired config.
    fn create(&self, root: &Path, fetcher: Fetcher) -> Box<dyn Stage>;
}

/// Stage creators keyed by name
#[derive(Default)]
pub struct StageRegistry {
    creators: BTreeMap<&'static str, Box<dyn StageCreator>>,
}

impl StageRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the stages this crate ships
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(fetch::FetchStageCreator));
        registry
    }

    /// Add a stage, replacing any stage of the same name
    pub fn register(&mut self, creator: Box<dyn StageCreator>) {
        self.creators.insert(creator.name(), creator);
    }

    pub fn get(&self, name: &str) -> Result<&dyn StageCreator, IgnitionError> {
        self.creators
            .get(name)
            .map(|creator| creator.as_ref())
            .ok_or_else(|| IgnitionError::UnknownStage(name.to_string()))
    }

    /// Registered stage names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        self.creators.keys().copied().collect()
    }
}
