//! `fetch` stage
//!
//! Running it acquires, renders and caches the config without touching the
//! system, so later stages in the same boot start from the cache.

use super::{Stage, StageCreator};
use crate::IgnitionError;
use crate::config::Config;
use crate::fetch::Fetcher;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct FetchStageCreator;

impl StageCreator for FetchStageCreator {
    fn name(&self) -> &'static str {
        "fetch"
    }

    fn create(&self, root: &Path, _fetcher: Fetcher) -> Box<dyn Stage> {
        Box::new(FetchStage {
            root: root.to_path_buf(),
        })
    }
}

pub struct FetchStage {
    root: PathBuf,
}

#[async_trait]
impl Stage for FetchStage {
    async fn run(&self, config: &Config) -> Result<(), IgnitionError> {
        debug!("provisioning root is {:?}", self.root);
        info!(
            "config has {} files, {} systemd units, {} users",
            config.storage.files.len(),
            config.systemd.units.len(),
            config.passwd.users.len()
        );
        Ok(())
    }
}
