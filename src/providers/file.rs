//! `file` platform: the user config is a local file
//!
//! The path comes from `IGNITION_CONFIG_FILE`, falling back to `config.ign`
//! in the working directory.

use super::Provider;
use crate::config::{self, Config};
use crate::fetch::Fetcher;
use crate::{IgnitionError, report::Report};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tracing::info;

pub const CONFIG_FILE_ENV: &str = "IGNITION_CONFIG_FILE";
pub const DEFAULT_CONFIG_FILE: &str = "config.ign";

pub struct FileProvider {
    path: PathBuf,
}

impl FileProvider {
    pub fn new() -> Self {
        let path = std::env::var_os(CONFIG_FILE_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self { path }
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for FileProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for FileProvider {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn fetch_config(
        &self,
        _fetcher: &Fetcher,
        report: &mut Report,
    ) -> Result<Config, IgnitionError> {
        info!("reading config file {:?}", self.path);
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            // Nothing was provided; treat like an empty config
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(IgnitionError::Empty),
            Err(e) => return Err(e.into()),
        };
        config::parse(&raw, report)
    }
}
