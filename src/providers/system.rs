//! System config directory
//!
//! Distributions can bake configs into the image: `base.ign` is merged
//! beneath every user config, `default.ign` replaces an unusable user config,
//! and `user.ign` acts as the user config itself.

use super::{PlatformProvider, Provider};
use crate::config::{self, Config};
use crate::fetch::Fetcher;
use crate::state::IgnitionPaths;
use crate::{IgnitionError, report::Report};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

pub struct SystemConfigDir {
    base: PathBuf,
    default: PathBuf,
    user: PathBuf,
}

impl SystemConfigDir {
    pub fn new(paths: &IgnitionPaths) -> Self {
        Self {
            base: paths.base_config(),
            default: paths.default_config(),
            user: paths.user_config(),
        }
    }

    async fn fetch(&self, path: &Path, report: &mut Report) -> Result<Config, IgnitionError> {
        let raw = match fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{:?} does not exist", path);
                return Err(IgnitionError::NoProvider);
            }
            Err(e) => return Err(e.into()),
        };

        info!("reading system config file {:?}", path);
        config::parse(&raw, report)
    }
}

#[async_trait]
impl Provider for SystemConfigDir {
    fn name(&self) -> &'static str {
        "system"
    }

    async fn fetch_config(
        &self,
        _fetcher: &Fetcher,
        report: &mut Report,
    ) -> Result<Config, IgnitionError> {
        self.fetch(&self.user, report).await
    }
}

#[async_trait]
impl PlatformProvider for SystemConfigDir {
    fn name(&self) -> &'static str {
        "system"
    }

    async fn fetch_base_config(&self, report: &mut Report) -> Result<Config, IgnitionError> {
        self.fetch(&self.base, report).await
    }

    async fn fetch_default_config(&self, report: &mut Report) -> Result<Config, IgnitionError> {
        self.fetch(&self.default, report).await
    }
}
