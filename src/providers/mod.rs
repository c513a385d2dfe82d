//! Config providers
//!
//! A provider either produces the user config or reports that it does not
//! apply to this machine ([`IgnitionError::NoProvider`]), in which case the
//! next provider in the chain is tried.

pub mod cmdline;
pub mod ec2;
pub mod file;
pub mod mock;
pub mod system;

use crate::IgnitionError;
use crate::config::Config;
use crate::fetch::Fetcher;
use crate::report::Report;
use crate::state::IgnitionPaths;
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// Source of the user config
#[async_trait]
pub trait Provider: Send + Sync {
    /// Name of this provider (e.g., "cmdline", "system")
    fn name(&self) -> &'static str;

    /// Fetch and parse the user config
    ///
    /// Parser diagnostics are appended to `report`.
    async fn fetch_config(
        &self,
        fetcher: &Fetcher,
        report: &mut Report,
    ) -> Result<Config, IgnitionError>;
}

/// Platform-supplied layers that sit around the user config
#[async_trait]
pub trait PlatformProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Layer merged beneath every user config
    async fn fetch_base_config(&self, report: &mut Report) -> Result<Config, IgnitionError>;

    /// Replacement for a user config that turned out to be unusable
    async fn fetch_default_config(&self, report: &mut Report) -> Result<Config, IgnitionError>;
}

/// Supported platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Config read from a local file
    File,
    /// Bare metal: kernel command line only
    Metal,
    /// Amazon EC2 user-data
    Aws,
}

impl FromStr for Platform {
    type Err = IgnitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(Platform::File),
            "metal" => Ok(Platform::Metal),
            "aws" | "ec2" => Ok(Platform::Aws),
            other => Err(IgnitionError::UnknownPlatform(other.to_string())),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::File => write!(f, "file"),
            Platform::Metal => write!(f, "metal"),
            Platform::Aws => write!(f, "aws"),
        }
    }
}

/// Base and default layers. Every platform ships them in the system config dir.
pub fn platform_provider(paths: &IgnitionPaths) -> Box<dyn PlatformProvider> {
    Box::new(system::SystemConfigDir::new(paths))
}

/// Providers in priority order: command line, system config dir, platform
pub fn provider_chain(platform: Platform, paths: &IgnitionPaths) -> Vec<Box<dyn Provider>> {
    let mut chain: Vec<Box<dyn Provider>> = vec![
        Box::new(cmdline::Cmdline::new(&paths.cmdline)),
        Box::new(system::SystemConfigDir::new(paths)),
    ];

    match platform {
        Platform::File => chain.push(Box::new(file::FileProvider::new())),
        Platform::Aws => chain.push(Box::new(ec2::Ec2::new())),
        Platform::Metal => {}
    }

    chain
}

/// Try each provider in order until one applies
///
/// Any outcome other than [`IgnitionError::NoProvider`] ends the chain,
/// including errors.
pub async fn fetch_first(
    providers: &[Box<dyn Provider>],
    fetcher: &Fetcher,
    report: &mut Report,
) -> Result<Config, IgnitionError> {
    for provider in providers {
        match provider.fetch_config(fetcher, report).await {
            Err(IgnitionError::NoProvider) => {
                debug!("{}: no config", provider.name());
            }
            result => {
                if result.is_ok() {
                    info!("fetched config from {}", provider.name());
                }
                return result;
            }
        }
    }

    Err(IgnitionError::NoProvider)
}
