//! EC2 (AWS) provider
//!
//! Reads the user config from the instance user-data served by the EC2
//! Instance Metadata Service.

use super::Provider;
use crate::config::{self, Config};
use crate::fetch::{FetchOptions, Fetcher, config_headers};
use crate::{IgnitionError, report::Report};
use async_trait::async_trait;
use tracing::debug;
use url::Url;

/// EC2 metadata service base URL (link-local address)
const IMDS_BASE_URL: &str = "http://169.254.169.254";

/// Metadata API version the user-data path is served under
const USER_DATA_PATH: &str = "2009-04-04/user-data";

/// EC2 user-data provider for AWS and compatible clouds
pub struct Ec2 {
    base_url: String,
}

impl Ec2 {
    pub fn new() -> Self {
        Self {
            base_url: IMDS_BASE_URL.to_string(),
        }
    }

    /// Point at a different metadata service (useful for testing)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    fn user_data_url(&self) -> Result<Url, IgnitionError> {
        Ok(Url::parse(&format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            USER_DATA_PATH
        ))?)
    }
}

impl Default for Ec2 {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for Ec2 {
    fn name(&self) -> &'static str {
        "ec2"
    }

    async fn fetch_config(
        &self,
        fetcher: &Fetcher,
        report: &mut Report,
    ) -> Result<Config, IgnitionError> {
        let url = self.user_data_url()?;
        let options = FetchOptions {
            headers: config_headers(),
            ..Default::default()
        };

        let raw = match fetcher.fetch_to_buffer(&url, &options).await {
            Ok(raw) => raw,
            // An instance launched without user-data
            Err(IgnitionError::NotFound(_)) => {
                debug!("no user-data at {}", url);
                return Err(IgnitionError::Empty);
            }
            Err(e) => return Err(e),
        };

        config::parse(&raw, report)
    }
}
