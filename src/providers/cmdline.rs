//! Kernel command line provider
//!
//! `ignition.config.url=<url>` on the kernel command line points at the user
//! config. `coreos.config.url` is accepted as an older spelling.

use super::Provider;
use crate::config::{self, Config};
use crate::fetch::{FetchOptions, Fetcher, config_headers};
use crate::{IgnitionError, report::Report};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use url::Url;

const URL_FLAGS: &[&str] = &["ignition.config.url", "coreos.config.url"];

pub struct Cmdline {
    path: PathBuf,
}

impl Cmdline {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

/// Find the config URL among kernel arguments; the last occurrence wins
pub fn parse_config_url(cmdline: &str) -> Option<&str> {
    cmdline
        .split_whitespace()
        .filter_map(|arg| arg.split_once('='))
        .filter(|(key, _)| URL_FLAGS.contains(key))
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
        .last()
}

#[async_trait]
impl Provider for Cmdline {
    fn name(&self) -> &'static str {
        "cmdline"
    }

    async fn fetch_config(
        &self,
        fetcher: &Fetcher,
        report: &mut Report,
    ) -> Result<Config, IgnitionError> {
        let cmdline = match fs::read_to_string(&self.path).await {
            Ok(cmdline) => cmdline,
            Err(e) => {
                debug!("cannot read {:?}: {}", self.path, e);
                return Err(IgnitionError::NoProvider);
            }
        };

        let Some(source) = parse_config_url(&cmdline) else {
            return Err(IgnitionError::NoProvider);
        };
        let url = Url::parse(source)?;

        let options = FetchOptions {
            headers: config_headers(),
            ..Default::default()
        };
        let raw = fetcher.fetch_to_buffer(&url, &options).await?;
        config::parse(&raw, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{DEFAULT_FETCH_TIMEOUT, data_url};
    use tempfile::TempDir;

    #[test]
    fn test_parse_config_url() {
        assert_eq!(
            parse_config_url("BOOT_IMAGE=/vmlinuz ignition.config.url=https://example.com/c.ign quiet"),
            Some("https://example.com/c.ign")
        );
        assert_eq!(
            parse_config_url("coreos.config.url=http://a/1 ignition.config.url=http://a/2"),
            Some("http://a/2")
        );
        assert_eq!(parse_config_url("root=/dev/sda1 ignition.config.url="), None);
        assert_eq!(parse_config_url("quiet"), None);
    }

    #[tokio::test]
    async fn test_missing_flag_is_not_applicable() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cmdline");
        std::fs::write(&path, "root=/dev/sda1 quiet\n").unwrap();

        let fetcher = Fetcher::new(DEFAULT_FETCH_TIMEOUT).unwrap();
        let mut report = Report::default();
        let result = Cmdline::new(&path).fetch_config(&fetcher, &mut report).await;
        assert!(matches!(result, Err(IgnitionError::NoProvider)));
    }

    #[tokio::test]
    async fn test_fetch_from_data_url() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cmdline");
        let source = data_url::encode(br#"{"ignition": {"version": "2.2.0"}}"#);
        std::fs::write(&path, format!("quiet ignition.config.url={}\n", source)).unwrap();

        let fetcher = Fetcher::new(DEFAULT_FETCH_TIMEOUT).unwrap();
        let mut report = Report::default();
        let config = Cmdline::new(&path)
            .fetch_config(&fetcher, &mut report)
            .await
            .unwrap();
        assert_eq!(config, Config::new());
    }
}
