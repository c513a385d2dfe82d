//! Config acquisition
//!
//! The [`Engine`] assembles the config a stage runs with from three layers:
//! a synthetic base describing the provisioning root, the platform base
//! layer, and the user config. The user config comes from the cache when
//! present, and otherwise from the provider chain followed by rendering.

pub mod render;

pub use render::{MAX_RENDER_DEPTH, Renderer};

use crate::IgnitionError;
use crate::config::{self, Config, Filesystem, Timeouts};
use crate::fetch::{DEFAULT_FETCH_TIMEOUT, Fetcher};
use crate::providers::{self, Platform, PlatformProvider, Provider};
use crate::report::{EntryKind, Report};
use crate::stages::StageRegistry;
use crate::state::{ConfigCache, IgnitionPaths};
use std::time::Duration;
use tracing::{Instrument, error, info, info_span, warn};

/// Appended to deprecation entries when they are logged
pub const DEPRECATION_SUFFIX: &str =
    "the provided config format is deprecated and will not be supported in the future.";

/// Fetches the config and runs stages against it
pub struct Engine {
    paths: IgnitionPaths,
    fetch_timeout: Duration,
    fetcher: Fetcher,
    platform: Box<dyn PlatformProvider>,
    providers: Vec<Box<dyn Provider>>,
    stages: StageRegistry,
    cache: ConfigCache,
}

impl Engine {
    /// Create an engine for `platform` with the built-in stages
    pub fn new(paths: IgnitionPaths, platform: Platform) -> Result<Self, IgnitionError> {
        Ok(Self {
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            fetcher: Fetcher::new(DEFAULT_FETCH_TIMEOUT)?,
            platform: providers::platform_provider(&paths),
            providers: providers::provider_chain(platform, &paths),
            stages: StageRegistry::builtin(),
            cache: ConfigCache::new(&paths.config_cache),
            paths,
        })
    }

    /// Total fetch timeout used until a config supplies its own
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Result<Self, IgnitionError> {
        self.fetcher = Fetcher::new(timeout)?;
        self.fetch_timeout = timeout;
        Ok(self)
    }

    pub fn with_platform_provider(mut self, platform: Box<dyn PlatformProvider>) -> Self {
        self.platform = platform;
        self
    }

    /// Replace the user config provider chain
    pub fn with_providers(mut self, providers: Vec<Box<dyn Provider>>) -> Self {
        self.providers = providers;
        self
    }

    pub fn with_stages(mut self, stages: StageRegistry) -> Self {
        self.stages = stages;
        self
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Run the stage named `stage_name` against the assembled config
    pub async fn run(&mut self, stage_name: &str) -> Result<(), IgnitionError> {
        self.stages.get(stage_name)?;

        let base = self.base_config();

        let mut report = Report::default();
        let platform_base = self.platform.fetch_base_config(&mut report).await;
        log_report(&report.drain());
        let platform_base = or_empty(platform_base).inspect_err(|e| {
            error!("failed to acquire system base config: {}", e);
        })?;

        let user = match self.acquire_config().await {
            Ok(config) => config,
            Err(e) if e.is_benign() => {
                info!("{}: ignoring user-provided config", e);
                let default = self.platform.fetch_default_config(&mut report).await;
                log_report(&report.drain());
                or_empty(default).inspect_err(|e| {
                    error!("failed to acquire default config: {}", e);
                })?
            }
            Err(e) => {
                error!("failed to acquire config: {}", e);
                return Err(e);
            }
        };

        let span = info_span!("stage", name = stage_name);
        let full = config::merge_all(&[base, platform_base, user]);
        let stage = self
            .stages
            .get(stage_name)?
            .create(&self.paths.root, self.fetcher.clone());

        match stage.run(&full).instrument(span.clone()).await {
            Ok(()) => {
                span.in_scope(|| info!("{} passed", stage_name));
                Ok(())
            }
            Err(e) => {
                span.in_scope(|| {
                    error!("{} failed: {}", stage_name, e);
                    match serde_json::to_string_pretty(&full) {
                        Ok(json) => error!("full config:\n{}", json),
                        Err(json_err) => error!("could not marshal full config: {}", json_err),
                    }
                });
                Err(e)
            }
        }
    }

    /// Layer that always exists: the current version and the root filesystem
    fn base_config(&self) -> Config {
        let mut config = Config::new();
        config.storage.filesystems.push(Filesystem {
            name: "root".to_string(),
            path: Some(self.paths.root.display().to_string()),
            mount: None,
        });
        config
    }

    /// The user config, from the cache or from the providers
    pub async fn acquire_config(&mut self) -> Result<Config, IgnitionError> {
        if let Some(config) = self.cache.load().await? {
            self.fetcher
                .update_timeouts_and_cas(config.timeouts(), config.certificate_authorities())
                .await?;
            return Ok(config);
        }

        // No config yet, so only the command line timeout applies
        let timeouts = Timeouts {
            http_total: Some(self.fetch_timeout.as_secs()),
            ..Default::default()
        };
        self.fetcher.update_timeouts_and_cas(&timeouts, &[]).await?;

        let mut report = Report::default();
        let result = self.fetch_provider_config(&mut report).await;
        log_report(&report);
        let config = result.inspect_err(|e| warn!("failed to fetch config: {}", e))?;

        self.fetcher
            .update_timeouts_and_cas(config.timeouts(), config.certificate_authorities())
            .await?;

        let cas = self
            .fetcher
            .inline_certificate_authorities(config.certificate_authorities())
            .await?;
        let config = config.with_certificate_authorities(cas);

        self.cache.store(&config).await?;
        Ok(config)
    }

    /// Take the first applicable provider's config and render it
    async fn fetch_provider_config(
        &mut self,
        report: &mut Report,
    ) -> Result<Config, IgnitionError> {
        let config = providers::fetch_first(&self.providers, &self.fetcher, report).await?;

        self.fetcher
            .update_timeouts_and_cas(config.timeouts(), config.certificate_authorities())
            .await?;

        Renderer::new(&mut self.fetcher, report).render(config).await
    }
}

fn or_empty(result: Result<Config, IgnitionError>) -> Result<Config, IgnitionError> {
    match result {
        Err(IgnitionError::NoProvider) => Ok(Config::default()),
        other => other,
    }
}

/// Log every entry of `report` with its highlight removed
pub fn log_report(report: &Report) {
    for entry in report.redacted().entries {
        match entry.kind {
            EntryKind::Error => error!("{}", entry),
            EntryKind::Warning => warn!("{}", entry),
            EntryKind::Deprecated => warn!("{}: {}", entry, DEPRECATION_SUFFIX),
            EntryKind::Info => info!("{}", entry),
        }
    }
}
