//! Config rendering
//!
//! Resolves `ignition.config.replace` and `ignition.config.append` until no
//! directives remain. Every referenced config is fetched, checked against its
//! declared hash and parsed before anything else is done with it.

use crate::IgnitionError;
use crate::config::{self, Config, ConfigReference};
use crate::fetch::{FetchOptions, Fetcher, verify};
use crate::report::Report;
use tracing::debug;
use url::Url;

/// Deepest replace/append nesting accepted
pub const MAX_RENDER_DEPTH: usize = 10;

/// Renders one config, borrowing the fetcher for the duration
pub struct Renderer<'a> {
    fetcher: &'a mut Fetcher,
    report: &'a mut Report,
    max_depth: usize,
    // Sources of the references leading to the config being rendered
    ancestry: Vec<String>,
}

impl<'a> Renderer<'a> {
    pub fn new(fetcher: &'a mut Fetcher, report: &'a mut Report) -> Self {
        Self {
            fetcher,
            report,
            max_depth: MAX_RENDER_DEPTH,
            ancestry: Vec::new(),
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Render `config` into a config without directives
    pub async fn render(&mut self, config: Config) -> Result<Config, IgnitionError> {
        self.render_at(config, 0).await
    }

    async fn render_at(&mut self, config: Config, depth: usize) -> Result<Config, IgnitionError> {
        if let Some(reference) = &config.ignition.config.replace {
            self.enter(reference, depth)?;
            let replacement = self.resolve(reference).await?;

            // The replacement's own trust settings govern its descendants
            self.fetcher
                .update_timeouts_and_cas(
                    replacement.timeouts(),
                    replacement.certificate_authorities(),
                )
                .await?;

            let rendered = Box::pin(self.render_at(replacement, depth + 1)).await?;
            self.ancestry.pop();
            return Ok(rendered);
        }

        if config.ignition.config.append.is_empty() {
            return Ok(config);
        }

        let references = config.ignition.config.append.clone();
        let mut appended = config;
        for reference in &references {
            self.enter(reference, depth)?;
            let fragment = self.resolve(reference).await?;

            // Settings declared so far apply to the fragment's own references
            let settings = config::merge(&appended, &fragment);
            self.fetcher
                .update_timeouts_and_cas(settings.timeouts(), settings.certificate_authorities())
                .await?;

            let fragment = Box::pin(self.render_at(fragment, depth + 1)).await?;
            self.ancestry.pop();
            appended = config::merge(&appended, &fragment);
        }

        Ok(appended)
    }

    /// Check bounds before following `reference`, then record it as an ancestor
    fn enter(&mut self, reference: &ConfigReference, depth: usize) -> Result<(), IgnitionError> {
        if depth >= self.max_depth {
            return Err(IgnitionError::RenderDepth(self.max_depth));
        }
        if self.ancestry.contains(&reference.source) {
            return Err(IgnitionError::ReferenceCycle(display_source(
                &reference.source,
            )));
        }
        self.ancestry.push(reference.source.clone());
        Ok(())
    }

    /// Fetch, verify and parse one referenced config
    pub async fn resolve(&mut self, reference: &ConfigReference) -> Result<Config, IgnitionError> {
        let url = Url::parse(&reference.source)?;
        let raw = self
            .fetcher
            .fetch_to_buffer(&url, &FetchOptions::for_config(reference))
            .await?;

        let digest = verify::sha512_hex(&raw);
        if url.scheme() == "data" {
            // data URLs may embed secrets
            debug!("fetched referenced config from data url with SHA512: {}", digest);
        } else {
            debug!(
                "fetched referenced config at {} with SHA512: {}",
                reference.source, digest
            );
        }

        verify::assert_valid(&reference.verification, &raw)?;

        config::parse(&raw, self.report)
    }
}

fn display_source(source: &str) -> String {
    if source.starts_with("data:") {
        "<data url>".to_string()
    } else {
        source.to_string()
    }
}
