// ABOUTME: The Client that orchestrates extraction strategies for one URL at a time.
// ABOUTME: Walks the ordered strategy chain, applies the quality gate and the placeholder fallback.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::browser::{ChromeRenderer, PageRenderer};
use crate::error::ExtractError;
use crate::fallback;
use crate::options::{ClientBuilder, Options};
use crate::quality::is_low_quality;
use crate::result::ExtractionResult;
use crate::strategy::{Acceptance, BrowserStrategy, StaticFetchStrategy, Strategy, Target};

/// Turns URLs into [`ExtractionResult`]s.
///
/// Cheap to share behind an `Arc`; the only shared state is the browser
/// concurrency limit.
#[derive(Debug, Clone)]
pub struct Client {
    strategies: Vec<Arc<dyn Strategy>>,
}

impl Client {
    /// Create a new ClientBuilder for configuring the client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a new Client with the given options.
    pub fn new(opts: Options) -> Self {
        let mut strategies: Vec<Arc<dyn Strategy>> = Vec::new();

        if opts.browser.enabled {
            let renderer: Arc<dyn PageRenderer> = opts
                .renderer
                .clone()
                .unwrap_or_else(|| Arc::new(ChromeRenderer::new(opts.browser.clone())));
            strategies.push(Arc::new(BrowserStrategy::new(renderer, &opts.browser)));
        }
        strategies.push(Arc::new(StaticFetchStrategy::new(&opts)));

        Self { strategies }
    }

    /// Extract a document from a URL.
    ///
    /// Errors only for an invalid URL, or when the static fetch fails and no
    /// other strategy was attempted.
    #[instrument(skip(self))]
    pub async fn extract(&self, url: &str) -> Result<ExtractionResult, ExtractError> {
        let target = Target::parse(url)?;
        debug!(profile = %target.profile, "classified target");
        self.run_chain(&target).await
    }

    /// Extract a document from HTML the caller already holds.
    pub async fn extract_html(&self, html: &str, url: &str) -> Result<ExtractionResult, ExtractError> {
        let target = Target::parse(url)?;
        if html.trim().is_empty() {
            return Err(ExtractError::extract(
                url,
                "ExtractHTML",
                Some(anyhow::anyhow!("empty HTML")),
            ));
        }
        let result = StaticFetchStrategy::from_html(html, &target);
        Ok(quality_gate(&target, result))
    }

    async fn run_chain(&self, target: &Target) -> Result<ExtractionResult, ExtractError> {
        let mut attempted = 0usize;
        let mut last_err = None;

        for strategy in self.strategies.iter().filter(|s| s.applies_to(target)) {
            attempted += 1;
            match strategy.attempt(target).await {
                Ok(result) => match strategy.acceptance() {
                    Acceptance::QualityGate => return Ok(quality_gate(target, result)),
                    Acceptance::NonEmptyTitle if !result.title.trim().is_empty() => {
                        info!(strategy = strategy.name(), "extraction succeeded");
                        return Ok(result);
                    }
                    Acceptance::NonEmptyTitle => {
                        debug!(strategy = strategy.name(), "empty title, trying next strategy");
                    }
                },
                Err(e) => {
                    warn!(strategy = strategy.name(), error = %e, "strategy failed");
                    last_err = Some(e);
                }
            }
        }

        match last_err {
            Some(e) if attempted <= 1 => Err(e),
            _ => {
                info!("all strategies exhausted, returning placeholder");
                Ok(fallback::placeholder(target))
            }
        }
    }
}

fn quality_gate(target: &Target, result: ExtractionResult) -> ExtractionResult {
    if is_low_quality(&result) {
        info!(title = %result.title, "low-quality content, returning placeholder");
        return fallback::placeholder(target);
    }
    result
}
