// ABOUTME: Browser-driven strategy for JS-rendered platforms, bounded by a semaphore and a hard deadline.
// ABOUTME: Turns the renderer's raw page strings into a cleaned ExtractionResult.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};

use crate::browser::{PageRenderer, RenderedPage};
use crate::error::ExtractError;
use crate::image::rewrite_image_url;
use crate::normalize::{clean_title, create_excerpt, normalize_content};
use crate::options::BrowserOptions;
use crate::result::ExtractionResult;

use super::{Acceptance, Strategy, Target};

/// Rendered content shorter than this is replaced by the sparse-content notice.
pub const MIN_RENDERED_CHARS: usize = 50;

/// Renders the page in a headless browser and reads it with the profile's script.
#[derive(Debug, Clone)]
pub struct BrowserStrategy {
    renderer: Arc<dyn PageRenderer>,
    permits: Arc<Semaphore>,
    timeout: Duration,
    extra_hosts: Vec<String>,
}

impl BrowserStrategy {
    pub fn new(renderer: Arc<dyn PageRenderer>, opts: &BrowserOptions) -> Self {
        Self {
            renderer,
            permits: Arc::new(Semaphore::new(opts.max_concurrent.max(1))),
            timeout: opts.timeout,
            extra_hosts: opts.extra_hosts.clone(),
        }
    }

    async fn render_with_permit(&self, target: &Target) -> Result<RenderedPage, ExtractError> {
        let _permit = self.permits.acquire().await.map_err(|e| {
            ExtractError::browser_unavailable(target.url.as_str(), "Browser", Some(e.into()))
        })?;
        debug!(profile = %target.profile, "browser permit acquired");
        self.renderer.render(&target.url, target.profile).await
    }
}

fn sparse_content(title: &str, description: &str) -> String {
    let mut out = String::from(
        "The page was rendered, but little readable text could be extracted.\n\
页面已加载，但未能提取到足够的正文内容。",
    );
    if !title.is_empty() {
        out.push_str(&format!("\n\nTitle / 标题：{}", title));
    }
    if !description.is_empty() {
        out.push_str(&format!("\n\nSummary / 摘要：{}", description));
    }
    out.push_str("\n\nPlease open the original page to read it. 请点击原文链接查看完整内容。");
    out
}

/// Shape a rendered page into the final document.
///
/// The excerpt is taken from the extracted text, before any sparse-content notice.
pub fn assemble(target: &Target, page: RenderedPage) -> ExtractionResult {
    let title = clean_title(&page.title);
    let description = page.description.trim();
    let mut content = normalize_content(&page.content);
    let excerpt = create_excerpt(description, &content);
    if content.chars().count() < MIN_RENDERED_CHARS {
        content = sparse_content(&title, description);
    }

    let image = target
        .url
        .join(page.image.trim())
        .ok()
        .filter(|_| !page.image.trim().is_empty())
        .filter(|u| matches!(u.scheme(), "http" | "https"))
        .map(|u| rewrite_image_url(u.as_str()))
        .unwrap_or_default();

    ExtractionResult {
        url: target.raw.clone(),
        excerpt,
        title,
        content,
        image_url: image,
    }
}

#[async_trait]
impl Strategy for BrowserStrategy {
    fn name(&self) -> &'static str {
        "browser"
    }

    fn applies_to(&self, target: &Target) -> bool {
        if target.profile.prefers_browser() {
            return true;
        }
        let host = target.host().to_lowercase();
        self.extra_hosts.iter().any(|pattern| host.contains(pattern.as_str()))
    }

    fn acceptance(&self) -> Acceptance {
        Acceptance::NonEmptyTitle
    }

    #[instrument(name = "browser", skip_all, fields(url = %target.url, profile = %target.profile))]
    async fn attempt(&self, target: &Target) -> Result<ExtractionResult, ExtractError> {
        let page = match tokio::time::timeout(self.timeout, self.render_with_permit(target)).await {
            Ok(rendered) => rendered?,
            Err(_) => {
                warn!(timeout = ?self.timeout, "browser extraction timed out");
                return Err(ExtractError::browser_timeout(
                    target.url.as_str(),
                    "Browser",
                    Some(anyhow::anyhow!("deadline of {:?} exceeded", self.timeout)),
                ));
            }
        };
        Ok(assemble(target, page))
    }
}
