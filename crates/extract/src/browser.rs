// ABOUTME: Headless browser rendering: the PageRenderer seam, in-page scripts, and the Chrome engine.
// ABOUTME: ChromeRenderer launches an isolated Chromium per call and tears it down on every path.

//! Browser rendering.
//!
//! The browser strategy talks to a [`PageRenderer`]. The production engine,
//! [`ChromeRenderer`], drives Chromium over CDP with `chromiumoxide`:
//! launch, navigate, settle, run the profile's extraction script, close.
//! Scripts are generated from [`SiteProfile`] data rather than written per site.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};
use url::Url;

use crate::error::ExtractError;
use crate::options::BrowserOptions;
use crate::site::SiteProfile;

const DESCRIPTION_META: &[&str] = &[
    "meta[name=\"description\"]",
    "meta[property=\"og:description\"]",
];

const IMAGE_META: &[&str] = &["meta[property=\"og:image\"]", "meta[name=\"twitter:image\"]"];

const CHROME_ARGS: &[&str] = &[
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--disable-extensions",
    "--disable-features=VizDisplayCompositor",
    "--no-first-run",
];

/// Raw strings read from a rendered page by the extraction script.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RenderedPage {
    pub title: String,
    pub description: String,
    pub image: String,
    pub content: String,
}

/// A browser engine able to render a URL and run the profile's extraction.
#[async_trait]
pub trait PageRenderer: Send + Sync + fmt::Debug {
    async fn render(&self, url: &Url, profile: SiteProfile) -> Result<RenderedPage, ExtractError>;
}

fn js_array(items: &[&str]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

/// In-page script returning a JSON string with title, description, image and content.
///
/// Candidates are tried in order; the first whose stripped text exceeds the
/// profile threshold wins. Otherwise the body (Generic) or nothing is used.
pub fn extraction_script(profile: SiteProfile) -> String {
    let spec = profile.spec();
    format!(
        r#"(() => {{
  const candidates = {candidates};
  const strip = {strip};
  const bodyStrip = {body_strip};
  const minLen = {min_len};
  const bodyFallback = {body_fallback};
  const meta = (selectors) => {{
    for (const sel of selectors) {{
      const el = document.querySelector(sel);
      const value = el ? (el.getAttribute('content') || '').trim() : '';
      if (value) return value;
    }}
    return '';
  }};
  const textOf = (el, removals) => {{
    const clone = el.cloneNode(true);
    if (removals.length) clone.querySelectorAll(removals.join(',')).forEach((n) => n.remove());
    return (clone.innerText || clone.textContent || '').trim();
  }};
  let content = '';
  for (const sel of candidates) {{
    const el = document.querySelector(sel);
    if (!el) continue;
    const text = textOf(el, strip);
    if (text.length > minLen) {{ content = text; break; }}
  }}
  if (!content && bodyFallback && document.body) content = textOf(document.body, bodyStrip);
  return JSON.stringify({{
    title: document.title || '',
    description: meta({description}),
    image: meta({image}),
    content: content,
  }});
}})()"#,
        candidates = js_array(spec.content_selectors),
        strip = js_array(spec.strip_selectors),
        body_strip = js_array(SiteProfile::Generic.spec().strip_selectors),
        min_len = spec.min_text_len,
        body_fallback = spec.body_fallback,
        description = js_array(DESCRIPTION_META),
        image = js_array(IMAGE_META),
    )
}

/// In-page script returning true once any selector matches a visible element.
pub fn visibility_probe(selectors: &[&str]) -> String {
    format!(
        r#"(() => {{
  const selectors = {selectors};
  return selectors.some((sel) => {{
    const el = document.querySelector(sel);
    if (!el) return false;
    const style = window.getComputedStyle(el);
    const rect = el.getBoundingClientRect();
    return style.display !== 'none' && style.visibility !== 'hidden' && rect.width > 0 && rect.height > 0;
  }});
}})()"#,
        selectors = js_array(selectors),
    )
}

/// Run a CDP event stream to completion, returning how many errors it yielded.
///
/// Undecodable CDP messages surface as errors; the loop must keep draining or
/// pending commands never resolve.
async fn drain_events<S, T, E>(events: &mut S) -> usize
where
    S: futures::Stream<Item = Result<T, E>> + Unpin,
    E: fmt::Display,
{
    let mut errors = 0;
    while let Some(event) = events.next().await {
        if let Err(e) = event {
            errors += 1;
            debug!(error = %e, "CDP handler error");
        }
    }
    errors
}

/// A launched browser plus its CDP event loop.
///
/// Dropping the session aborts the event loop; chromiumoxide spawns Chrome
/// with kill-on-drop, so a cancelled extraction still reaps the process.
struct Session {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl Session {
    async fn launch(config: BrowserConfig) -> anyhow::Result<Self> {
        let (browser, mut handler) = Browser::launch(config).await?;
        let handler = tokio::spawn(async move {
            drain_events(&mut handler).await;
        });
        Ok(Self { browser, handler })
    }

    async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "browser close failed");
        }
        if let Err(e) = self.browser.wait().await {
            warn!(error = %e, "waiting for browser exit failed");
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// Renders pages in a fresh headless Chromium per call.
#[derive(Debug, Clone)]
pub struct ChromeRenderer {
    opts: BrowserOptions,
}

impl ChromeRenderer {
    pub fn new(opts: BrowserOptions) -> Self {
        Self { opts }
    }

    fn config(&self) -> Result<BrowserConfig, String> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .request_timeout(self.opts.timeout)
            .args(CHROME_ARGS.iter().copied())
            .arg(format!("--user-agent={}", self.opts.user_agent));
        if let Some(path) = &self.opts.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        builder.build()
    }

    /// Poll for a visible content selector; false when the budget runs out.
    async fn wait_for_content(&self, page: &Page, profile: SiteProfile) -> bool {
        let probe = visibility_probe(&profile.wait_selectors());
        let deadline = Instant::now() + self.opts.wait_budget;
        loop {
            match page.evaluate(probe.as_str()).await {
                Ok(value) => {
                    if value.into_value::<bool>().unwrap_or(false) {
                        return true;
                    }
                }
                Err(e) => debug!(error = %e, "visibility probe failed"),
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(self.opts.poll_interval.max(Duration::from_millis(10))).await;
        }
    }

    async fn drive(
        &self,
        browser: &Browser,
        url: &Url,
        profile: SiteProfile,
    ) -> Result<RenderedPage, ExtractError> {
        let unavailable = |op: &str, e: &dyn fmt::Display| {
            ExtractError::browser_unavailable(url.as_str(), op, Some(anyhow::anyhow!("{}", e)))
        };

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| unavailable("NewPage", &e))?;
        page.goto(url.as_str())
            .await
            .map_err(|e| unavailable("Navigate", &e))?;

        sleep(self.opts.settle_delay).await;
        if !self.wait_for_content(&page, profile).await {
            debug!(url = %url, "no content selector became visible");
            sleep(self.opts.grace_delay).await;
        }

        let raw: String = page
            .evaluate(extraction_script(profile))
            .await
            .map_err(|e| unavailable("Evaluate", &e))?
            .into_value()
            .map_err(|e| unavailable("Evaluate", &e))?;

        serde_json::from_str(&raw).map_err(|e| unavailable("Decode", &e))
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn render(&self, url: &Url, profile: SiteProfile) -> Result<RenderedPage, ExtractError> {
        let config = self.config().map_err(|e| {
            ExtractError::browser_unavailable(url.as_str(), "Launch", Some(anyhow::anyhow!(e)))
        })?;
        let session = Session::launch(config)
            .await
            .map_err(|e| ExtractError::browser_unavailable(url.as_str(), "Launch", Some(e)))?;

        let outcome = self.drive(&session.browser, url, profile).await;
        session.close().await;
        outcome
    }
}
