// ABOUTME: Configuration options for the extraction client including BrowserOptions and ClientBuilder.
// ABOUTME: ClientBuilder provides a fluent API for constructing Client instances with custom settings.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::browser::PageRenderer;
use crate::client::Client;
use crate::image::DESKTOP_USER_AGENT;

/// Accept-Language sent by the static strategy; the target sites are mostly Chinese.
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "zh-CN,zh;q=0.9,en;q=0.8";

pub const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

/// Settings for the browser-driven strategy.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub enabled: bool,
    /// Hard deadline for the whole browser sequence, queueing included.
    pub timeout: Duration,
    /// Fixed wait after navigation for initial scripts.
    pub settle_delay: Duration,
    /// How long to poll for a visible content selector.
    pub wait_budget: Duration,
    pub poll_interval: Duration,
    /// Extra wait when no content selector became visible.
    pub grace_delay: Duration,
    pub user_agent: String,
    pub chrome_executable: Option<PathBuf>,
    /// Upper bound on concurrently running browser processes.
    pub max_concurrent: usize,
    /// Additional host substrings routed to the browser first.
    pub extra_hosts: Vec<String>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout: Duration::from_secs(30),
            settle_delay: Duration::from_secs(5),
            wait_budget: Duration::from_secs(10),
            poll_interval: Duration::from_millis(250),
            grace_delay: Duration::from_secs(2),
            user_agent: DESKTOP_USER_AGENT.to_string(),
            chrome_executable: None,
            max_concurrent: 2,
            extra_hosts: Vec::new(),
        }
    }
}

/// Configuration options for the extraction client.
#[derive(Debug, Clone)]
pub struct Options {
    /// Timeout for the static HTTP fetch.
    pub timeout: Duration,
    pub user_agent: String,
    pub accept_language: String,
    pub allow_private_networks: bool,
    pub http_client: Option<reqwest::Client>,
    pub headers: HashMap<String, String>,
    pub browser: BrowserOptions,
    /// Replaces the Chrome renderer, e.g. with a remote or fake engine.
    pub renderer: Option<Arc<dyn PageRenderer>>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            user_agent: DESKTOP_USER_AGENT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            allow_private_networks: false,
            http_client: None,
            headers: HashMap::new(),
            browser: BrowserOptions::default(),
            renderer: None,
        }
    }
}

/// Builder for constructing Client instances with custom configuration.
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    opts: Options,
}

impl ClientBuilder {
    /// Create a new ClientBuilder with default options.
    pub fn new() -> Self {
        Self {
            opts: Options::default(),
        }
    }

    /// Set the static fetch timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.opts.timeout = timeout;
        self
    }

    /// Set the User-Agent header for static fetches.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.opts.user_agent = user_agent.into();
        self
    }

    /// Set the Accept-Language header for static fetches.
    pub fn accept_language(mut self, value: impl Into<String>) -> Self {
        self.opts.accept_language = value.into();
        self
    }

    /// Allow or disallow requests to private networks.
    pub fn allow_private_networks(mut self, allow: bool) -> Self {
        self.opts.allow_private_networks = allow;
        self
    }

    /// Use a custom HTTP client.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.opts.http_client = Some(client);
        self
    }

    /// Add a custom header to all static requests.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.opts.headers.insert(key.into(), value.into());
        self
    }

    /// Enable or disable the browser-driven strategy.
    pub fn browser_enabled(mut self, enabled: bool) -> Self {
        self.opts.browser.enabled = enabled;
        self
    }

    /// Set the hard deadline for one browser extraction.
    pub fn browser_timeout(mut self, timeout: Duration) -> Self {
        self.opts.browser.timeout = timeout;
        self
    }

    /// Override the settle timings: fixed delay, selector polling budget, grace delay.
    pub fn browser_settle(mut self, settle: Duration, wait_budget: Duration, grace: Duration) -> Self {
        self.opts.browser.settle_delay = settle;
        self.opts.browser.wait_budget = wait_budget;
        self.opts.browser.grace_delay = grace;
        self
    }

    /// Path to the Chrome/Chromium binary.
    pub fn chrome_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.opts.browser.chrome_executable = Some(path.into());
        self
    }

    /// Bound the number of browser processes running at once (minimum 1).
    pub fn max_browsers(mut self, max: usize) -> Self {
        self.opts.browser.max_concurrent = max.max(1);
        self
    }

    /// Route hosts containing `pattern` to the browser first.
    pub fn browser_host(mut self, pattern: impl Into<String>) -> Self {
        self.opts.browser.extra_hosts.push(pattern.into().to_lowercase());
        self
    }

    /// Use a custom page renderer instead of launching Chrome.
    pub fn renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.opts.renderer = Some(renderer);
        self
    }

    /// Build the Client with the configured options.
    pub fn build(self) -> Client {
        Client::new(self.opts)
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_bounds() {
        let opts = Options::default();
        assert_eq!(opts.timeout, Duration::from_secs(15));
        assert_eq!(opts.browser.timeout, Duration::from_secs(30));
        assert_eq!(opts.browser.settle_delay, Duration::from_secs(5));
        assert_eq!(opts.browser.grace_delay, Duration::from_secs(2));
        assert!(opts.browser.enabled);
        assert!(!opts.allow_private_networks);
        assert_eq!(opts.accept_language, DEFAULT_ACCEPT_LANGUAGE);
    }

    #[test]
    fn max_browsers_has_floor_of_one() {
        let builder = ClientBuilder::new().max_browsers(0);
        assert_eq!(builder.opts.browser.max_concurrent, 1);
    }

    #[test]
    fn browser_hosts_are_lowercased() {
        let builder = ClientBuilder::new().browser_host("Medium.COM");
        assert_eq!(builder.opts.browser.extra_hosts, vec!["medium.com".to_string()]);
    }
}
