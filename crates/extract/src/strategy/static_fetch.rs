// ABOUTME: Static fetch-parse strategy: plain HTTP GET followed by readability-style extraction.
// ABOUTME: Also exposes from_html so callers holding markup can skip the network.

use std::collections::HashMap;
use std::net::ToSocketAddrs;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::error::ExtractError;
use crate::image::rewrite_image_url;
use crate::normalize::{clean_title, create_excerpt, normalize_content};
use crate::options::{Options, DEFAULT_ACCEPT};
use crate::readability;
use crate::resource::{self, fetch, FetchOptions};
use crate::result::ExtractionResult;

use super::{Acceptance, Strategy, Target};

/// Fetches raw HTML and runs the readability pass over it.
#[derive(Debug, Clone)]
pub struct StaticFetchStrategy {
    http_client: reqwest::Client,
    fetch_opts: FetchOptions,
}

fn build_http_client(opts: &Options) -> reqwest::Client {
    let allow_private = opts.allow_private_networks;
    let redirect_policy = reqwest::redirect::Policy::custom(move |attempt| {
        if allow_private {
            return attempt.follow();
        }
        let Some(host) = attempt.url().host_str().map(str::to_string) else {
            return attempt.follow();
        };
        let port = attempt.url().port_or_known_default().unwrap_or(80);
        let host = host.trim_start_matches('[').trim_end_matches(']').to_string();
        if let Ok(ip) = host.parse::<std::net::IpAddr>() {
            if resource::is_private_ip(&ip) {
                return attempt.error("redirect to private IP blocked");
            }
            return attempt.follow();
        }
        // The redirect policy is synchronous, so resolve with the blocking resolver.
        match (host.as_str(), port).to_socket_addrs() {
            Ok(mut addrs) => {
                if addrs.any(|sa| resource::is_private_ip(&sa.ip())) {
                    attempt.error("redirect to private IP blocked")
                } else {
                    attempt.follow()
                }
            }
            Err(_) => attempt.error("DNS lookup failed during redirect"),
        }
    });

    reqwest::Client::builder()
        .redirect(redirect_policy)
        .user_agent(&opts.user_agent)
        .timeout(opts.timeout)
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()
        .expect("failed to build HTTP client")
}

impl StaticFetchStrategy {
    pub fn new(opts: &Options) -> Self {
        let http_client = opts
            .http_client
            .clone()
            .unwrap_or_else(|| build_http_client(opts));

        let mut headers = HashMap::new();
        headers.insert("Accept".to_string(), DEFAULT_ACCEPT.to_string());
        headers.insert("Accept-Language".to_string(), opts.accept_language.clone());
        // Caller headers win over the defaults.
        for (key, value) in &opts.headers {
            headers.retain(|k, _| !k.eq_ignore_ascii_case(key));
            headers.insert(key.clone(), value.clone());
        }

        Self {
            http_client,
            fetch_opts: FetchOptions {
                headers,
                allow_private_networks: opts.allow_private_networks,
                parse_non_200: true,
            },
        }
    }

    /// Extract a document from HTML already in hand.
    ///
    /// The target's URL resolves relative image links.
    pub fn from_html(html: &str, target: &Target) -> ExtractionResult {
        let page = readability::parse(html, &target.url);
        let content = normalize_content(&page.text);
        let excerpt = create_excerpt(page.description.as_deref().unwrap_or_default(), &content);

        ExtractionResult {
            url: target.raw.clone(),
            title: clean_title(&page.title),
            content,
            excerpt,
            image_url: rewrite_image_url(page.image.as_deref().unwrap_or_default()),
        }
    }
}

#[async_trait]
impl Strategy for StaticFetchStrategy {
    fn name(&self) -> &'static str {
        "static"
    }

    fn applies_to(&self, _target: &Target) -> bool {
        true
    }

    fn acceptance(&self) -> Acceptance {
        Acceptance::QualityGate
    }

    #[instrument(name = "static_fetch", skip_all, fields(url = %target.url))]
    async fn attempt(&self, target: &Target) -> Result<ExtractionResult, ExtractError> {
        let fetched = fetch(&self.http_client, target.url.as_str(), &self.fetch_opts).await?;
        debug!(
            status = fetched.status,
            final_url = %fetched.final_url,
            bytes = fetched.body.len(),
            "fetched page"
        );

        let html = fetched.text_utf8();
        Ok(Self::from_html(&html, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use pretty_assertions::assert_eq;

    fn local_opts() -> Options {
        Options {
            allow_private_networks: true,
            ..Default::default()
        }
    }

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("word{}", i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn from_html_shapes_the_document() {
        let html = format!(
            "<html><head><title>A Story - 知乎</title>\
             <meta name='description' content='A short summary of the story.'>\
             <meta property='og:image' content='https://mmbiz.qpic.cn/x/0?wx_fmt=png'></head>\
             <body><article>  {}  </article></body></html>",
            words(40)
        );
        let target = Target::parse("https://example.com/a").unwrap();
        let r = StaticFetchStrategy::from_html(&html, &target);
        assert_eq!(r.url, "https://example.com/a");
        assert_eq!(r.title, "A Story");
        assert_eq!(r.content, words(40));
        assert_eq!(r.excerpt, "A short summary of the story.");
        assert_eq!(
            r.image_url,
            "/api/proxy/image?url=https%3A%2F%2Fmmbiz.qpic.cn%2Fx%2F0%3Fwx_fmt%3Dpng"
        );
    }

    #[test]
    fn from_html_excerpt_falls_back_to_words() {
        let html = format!("<html><body><article>{}</article></body></html>", words(40));
        let target = Target::parse("https://example.com/a").unwrap();
        let r = StaticFetchStrategy::from_html(&html, &target);
        assert_eq!(r.excerpt, format!("{}...", words(30)));
    }

    #[tokio::test]
    async fn sends_browser_like_headers() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/page")
                .header("accept-language", "zh-CN,zh;q=0.9,en;q=0.8")
                .header("x-extra", "1")
                .header_exists("accept")
                .header_exists("user-agent");
            then.status(200)
                .header("content-type", "text/html; charset=utf-8")
                .body("<html><head><title>Hello</title></head><body><p>hi</p></body></html>");
        });

        let opts = Options {
            headers: HashMap::from([("X-Extra".to_string(), "1".to_string())]),
            ..local_opts()
        };
        let strategy = StaticFetchStrategy::new(&opts);
        let target = Target::parse(&server.url("/page")).unwrap();
        let r = strategy.attempt(&target).await.unwrap();

        mock.assert();
        assert_eq!(r.title, "Hello");
    }

    #[tokio::test]
    async fn non_200_bodies_are_still_parsed() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/gone");
            then.status(404)
                .header("content-type", "text/html")
                .body("<html><head><title>Not Found</title></head><body>404</body></html>");
        });

        let strategy = StaticFetchStrategy::new(&local_opts());
        let target = Target::parse(&server.url("/gone")).unwrap();
        let r = strategy.attempt(&target).await.unwrap();
        assert_eq!(r.title, "Not Found");
        assert_eq!(r.content, "404");
    }

    #[tokio::test]
    async fn loopback_is_refused_by_default() {
        let server = MockServer::start();
        let strategy = StaticFetchStrategy::new(&Options::default());
        let target = Target::parse(&server.url("/x")).unwrap();
        let err = strategy.attempt(&target).await.unwrap_err();
        assert!(err.is_ssrf());
    }

    #[tokio::test]
    async fn transport_failure_is_fetch_error() {
        // Nothing listens on port 9 on loopback.
        let strategy = StaticFetchStrategy::new(&local_opts());
        let target = Target::parse("http://127.0.0.1:9/").unwrap();
        let err = strategy.attempt(&target).await.unwrap_err();
        assert!(err.is_fetch());
    }
}
