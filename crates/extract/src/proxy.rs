// ABOUTME: Image proxy for anti-hotlink CDNs: validates the target and refetches it with a spoofed Referer.
// ABOUTME: Transport-agnostic; callers map ProxiedImage and ProxyError onto their own HTTP layer.

use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::image::{find_hotlink_host, HotlinkHost, ANTI_HOTLINK_HOSTS};
use crate::resource::MAX_CONTENT_LENGTH;

/// Content type assumed when the upstream omits one.
pub const DEFAULT_IMAGE_CONTENT_TYPE: &str = "image/jpeg";

pub const CACHE_CONTROL: &str = "public, max-age=86400";

const PROXY_TIMEOUT: Duration = Duration::from_secs(15);

/// Why a proxy request was refused or failed.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("missing url parameter")]
    MissingUrl,
    #[error("invalid image URL: {0}")]
    InvalidUrl(String),
    #[error("host not allowed: {0}")]
    HostNotAllowed(String),
    #[error("upstream fetch failed: {0}")]
    Upstream(#[source] anyhow::Error),
}

impl ProxyError {
    /// HTTP status code to answer with.
    pub fn status(&self) -> u16 {
        match self {
            ProxyError::MissingUrl | ProxyError::InvalidUrl(_) => 400,
            ProxyError::HostNotAllowed(_) => 403,
            ProxyError::Upstream(_) => 502,
        }
    }
}

/// Image bytes ready to be relayed to the client.
#[derive(Debug, Clone)]
pub struct ProxiedImage {
    pub content_type: String,
    pub body: Bytes,
}

impl ProxiedImage {
    /// Headers to send alongside the body.
    pub fn response_headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Content-Type", self.content_type.clone()),
            ("Cache-Control", CACHE_CONTROL.to_string()),
            ("Access-Control-Allow-Origin", "*".to_string()),
        ]
    }
}

/// Pull the `url` parameter out of a proxy query string.
pub fn query_url(query: &str) -> Option<String> {
    url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
        .find(|(key, _)| key == "url")
        .map(|(_, value)| value.into_owned())
}

#[derive(Debug, Clone)]
pub struct ImageProxy {
    http_client: reqwest::Client,
    allowlist: &'static [HotlinkHost],
    max_bytes: usize,
}

impl ImageProxy {
    pub fn new() -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(PROXY_TIMEOUT)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .expect("failed to build HTTP client");
        Self::with_allowlist(http_client, ANTI_HOTLINK_HOSTS)
    }

    pub fn with_allowlist(http_client: reqwest::Client, allowlist: &'static [HotlinkHost]) -> Self {
        Self {
            http_client,
            allowlist,
            max_bytes: MAX_CONTENT_LENGTH,
        }
    }

    /// Refuse images larger than `max_bytes`.
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Validate a raw image URL against the allowlist.
    pub fn authorize(&self, raw: Option<&str>) -> Result<(Url, &'static HotlinkHost), ProxyError> {
        let raw = raw.map(str::trim).filter(|s| !s.is_empty()).ok_or(ProxyError::MissingUrl)?;
        let url = Url::parse(raw).map_err(|_| ProxyError::InvalidUrl(raw.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ProxyError::InvalidUrl(raw.to_string()));
        }
        let host = url.host_str().unwrap_or_default().to_string();
        let entry = find_hotlink_host(&host, self.allowlist).ok_or(ProxyError::HostNotAllowed(host))?;
        Ok((url, entry))
    }

    /// Fetch an allowlisted image with the Referer and user agent its CDN expects.
    #[instrument(skip(self))]
    pub async fn fetch(&self, raw: Option<&str>) -> Result<ProxiedImage, ProxyError> {
        let (url, entry) = self.authorize(raw)?;

        let mut request = self
            .http_client
            .get(url.clone())
            .header(reqwest::header::USER_AGENT, entry.user_agent)
            .header(reqwest::header::ACCEPT, "image/*,*/*;q=0.8");
        if let Some(referer) = entry.referer {
            request = request.header(reqwest::header::REFERER, referer);
        }

        let response = request.send().await.map_err(|e| {
            warn!(error = %e, "image upstream request failed");
            ProxyError::Upstream(e.into())
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProxyError::Upstream(anyhow::anyhow!("HTTP status {}", status.as_u16())));
        }

        if let Some(len) = response.content_length() {
            if len as usize > self.max_bytes {
                return Err(ProxyError::Upstream(anyhow::anyhow!("image too large")));
            }
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_IMAGE_CONTENT_TYPE)
            .to_string();

        let body = response
            .bytes()
            .await
            .map_err(|e| ProxyError::Upstream(e.into()))?;
        if body.len() > self.max_bytes {
            return Err(ProxyError::Upstream(anyhow::anyhow!("image too large")));
        }
        debug!(bytes = body.len(), content_type = %content_type, "proxied image");

        Ok(ProxiedImage { content_type, body })
    }
}

impl Default for ImageProxy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{proxy_path, rewrite_image_url};
    use httpmock::prelude::*;
    use pretty_assertions::assert_eq;

    static LOCAL_HOSTS: &[HotlinkHost] = &[HotlinkHost {
        domain: "127.0.0.1",
        referer: Some("https://mp.weixin.qq.com/"),
        user_agent: "proxy-test-agent",
    }];

    fn local_proxy() -> ImageProxy {
        ImageProxy::with_allowlist(reqwest::Client::new(), LOCAL_HOSTS)
    }

    #[test]
    fn rewritten_path_round_trips_through_query() {
        let original = "https://mmbiz.qpic.cn/mmbiz_jpg/abc/640?wx_fmt=jpeg&tp=webp";
        let path = rewrite_image_url(original);
        let query = path.split_once('?').map(|(_, q)| q).unwrap();
        assert_eq!(query_url(query).as_deref(), Some(original));
        assert_eq!(query_url(&format!("?{}", query)).as_deref(), Some(original));
    }

    #[test]
    fn authorize_categories() {
        let proxy = ImageProxy::new();
        assert_eq!(proxy.authorize(None).unwrap_err().status(), 400);
        assert_eq!(proxy.authorize(Some("  ")).unwrap_err().status(), 400);
        assert_eq!(proxy.authorize(Some("not a url")).unwrap_err().status(), 400);
        assert_eq!(
            proxy.authorize(Some("https://evil.example.com/a.jpg")).unwrap_err().status(),
            403
        );
        let (url, entry) = proxy.authorize(Some("https://mmbiz.qpic.cn/a.jpg")).unwrap();
        assert_eq!(url.host_str(), Some("mmbiz.qpic.cn"));
        assert_eq!(entry.referer, Some("https://mp.weixin.qq.com/"));
    }

    #[tokio::test]
    async fn fetch_spoofs_referer_and_relays_content_type() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/img.png")
                .header("referer", "https://mp.weixin.qq.com/")
                .header("user-agent", "proxy-test-agent");
            then.status(200).header("content-type", "image/png").body("PNGDATA");
        });

        let img = local_proxy().fetch(Some(&server.url("/img.png"))).await.unwrap();
        mock.assert();
        assert_eq!(img.content_type, "image/png");
        assert_eq!(img.body.as_ref(), b"PNGDATA");

        let headers = img.response_headers();
        assert!(headers.contains(&("Cache-Control", CACHE_CONTROL.to_string())));
        assert!(headers.contains(&("Access-Control-Allow-Origin", "*".to_string())));
    }

    #[tokio::test]
    async fn missing_content_type_defaults_to_jpeg() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/raw");
            then.status(200).body("JPEG");
        });
        let img = local_proxy().fetch(Some(&server.url("/raw"))).await.unwrap();
        assert_eq!(img.content_type, DEFAULT_IMAGE_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn upstream_error_maps_to_502() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/forbidden");
            then.status(403);
        });
        let err = local_proxy()
            .fetch(Some(&server.url("/forbidden")))
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::Upstream(_)));
        assert_eq!(err.status(), 502);
    }

    #[tokio::test]
    async fn oversized_image_is_refused() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/huge.jpg");
            then.status(200).header("content-type", "image/jpeg").body(vec![0u8; 2048]);
        });
        let proxy = local_proxy().with_max_bytes(1024);
        let err = proxy.fetch(Some(&server.url("/huge.jpg"))).await.unwrap_err();
        assert_eq!(err.status(), 502);
        assert!(format!("{:#}", anyhow::Error::from(err)).contains("image too large"));

        let img = local_proxy()
            .with_max_bytes(4096)
            .fetch(Some(&server.url("/huge.jpg")))
            .await
            .unwrap();
        assert_eq!(img.body.len(), 2048);
    }

    #[test]
    fn proxy_path_encodes_once() {
        let path = proxy_path("https://wx.qpic.cn/a b");
        assert_eq!(path, "/api/proxy/image?url=https%3A%2F%2Fwx.qpic.cn%2Fa%20b");
    }
}
