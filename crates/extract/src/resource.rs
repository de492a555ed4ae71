// ABOUTME: Resource fetching for the static strategy.
// ABOUTME: Handles HTTP GET with private-network protection, content-length limits, and charset decoding.

use std::collections::HashMap;
use std::net::IpAddr;

use bytes::Bytes;
use ipnet::{Ipv4Net, Ipv6Net};
use tracing::debug;
use url::Url;

use crate::error::ExtractError;

/// Maximum allowed content length (10 MB).
pub const MAX_CONTENT_LENGTH: usize = 10 * 1024 * 1024;

/// Options for fetching a resource.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub headers: HashMap<String, String>,
    pub allow_private_networks: bool,
    /// Return non-200 bodies instead of failing.
    pub parse_non_200: bool,
}

/// Result of a successful fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub status: u16,
    pub url: String,
    pub final_url: String,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl FetchResult {
    /// Decode the body as UTF-8 text, using the charset from the content-type header.
    pub fn text_utf8(&self) -> String {
        decode_body(&self.body, self.content_type.as_deref())
    }
}

/// Check if an IP address is in a private/reserved range.
pub(crate) fn is_private_ip(addr: &IpAddr) -> bool {
    match addr {
        IpAddr::V4(ip) => {
            const RANGES: &[&str] = &[
                "10.0.0.0/8",
                "172.16.0.0/12",
                "192.168.0.0/16",
                "127.0.0.0/8",
                "169.254.0.0/16",
                "0.0.0.0/8",
            ];
            RANGES
                .iter()
                .filter_map(|r| r.parse::<Ipv4Net>().ok())
                .any(|net| net.contains(ip))
        }
        IpAddr::V6(ip) => {
            if ip.is_loopback() || ip.is_unspecified() {
                return true;
            }
            ["fc00::/7", "fe80::/10"]
                .iter()
                .filter_map(|r| r.parse::<Ipv6Net>().ok())
                .any(|net| net.contains(ip))
        }
    }
}

/// Decode body bytes to a String using charset from content-type header or detection.
fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    if let Some(encoding) = content_type
        .and_then(extract_charset)
        .and_then(|charset| encoding_rs::Encoding::for_label(charset.as_bytes()))
    {
        let (decoded, _, _) = encoding.decode(body);
        return decoded.into_owned();
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(body, true);
    let encoding = detector.guess(None, true);
    let (decoded, _, _) = encoding.decode(body);
    decoded.into_owned()
}

/// Extract charset value from Content-Type header.
fn extract_charset(content_type: &str) -> Option<String> {
    content_type.to_lowercase().split(';').find_map(|part| {
        part.trim()
            .strip_prefix("charset=")
            .map(|cs| cs.trim_matches('"').trim_matches('\'').to_string())
    })
}

/// Refuse hosts that are, or resolve to, private addresses.
async fn ensure_public_host(url: &Url, original: &str, redirected: bool) -> Result<(), ExtractError> {
    let Some(host) = url.host_str() else {
        return Ok(());
    };
    let reason = if redirected {
        "redirect to private IP address is not allowed"
    } else {
        "private IP addresses are not allowed"
    };

    let host = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_private_ip(&ip) {
            return Err(ExtractError::ssrf(original, "Fetch", Some(anyhow::anyhow!(reason))));
        }
        return Ok(());
    }

    let port = url.port_or_known_default().unwrap_or(80);
    let addrs = tokio::net::lookup_host((host, port)).await.map_err(|e| {
        ExtractError::fetch(
            original,
            "Fetch",
            Some(anyhow::anyhow!("DNS lookup failed: {}", e)),
        )
    })?;

    for socket_addr in addrs {
        if is_private_ip(&socket_addr.ip()) {
            return Err(ExtractError::ssrf(original, "Fetch", Some(anyhow::anyhow!(reason))));
        }
    }
    Ok(())
}

/// Fetch a resource from the given URL.
pub async fn fetch(
    client: &reqwest::Client,
    url: &str,
    opts: &FetchOptions,
) -> Result<FetchResult, ExtractError> {
    if url.is_empty() {
        return Err(ExtractError::invalid_url(url, "Fetch", None));
    }

    let parsed_url = Url::parse(url).map_err(|e| {
        ExtractError::invalid_url(url, "Fetch", Some(anyhow::anyhow!("invalid URL: {}", e)))
    })?;

    let scheme = parsed_url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(ExtractError::invalid_url(
            url,
            "Fetch",
            Some(anyhow::anyhow!("scheme must be http or https")),
        ));
    }

    if !opts.allow_private_networks {
        ensure_public_host(&parsed_url, url, false).await?;
    }

    let mut request = client.get(url);
    for (key, value) in &opts.headers {
        request = request.header(key, value);
    }

    let response = request.send().await.map_err(|e| {
        let reason = if e.is_timeout() {
            anyhow::anyhow!("request timed out: {}", e)
        } else {
            anyhow::anyhow!("request failed: {}", e)
        };
        ExtractError::fetch(url, "Fetch", Some(reason))
    })?;

    if !opts.allow_private_networks && response.url() != &parsed_url {
        ensure_public_host(response.url(), url, true).await?;
    }

    if let Some(len) = response.content_length() {
        if len as usize > MAX_CONTENT_LENGTH {
            return Err(ExtractError::fetch(
                url,
                "Fetch",
                Some(anyhow::anyhow!("content too large")),
            ));
        }
    }

    let status = response.status().as_u16();
    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_lowercase());

    let body = response.bytes().await.map_err(|e| {
        ExtractError::fetch(
            url,
            "Fetch",
            Some(anyhow::anyhow!("failed to read body: {}", e)),
        )
    })?;

    if body.len() > MAX_CONTENT_LENGTH {
        return Err(ExtractError::fetch(
            url,
            "Fetch",
            Some(anyhow::anyhow!("content too large")),
        ));
    }

    if status != 200 {
        if !opts.parse_non_200 {
            return Err(ExtractError::fetch(
                url,
                "Fetch",
                Some(anyhow::anyhow!("HTTP status {}", status)),
            ));
        }
        debug!(url, status, "parsing non-200 response");
    }

    Ok(FetchResult {
        status,
        url: url.to_string(),
        final_url,
        content_type,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn create_test_client() -> reqwest::Client {
        reqwest::Client::builder()
            .user_agent("test-agent")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_ok_utf8() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/test");
            then.status(200)
                .header("content-type", "text/plain; charset=utf-8")
                .body("hello");
        });

        let client = create_test_client();
        let opts = FetchOptions {
            allow_private_networks: true,
            ..Default::default()
        };

        let result = fetch(&client, &server.url("/test"), &opts).await;
        mock.assert();

        let result = result.expect("fetch should succeed");
        assert_eq!(result.status, 200);
        assert_eq!(result.text_utf8(), "hello");
    }

    #[tokio::test]
    async fn test_fetch_sends_custom_headers() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/headers")
                .header("accept-language", "zh-CN,zh;q=0.9,en;q=0.8");
            then.status(200).body("ok");
        });

        let client = create_test_client();
        let mut headers = HashMap::new();
        headers.insert(
            "Accept-Language".to_string(),
            "zh-CN,zh;q=0.9,en;q=0.8".to_string(),
        );
        let opts = FetchOptions {
            headers,
            allow_private_networks: true,
            ..Default::default()
        };

        fetch(&client, &server.url("/headers"), &opts)
            .await
            .expect("fetch should succeed");
        mock.assert();
    }

    #[tokio::test]
    async fn test_fetch_non_200_rejected() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/notfound");
            then.status(404).body("not found");
        });

        let client = create_test_client();
        let opts = FetchOptions {
            allow_private_networks: true,
            parse_non_200: false,
            ..Default::default()
        };

        let result = fetch(&client, &server.url("/notfound"), &opts).await;
        mock.assert();

        let err = result.expect_err("should fail on 404");
        assert!(err.is_fetch());
    }

    #[tokio::test]
    async fn test_fetch_non_200_allowed() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/notfound");
            then.status(404).body("not found");
        });

        let client = create_test_client();
        let opts = FetchOptions {
            allow_private_networks: true,
            parse_non_200: true,
            ..Default::default()
        };

        let result = fetch(&client, &server.url("/notfound"), &opts).await;
        mock.assert();

        let result = result.expect("fetch should succeed with parse_non_200");
        assert_eq!(result.status, 404);
        assert_eq!(result.text_utf8(), "not found");
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_http_scheme() {
        let client = create_test_client();
        let err = fetch(&client, "ftp://example.com/file", &FetchOptions::default())
            .await
            .expect_err("ftp should be rejected");
        assert!(err.is_invalid_url());
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_is_fetch_error() {
        let client = create_test_client();
        let opts = FetchOptions {
            allow_private_networks: true,
            ..Default::default()
        };
        // Port 9 (discard) is closed on test hosts.
        let err = fetch(&client, "http://127.0.0.1:9/", &opts)
            .await
            .expect_err("nothing listens on port 9");
        assert!(err.is_fetch());
    }

    #[tokio::test]
    async fn test_private_ip_block() {
        let server = MockServer::start();

        let client = create_test_client();
        let opts = FetchOptions::default();

        let url = format!("http://127.0.0.1:{}/test", server.port());
        let result = fetch(&client, &url, &opts).await;

        let err = result.expect_err("should fail on private IP");
        assert!(err.is_ssrf());
    }

    #[test]
    fn test_decode_utf8_without_header() {
        assert_eq!(decode_body("知乎专栏".as_bytes(), None), "知乎专栏");
    }

    #[test]
    fn test_decode_gbk_with_charset_header() {
        // "中文" in GBK
        let gbk: &[u8] = &[0xd6, 0xd0, 0xce, 0xc4];
        assert_eq!(decode_body(gbk, Some("text/html; charset=gbk")), "中文");
    }

    #[test]
    fn test_is_private_ip() {
        assert!(is_private_ip(&"10.0.0.1".parse().unwrap()));
        assert!(is_private_ip(&"172.16.0.1".parse().unwrap()));
        assert!(is_private_ip(&"192.168.1.1".parse().unwrap()));
        assert!(is_private_ip(&"127.0.0.1".parse().unwrap()));
        assert!(is_private_ip(&"169.254.0.1".parse().unwrap()));
        assert!(is_private_ip(&"::1".parse().unwrap()));
        assert!(is_private_ip(&"fd00::1".parse().unwrap()));
        assert!(is_private_ip(&"fe80::1".parse().unwrap()));

        assert!(!is_private_ip(&"8.8.8.8".parse().unwrap()));
        assert!(!is_private_ip(&"172.32.0.1".parse().unwrap()));
        assert!(!is_private_ip(&"2001:4860:4860::8888".parse().unwrap()));
    }

    #[test]
    fn test_extract_charset() {
        assert_eq!(
            extract_charset("text/html; charset=utf-8"),
            Some("utf-8".to_string())
        );
        assert_eq!(
            extract_charset("text/html; charset=\"GBK\""),
            Some("gbk".to_string())
        );
        assert_eq!(extract_charset("text/html"), None);
    }
}
