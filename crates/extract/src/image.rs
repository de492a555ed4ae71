// ABOUTME: Image URL rewriting for CDNs with anti-hotlink protection.
// ABOUTME: Owns the allowlist shared with the image proxy so both sides stay in sync.

use url::Url;

/// Path of the internal image proxy endpoint.
pub const PROXY_IMAGE_PATH: &str = "/api/proxy/image";

/// Desktop Chrome user agent used for ordinary upstream requests.
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// An image host that rejects third-party referrers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotlinkHost {
    /// Matched as a substring of the image URL's host.
    pub domain: &'static str,
    /// Referer the host expects, if any.
    pub referer: Option<&'static str>,
    pub user_agent: &'static str,
}

const WECHAT_REFERER: &str = "https://mp.weixin.qq.com/";
const WECHAT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 MicroMessenger/6.7.3.9001";

/// Hosts whose images are routed through the proxy.
pub const ANTI_HOTLINK_HOSTS: &[HotlinkHost] = &[
    HotlinkHost {
        domain: "mmbiz.qpic.cn",
        referer: Some(WECHAT_REFERER),
        user_agent: WECHAT_USER_AGENT,
    },
    HotlinkHost {
        domain: "wx.qpic.cn",
        referer: Some(WECHAT_REFERER),
        user_agent: WECHAT_USER_AGENT,
    },
    HotlinkHost {
        domain: "mmbiz.qlogo.cn",
        referer: None,
        user_agent: DESKTOP_USER_AGENT,
    },
];

/// Find the allowlist entry covering a host.
pub fn find_hotlink_host<'a>(host: &str, allowlist: &'a [HotlinkHost]) -> Option<&'a HotlinkHost> {
    let host = host.to_lowercase();
    allowlist.iter().find(|h| host.contains(h.domain))
}

/// Build the proxy path for an image URL, percent-encoding it once.
pub fn proxy_path(image_url: &str) -> String {
    format!("{}?url={}", PROXY_IMAGE_PATH, urlencoding::encode(image_url))
}

/// Rewrite a protected image URL to the internal proxy path.
///
/// Empty input stays empty; hosts off the allowlist are returned unchanged.
pub fn rewrite_image_url(image_url: &str) -> String {
    rewrite_with(image_url, ANTI_HOTLINK_HOSTS)
}

/// Same as [`rewrite_image_url`] against a caller-supplied allowlist.
pub fn rewrite_with(image_url: &str, allowlist: &[HotlinkHost]) -> String {
    if image_url.is_empty() {
        return String::new();
    }

    let protected = Url::parse(image_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .and_then(|host| find_hotlink_host(&host, allowlist))
        .is_some();

    if protected {
        proxy_path(image_url)
    } else {
        image_url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_stays_empty() {
        assert_eq!(rewrite_image_url(""), "");
    }

    #[test]
    fn unlisted_host_unchanged() {
        let url = "https://images.example.com/a.jpg?x=1&y=2";
        assert_eq!(rewrite_image_url(url), url);
    }

    #[test]
    fn listed_host_is_proxied_and_encoded_once() {
        let url = "https://mmbiz.qpic.cn/mmbiz_jpg/abc/640?wx_fmt=jpeg&from=appmsg";
        let rewritten = rewrite_image_url(url);
        assert_eq!(
            rewritten,
            "/api/proxy/image?url=https%3A%2F%2Fmmbiz.qpic.cn%2Fmmbiz_jpg%2Fabc%2F640%3Fwx_fmt%3Djpeg%26from%3Dappmsg"
        );
        let encoded = rewritten.trim_start_matches("/api/proxy/image?url=");
        assert_eq!(urlencoding::decode(encoded).unwrap(), url);
    }

    #[test]
    fn every_allowlisted_host_is_proxied() {
        for host in ANTI_HOTLINK_HOSTS {
            let url = format!("https://{}/img.png", host.domain);
            assert!(rewrite_image_url(&url).starts_with(PROXY_IMAGE_PATH));
        }
    }

    #[test]
    fn subdomain_of_listed_host_is_proxied() {
        assert!(rewrite_image_url("https://a.wx.qpic.cn/x.png").starts_with(PROXY_IMAGE_PATH));
    }

    #[test]
    fn host_match_ignores_path() {
        let url = "https://cdn.example.com/mmbiz.qpic.cn/x.png";
        assert_eq!(rewrite_image_url(url), url);
    }

    #[test]
    fn unparseable_input_unchanged() {
        assert_eq!(rewrite_image_url("not a url"), "not a url");
    }

    #[test]
    fn custom_allowlist() {
        let list = [HotlinkHost {
            domain: "cdn.test",
            referer: None,
            user_agent: DESKTOP_USER_AGENT,
        }];
        assert!(rewrite_with("http://cdn.test/x.png", &list).starts_with(PROXY_IMAGE_PATH));
        assert_eq!(
            rewrite_with("https://mmbiz.qpic.cn/x.png", &list),
            "https://mmbiz.qpic.cn/x.png"
        );
    }
}
