// ABOUTME: Per-platform site profiles used by the browser-driven strategy.
// ABOUTME: Each profile is static data: host patterns, selectors, thresholds and title suffixes.

//! Site profiles.
//!
//! A [`SiteProfile`] is chosen from the URL host by [`SiteProfile::classify`].
//! Everything the browser strategy needs to know about a platform lives in the
//! profile's [`ProfileSpec`], so supporting a new platform means adding a
//! variant and a table entry.

use std::fmt;

use url::Url;

/// Minimum trimmed text length for a candidate container to be accepted.
pub const MIN_CANDIDATE_TEXT_LEN: usize = 100;

/// Generic wait selectors polled after the profile-specific ones.
pub const GENERIC_WAIT_SELECTORS: &[&str] =
    &["article", "main", ".content", ".article-content", "h1"];

/// Static extraction data attached to a profile.
#[derive(Debug)]
pub struct ProfileSpec {
    pub name: &'static str,
    /// Host substrings that select this profile.
    pub host_patterns: &'static [&'static str],
    /// Selectors whose visibility signals that the page has rendered.
    pub wait_selectors: &'static [&'static str],
    /// Candidate content containers in priority order.
    pub content_selectors: &'static [&'static str],
    /// Nodes removed from a candidate before reading its text.
    pub strip_selectors: &'static [&'static str],
    pub min_text_len: usize,
    /// Fall back to whole-body text when no candidate passes.
    pub body_fallback: bool,
    pub title_suffixes: &'static [&'static str],
}

static WECHAT: ProfileSpec = ProfileSpec {
    name: "wechat",
    host_patterns: &["mp.weixin.qq.com"],
    wait_selectors: &[".rich_media_content", "#js_content", ".rich_media_title"],
    content_selectors: &[
        ".rich_media_content",
        "#js_content",
        ".rich_media_area_primary .rich_media_content",
        "[data-role=\"main\"]",
    ],
    strip_selectors: &[
        "script",
        "style",
        ".rich_media_tool",
        ".rich_media_meta",
        "[data-role=\"bottom\"]",
    ],
    min_text_len: MIN_CANDIDATE_TEXT_LEN,
    body_fallback: false,
    title_suffixes: &[" - 微信公众号", " - WeChat", " - 公众号"],
};

static ZHIHU: ProfileSpec = ProfileSpec {
    name: "zhihu",
    host_patterns: &["zhihu.com"],
    wait_selectors: &[
        ".Post-RichTextContainer",
        ".RichText",
        ".Post-content",
        ".ContentItem-title",
    ],
    content_selectors: &[
        ".Post-RichTextContainer",
        ".RichText",
        ".Post-content",
        ".ArticleItem-content",
        "[data-testid=\"article-content\"]",
        "article",
    ],
    strip_selectors: &[
        "script",
        "style",
        ".Post-NormalMain",
        ".ContentItem-actions",
    ],
    min_text_len: MIN_CANDIDATE_TEXT_LEN,
    body_fallback: false,
    title_suffixes: &[" - 知乎"],
};

static GENERIC: ProfileSpec = ProfileSpec {
    name: "generic",
    host_patterns: &[],
    wait_selectors: &[],
    content_selectors: &[
        "article",
        "main",
        ".content",
        ".article-content",
        ".post-content",
        ".entry-content",
        "[role=\"main\"]",
    ],
    strip_selectors: &[
        "script",
        "style",
        "nav",
        "header",
        "footer",
        "aside",
        ".sidebar",
        ".navigation",
    ],
    min_text_len: MIN_CANDIDATE_TEXT_LEN,
    body_fallback: true,
    title_suffixes: &[],
};

/// The closed set of platforms with dedicated extraction behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SiteProfile {
    WeChat,
    Zhihu,
    #[default]
    Generic,
}

impl SiteProfile {
    /// All profiles, most specific first.
    pub const ALL: [SiteProfile; 3] = [SiteProfile::WeChat, SiteProfile::Zhihu, SiteProfile::Generic];

    /// Classify a URL by host substring.
    pub fn classify(url: &Url) -> SiteProfile {
        let host = url.host_str().unwrap_or_default().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.spec().host_patterns.iter().any(|pat| host.contains(pat)))
            .unwrap_or_default()
    }

    pub fn spec(&self) -> &'static ProfileSpec {
        match self {
            SiteProfile::WeChat => &WECHAT,
            SiteProfile::Zhihu => &ZHIHU,
            SiteProfile::Generic => &GENERIC,
        }
    }

    /// Known JS-rendered platforms are routed to the browser first.
    pub fn prefers_browser(&self) -> bool {
        !matches!(self, SiteProfile::Generic)
    }

    /// Wait selectors: this profile's first, then the generic ones.
    pub fn wait_selectors(&self) -> Vec<&'static str> {
        let mut out: Vec<&'static str> = self.spec().wait_selectors.to_vec();
        for sel in GENERIC_WAIT_SELECTORS {
            if !out.contains(sel) {
                out.push(sel);
            }
        }
        out
    }

    /// Title suffixes across every profile.
    pub fn all_title_suffixes() -> impl Iterator<Item = &'static str> {
        Self::ALL
            .into_iter()
            .flat_map(|p| p.spec().title_suffixes.iter().copied())
    }
}

impl fmt::Display for SiteProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.spec().name)
    }
}
