// ABOUTME: The Strategy seam shared by every extraction path, plus the validated Target it runs on.
// ABOUTME: The client walks an ordered list of strategies in a single loop.

pub mod browser;
pub mod static_fetch;

use std::fmt;

use async_trait::async_trait;
use url::Url;

use crate::error::ExtractError;
use crate::result::ExtractionResult;
use crate::site::SiteProfile;

pub use browser::BrowserStrategy;
pub use static_fetch::StaticFetchStrategy;

/// A validated extraction target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// The caller's URL as given, trimmed; reported back in results.
    pub raw: String,
    pub url: Url,
    pub profile: SiteProfile,
}

impl Target {
    /// Parse an absolute http(s) URL with a host and classify it.
    pub fn parse(raw: &str) -> Result<Self, ExtractError> {
        if raw.trim().is_empty() {
            return Err(ExtractError::invalid_url(raw, "Extract", None));
        }
        let trimmed = raw.trim();
        let url = Url::parse(trimmed).map_err(|e| {
            ExtractError::invalid_url(raw, "Extract", Some(anyhow::anyhow!("malformed URL: {}", e)))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ExtractError::invalid_url(
                raw,
                "Extract",
                Some(anyhow::anyhow!("scheme must be http or https")),
            ));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(ExtractError::invalid_url(
                raw,
                "Extract",
                Some(anyhow::anyhow!("URL has no host")),
            ));
        }
        let profile = SiteProfile::classify(&url);
        Ok(Self {
            raw: trimmed.to_string(),
            url,
            profile,
        })
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }
}

/// How the client decides whether a strategy's result ends the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    /// Any result with a non-empty title is final.
    NonEmptyTitle,
    /// The result is final, after low-quality output is swapped for the placeholder.
    QualityGate,
}

/// One way of turning a URL into an [`ExtractionResult`].
#[async_trait]
pub trait Strategy: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Whether this strategy should be tried for the target at all.
    fn applies_to(&self, target: &Target) -> bool;

    fn acceptance(&self) -> Acceptance;

    async fn attempt(&self, target: &Target) -> Result<ExtractionResult, ExtractError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_classifies_host() {
        let t = Target::parse("https://mp.weixin.qq.com/s/abc").unwrap();
        assert_eq!(t.profile, SiteProfile::WeChat);
        assert_eq!(t.host(), "mp.weixin.qq.com");

        let t = Target::parse("https://zhuanlan.zhihu.com/p/1").unwrap();
        assert_eq!(t.profile, SiteProfile::Zhihu);

        let t = Target::parse("https://example.com/a").unwrap();
        assert_eq!(t.profile, SiteProfile::Generic);
    }

    #[test]
    fn target_keeps_the_callers_spelling() {
        let t = Target::parse("  https://example.com  ").unwrap();
        assert_eq!(t.raw, "https://example.com");
        assert_eq!(t.url.as_str(), "https://example.com/");
    }

    #[test]
    fn target_rejects_bad_input() {
        for raw in ["", "   ", "not a url", "ftp://example.com/file", "mailto:a@b.c", "file:///etc/hosts"] {
            let err = Target::parse(raw).unwrap_err();
            assert!(err.is_invalid_url(), "{raw:?} should be invalid");
        }
    }
}
