// ABOUTME: Last-resort placeholder document built purely from the URL.
// ABOUTME: Used when static extraction yields low-quality content; never fails.

use url::Url;

use crate::result::ExtractionResult;
use crate::strategy::Target;

/// Path-derived titles must be longer than this to be used.
const MIN_PATH_TITLE_CHARS: usize = 5;

pub const FALLBACK_EXCERPT: &str =
    "Content could not be extracted automatically. 无法自动提取内容，请查看原文。";

/// Build the placeholder result for a URL whose content could not be recovered.
pub fn placeholder(target: &Target) -> ExtractionResult {
    ExtractionResult {
        url: target.raw.clone(),
        title: title_from_url(&target.url),
        content: placeholder_content(&target.raw),
        excerpt: FALLBACK_EXCERPT.to_string(),
        image_url: String::new(),
    }
}

fn placeholder_content(url: &str) -> String {
    format!(
        "The content of this page could not be extracted automatically. \
The site probably renders its content with JavaScript or restricts automated access.\n\n\
无法自动提取此页面的内容。这可能是因为该网站使用了JavaScript动态加载内容或设置了访问限制。\n\n\
Please open the original page to read it. 请点击原文链接查看完整内容。\n\n\
Original URL / 原文链接：{}",
        url
    )
}

/// Derive a readable title from the URL.
///
/// Uses the last path segment when it is descriptive enough, otherwise
/// "Article from {host}".
pub fn title_from_url(url: &Url) -> String {
    if let Some(title) = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(title_from_segment)
    {
        if title.chars().count() > MIN_PATH_TITLE_CHARS {
            return title;
        }
    }

    let host = url.host_str().unwrap_or_default();
    let domain = host.strip_prefix("www.").unwrap_or(host);
    format!("Article from {}", domain)
}

fn title_from_segment(segment: &str) -> String {
    let decoded = urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    let stem = decoded.split('.').next().unwrap_or_default();
    stem.replace(['-', '_'], " ")
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
