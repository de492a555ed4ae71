// ABOUTME: Content normalization, title cleanup and excerpt synthesis.
// ABOUTME: Shared by the static and browser strategies to shape the final document.

use crate::site::SiteProfile;

/// Maximum excerpt length (in characters) taken from a description.
pub const MAX_DESCRIPTION_EXCERPT: usize = 200;

/// Number of words taken from the body when no description is usable.
pub const EXCERPT_WORDS: usize = 30;

/// Excerpt used when neither description nor content has anything to offer.
pub const DEFAULT_EXCERPT: &str = "暂无摘要 (no summary available)";

/// Trim, drop blank lines and rejoin with single newlines.
pub fn normalize_content(content: &str) -> String {
    content
        .trim()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Trim a title and strip the first matching platform suffix.
pub fn clean_title(title: &str) -> String {
    let title = title.trim();
    for suffix in SiteProfile::all_title_suffixes() {
        if let Some(stripped) = title.strip_suffix(suffix) {
            return stripped.trim().to_string();
        }
    }
    title.to_string()
}

/// Build a short plain-text summary.
///
/// A description longer than 10 characters wins (cut at 200 characters).
/// Otherwise the first 30 words of the content are used.
pub fn create_excerpt(description: &str, content: &str) -> String {
    let description = description.trim();
    if description.chars().count() > 10 {
        if description.chars().count() > MAX_DESCRIPTION_EXCERPT {
            let cut: String = description.chars().take(MAX_DESCRIPTION_EXCERPT).collect();
            return format!("{}...", cut);
        }
        return description.to_string();
    }

    let words: Vec<&str> = content.split_whitespace().collect();
    if words.is_empty() {
        return DEFAULT_EXCERPT.to_string();
    }
    if words.len() > EXCERPT_WORDS {
        return format!("{}...", words[..EXCERPT_WORDS].join(" "));
    }
    words.join(" ")
}
