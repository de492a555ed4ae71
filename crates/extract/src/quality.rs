// ABOUTME: Quality assessor deciding whether an extraction result is usable.
// ABOUTME: Pure predicate over title length, content length and block/loading markers.

use aho_corasick::AhoCorasick;
use once_cell::sync::Lazy;

use crate::result::ExtractionResult;

pub const MIN_TITLE_CHARS: usize = 3;
pub const MIN_CONTENT_CHARS: usize = 50;

/// Marker hits only count against content shorter than this.
pub const MARKER_CONTENT_CHARS: usize = 200;

/// Phrases typical of block pages, loaders, error pages and verification walls.
pub const BLOCK_MARKERS: &[&str] = &[
    "javascript",
    "请开启",
    "loading",
    "error",
    "404",
    "403",
    "access denied",
    "页面不存在",
    "内容加载中",
    "请稍后",
    "当前环境异常",
    "完成验证后即可继续访问",
];

static MARKERS: Lazy<AhoCorasick> =
    Lazy::new(|| AhoCorasick::new(BLOCK_MARKERS).expect("marker patterns are valid"));

/// Returns true when the result should be replaced by a placeholder.
pub fn is_low_quality(result: &ExtractionResult) -> bool {
    if result.title.trim().chars().count() < MIN_TITLE_CHARS {
        return true;
    }

    let content = result.content.trim();
    let content_chars = content.chars().count();
    if content_chars < MIN_CONTENT_CHARS {
        return true;
    }

    content_chars < MARKER_CONTENT_CHARS && MARKERS.is_match(&content.to_lowercase())
}
