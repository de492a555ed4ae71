// ABOUTME: Readability-style candidate scoring over a parsed HTML document.
// ABOUTME: Scores paragraphs into ancestors, weights by class/id hints, discounts link-heavy nodes.

use std::collections::HashMap;

use ego_tree::NodeId;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static UNLIKELY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)banner|breadcrumb|combx|comment|community|cookie|disqus|footer|menu|modal|nav|popup|related|remark|rss|share|shoutbox|sidebar|social|sponsor|ad-break|agegate|pagination|pager")
        .unwrap()
});
static MAYBE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)and|article|body|column|content|main|shadow|post|story|entry|rich_?media|richtext")
        .unwrap()
});
static POSITIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)article|body|content|entry|hentry|main|page|post|text|blog|story|rich_?media|richtext")
        .unwrap()
});
static NEGATIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)hidden|banner|combx|comment|com-|contact|foot|footer|footnote|masthead|media|meta|outbrain|promo|related|scroll|share|shoutbox|sidebar|skyscraper|sponsor|shopping|tags|tool|widget|ad-")
        .unwrap()
});

/// Tags that never contain the article body.
const EXCLUDED_ANCESTORS: &[&str] = &["nav", "aside", "footer", "header", "form"];

/// Paragraph-like elements that feed scores upward.
const SCORED_SELECTOR: &str = "p, pre, td, blockquote";

/// Paragraphs shorter than this are ignored.
const MIN_PARAGRAPH_CHARS: usize = 25;

/// Score storage keyed by node id.
pub type NodeScores = HashMap<NodeId, f64>;

fn class_and_id(element: &ElementRef) -> String {
    format!(
        "{} {}",
        element.value().attr("class").unwrap_or(""),
        element.value().attr("id").unwrap_or("")
    )
}

/// Check whether an element looks like page chrome rather than content.
pub fn is_unlikely_candidate(element: &ElementRef) -> bool {
    let tag = element.value().name();
    if matches!(tag, "body" | "article" | "main") {
        return false;
    }
    let hints = class_and_id(element);
    UNLIKELY_RE.is_match(&hints) && !MAYBE_RE.is_match(&hints)
}

/// Class/id weight: +25 for content hints, -25 for boilerplate hints.
pub fn class_weight(element: &ElementRef) -> f64 {
    let mut weight = 0.0;
    for value in [element.value().attr("class"), element.value().attr("id")]
        .into_iter()
        .flatten()
    {
        if NEGATIVE_RE.is_match(value) {
            weight -= 25.0;
        }
        if POSITIVE_RE.is_match(value) {
            weight += 25.0;
        }
    }
    weight
}

fn tag_base_score(tag: &str) -> f64 {
    match tag {
        "article" => 10.0,
        "div" | "section" | "main" => 5.0,
        "pre" | "td" | "blockquote" => 3.0,
        "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" | "form" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" => -5.0,
        _ => 0.0,
    }
}

/// Ratio of link text to total text (0.0 when the element has no text).
pub fn link_density(element: &ElementRef) -> f64 {
    let total: usize = element.text().map(|t| t.chars().count()).sum();
    if total == 0 {
        return 0.0;
    }
    let a_selector = Selector::parse("a").unwrap();
    let linked: usize = element
        .select(&a_selector)
        .flat_map(|a| a.text())
        .map(|t| t.chars().count())
        .sum();
    linked as f64 / total as f64
}

/// Score a single paragraph's text: base point, commas, and length bonus.
fn paragraph_score(text: &str) -> f64 {
    let commas = text.chars().filter(|c| matches!(c, ',' | '，' | '、')).count();
    let length_bonus = (text.chars().count() / 100).min(3);
    1.0 + commas as f64 + length_bonus as f64
}

fn in_excluded_region(element: &ElementRef) -> bool {
    element.ancestors().filter_map(ElementRef::wrap).any(|anc| {
        EXCLUDED_ANCESTORS.contains(&anc.value().name()) || is_unlikely_candidate(&anc)
    })
}

/// Score candidate containers in the document.
///
/// Each paragraph adds its score to its parent and half of it to its
/// grandparent; a container's own tag and class weight are added once when it
/// is first seen.
pub fn score_content(doc: &Html) -> NodeScores {
    let mut scores: NodeScores = HashMap::new();
    let selector = Selector::parse(SCORED_SELECTOR).unwrap();

    for paragraph in doc.select(&selector) {
        let text: String = paragraph.text().collect();
        let text = text.trim();
        if text.chars().count() < MIN_PARAGRAPH_CHARS || in_excluded_region(&paragraph) {
            continue;
        }
        let score = paragraph_score(text);

        let ancestors = paragraph
            .ancestors()
            .filter_map(ElementRef::wrap)
            .take(2)
            .enumerate();
        for (level, ancestor) in ancestors {
            let entry = scores.entry(ancestor.id()).or_insert_with(|| {
                tag_base_score(ancestor.value().name()) + class_weight(&ancestor)
            });
            *entry += if level == 0 { score } else { score / 2.0 };
        }
    }

    scores
}

/// Pick the highest scoring container after the link-density discount.
pub fn top_candidate<'a>(doc: &'a Html, scores: &NodeScores) -> Option<ElementRef<'a>> {
    let all = Selector::parse("*").unwrap();
    let mut best: Option<(ElementRef<'a>, f64)> = None;

    for element in doc.select(&all) {
        let Some(&score) = scores.get(&element.id()) else {
            continue;
        };
        if matches!(element.value().name(), "html" | "body") {
            continue;
        }
        let adjusted = score * (1.0 - link_density(&element));
        if adjusted <= 0.0 {
            continue;
        }
        if best.map_or(true, |(_, s)| adjusted > s) {
            best = Some((element, adjusted));
        }
    }

    best.map(|(element, _)| element)
}

/// Tags never merged in as content siblings.
static NON_CONTENT_SIBLING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(br|b|i|label|hr|area|base|basefont|input|img|link|meta|script|style)$")
        .unwrap()
});

fn has_sentence_end(text: &str) -> bool {
    matches!(
        text.trim().chars().last(),
        Some('.' | '!' | '?' | ':' | ';' | '。' | '！' | '？' | '：' | '；')
    )
}

/// Collect the top candidate plus any siblings that look like part of the same article.
///
/// A sibling qualifies when its score, plus bonuses for low link density and a
/// class shared with the candidate, reaches max(10, top * 0.25). Bare
/// paragraphs qualify on length or a closing sentence. Document order is kept.
pub fn merge_siblings<'a>(candidate: ElementRef<'a>, scores: &NodeScores) -> Vec<ElementRef<'a>> {
    let Some(parent) = candidate.parent() else {
        return vec![candidate];
    };

    let top_score = scores.get(&candidate.id()).copied().unwrap_or(0.0);
    let threshold = (top_score * 0.25).max(10.0);
    let candidate_class = candidate.value().attr("class").unwrap_or("");

    let mut included = Vec::new();
    for sibling in parent.children().filter_map(ElementRef::wrap) {
        if sibling.id() == candidate.id() {
            included.push(sibling);
            continue;
        }

        let tag = sibling.value().name();
        if NON_CONTENT_SIBLING_RE.is_match(tag)
            || EXCLUDED_ANCESTORS.contains(&tag)
            || is_unlikely_candidate(&sibling)
        {
            continue;
        }

        let density = link_density(&sibling);
        if density >= 0.5 {
            continue;
        }

        if let Some(&score) = scores.get(&sibling.id()) {
            let mut bonus = 0.0;
            if density < 0.05 {
                bonus += 20.0;
            }
            let class = sibling.value().attr("class").unwrap_or("");
            if !class.is_empty() && class == candidate_class {
                bonus += top_score * 0.2;
            }
            if score + bonus >= threshold {
                included.push(sibling);
                continue;
            }
        }

        if tag == "p" {
            let text: String = sibling.text().collect();
            let len = text.split_whitespace().collect::<Vec<_>>().join(" ").chars().count();
            if (len > 80 && density < 0.25) || (len > 0 && density == 0.0 && has_sentence_end(&text)) {
                included.push(sibling);
            }
        }
    }
    included
}
