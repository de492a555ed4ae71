// ABOUTME: Generic readability-style main-content extraction for static HTML.
// ABOUTME: Produces title, plain-text body, meta description and a representative image URL.

//! Readability-style extraction.
//!
//! [`parse`] locates the highest-scoring content subtree (see [`scoring`]),
//! falls back to common article containers when scoring finds nothing
//! substantial, and renders the winner as plain text (see [`text`]).

pub mod scoring;
pub mod text;

use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Containers tried in order when scoring yields no usable candidate.
const FALLBACK_CONTAINERS: &[&str] = &["article", "main", "[role='main']", "body"];

/// A scored candidate with less text than this defers to the fallback containers.
const MIN_CANDIDATE_CHARS: usize = 80;

const TITLE_SELECTORS: &[(&str, Option<&str>)] = &[
    ("title", None),
    ("meta[property='og:title']", Some("content")),
    ("meta[name='title']", Some("content")),
    ("h1", None),
];

const DESCRIPTION_SELECTORS: &[&str] = &[
    "meta[name='description']",
    "meta[property='og:description']",
    "meta[name='twitter:description']",
];

const META_IMAGE_SELECTORS: &[&str] = &[
    "meta[property='og:image']",
    "meta[name='twitter:image']",
    "meta[property='twitter:image']",
];

/// What the readability pass recovered from a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Readable {
    pub title: String,
    pub text: String,
    pub description: Option<String>,
    /// Absolute URL of the representative image.
    pub image: Option<String>,
}

fn first_text(doc: &Html, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    doc.select(&selector)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .find(|t| !t.is_empty())
}

fn first_attr(doc: &Html, css: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    doc.select(&selector)
        .filter_map(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

fn extract_title(doc: &Html) -> Option<String> {
    TITLE_SELECTORS.iter().find_map(|(css, attr)| match attr {
        Some(attr) => first_attr(doc, css, attr),
        None => first_text(doc, css),
    })
}

fn extract_description(doc: &Html) -> Option<String> {
    DESCRIPTION_SELECTORS
        .iter()
        .find_map(|css| first_attr(doc, css, "content"))
}

fn content_image(root: ElementRef<'_>) -> Option<String> {
    let selector = Selector::parse("img").unwrap();
    root.select(&selector).find_map(|img| {
        ["src", "data-src", "data-original"]
            .iter()
            .filter_map(|attr| img.value().attr(attr))
            .map(str::trim)
            .find(|src| !src.is_empty() && !src.starts_with("data:"))
            .map(str::to_string)
    })
}

fn meta_image(doc: &Html) -> Option<String> {
    META_IMAGE_SELECTORS
        .iter()
        .find_map(|css| first_attr(doc, css, "content"))
}

fn resolve(base: &Url, src: &str) -> Option<String> {
    base.join(src)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https"))
        .map(|u| u.to_string())
}

fn fallback_container(doc: &Html) -> Option<ElementRef<'_>> {
    FALLBACK_CONTAINERS.iter().find_map(|css| {
        let selector = Selector::parse(css).ok()?;
        doc.select(&selector).next()
    })
}

/// Run the readability pass over raw HTML; `base` resolves relative image URLs.
pub fn parse(html: &str, base: &Url) -> Readable {
    let doc = Html::parse_document(html);
    let scores = scoring::score_content(&doc);

    let scored = scoring::top_candidate(&doc, &scores)
        .map(|el| scoring::merge_siblings(el, &scores))
        .map(|els| {
            let body = els
                .iter()
                .map(|el| text::element_text(*el))
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            (els, body)
        })
        .filter(|(_, t)| t.chars().count() >= MIN_CANDIDATE_CHARS);

    let (roots, body) = match scored {
        Some(found) => found,
        None => match fallback_container(&doc) {
            Some(el) => (vec![el], text::element_text(el)),
            None => (Vec::new(), String::new()),
        },
    };

    let image = roots
        .into_iter()
        .find_map(content_image)
        .or_else(|| meta_image(&doc))
        .and_then(|src| resolve(base, &src));

    Readable {
        title: extract_title(&doc).unwrap_or_default(),
        text: body,
        description: extract_description(&doc),
        image,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn base() -> Url {
        Url::parse("https://example.com/posts/one").unwrap()
    }

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("word{}", i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn article_without_paragraphs_uses_container() {
        let html = format!(
            "<html><head><title>Test</title></head><body><article>{}</article></body></html>",
            words(60)
        );
        let r = parse(&html, &base());
        assert_eq!(r.title, "Test");
        assert_eq!(r.text, words(60));
        assert_eq!(r.image, None);
    }

    #[test]
    fn scored_candidate_excludes_navigation() {
        let html = format!(
            "<html><head><title>T</title></head><body>\
             <div class='menu'><ul><li><a href='/'>Home</a></li><li><a href='/x'>About</a></li></ul></div>\
             <div class='post-content'><p>{}, with commas, and more.</p><p>{}.</p></div>\
             <div class='footer'>Copyright 2024</div></body></html>",
            words(40),
            words(30)
        );
        let r = parse(&html, &base());
        assert!(r.text.starts_with("word0 word1"));
        assert!(!r.text.contains("Home"));
        assert!(!r.text.contains("Copyright"));
        assert_eq!(r.text.lines().count(), 2);
    }

    #[test]
    fn every_article_section_is_kept() {
        let clauses = (0..30).map(|i| format!("word{},", i)).collect::<Vec<_>>().join(" ");
        let html = format!(
            "<html><head><title>Sections</title></head><body><article>\
             <div class='section'><p>{c} one.</p><p>{c} two.</p><p>{c} three.</p></div>\
             <div class='section'><p>SECONDSECTION begins, and then it goes on, and on.</p></div>\
             </article></body></html>",
            c = clauses
        );
        let r = parse(&html, &base());
        assert!(r.text.starts_with("word0, word1"));
        assert!(r.text.contains("SECONDSECTION begins"), "second section dropped: {}", r.text);
        assert_eq!(r.text.lines().count(), 4);
    }

    #[test]
    fn title_falls_back_to_og_then_h1() {
        let r = parse(
            "<html><head><meta property='og:title' content='OG Title'></head><body><h1>H</h1></body></html>",
            &base(),
        );
        assert_eq!(r.title, "OG Title");
        let r = parse("<html><body><h1>Heading</h1></body></html>", &base());
        assert_eq!(r.title, "Heading");
    }

    #[test]
    fn description_prefers_meta_description() {
        let r = parse(
            "<html><head><meta property='og:description' content='og'>\
             <meta name='description' content='plain'></head><body></body></html>",
            &base(),
        );
        assert_eq!(r.description.as_deref(), Some("plain"));
    }

    #[test]
    fn content_image_is_resolved_against_base() {
        let html = format!(
            "<html><head><meta property='og:image' content='https://cdn.example.com/og.jpg'></head>\
             <body><article><img src='/img/lead.png'><p>{}</p></article></body></html>",
            words(50)
        );
        let r = parse(&html, &base());
        assert_eq!(r.image.as_deref(), Some("https://example.com/img/lead.png"));
    }

    #[test]
    fn meta_image_used_when_content_has_none() {
        let html = format!(
            "<html><head><meta name='twitter:image' content='//cdn.example.com/tw.jpg'></head>\
             <body><article><p>{}</p></article></body></html>",
            words(50)
        );
        let r = parse(&html, &base());
        assert_eq!(r.image.as_deref(), Some("https://cdn.example.com/tw.jpg"));
    }

    #[test]
    fn empty_document_yields_empty_readable() {
        let r = parse("", &base());
        assert_eq!(r.title, "");
        assert_eq!(r.text, "");
    }
}
