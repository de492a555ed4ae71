// ABOUTME: Plain-text rendering of an element subtree.
// ABOUTME: Block elements become line breaks; scripts, styles and page chrome are skipped.

use ego_tree::NodeRef;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Node};

use crate::normalize::normalize_content;

/// Subtrees that never contribute text.
const SKIP_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "iframe", "svg", "canvas", "button", "select",
    "nav", "aside", "footer", "header", "form",
];

/// Elements rendered on their own line.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "blockquote", "dd", "div", "dl", "dt", "figcaption", "figure", "h1",
    "h2", "h3", "h4", "h5", "h6", "hr", "li", "main", "ol", "p", "pre", "section", "table", "tr",
    "ul",
];

static HORIZONTAL_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\S\n]+").unwrap());

fn collect(node: NodeRef<'_, Node>, out: &mut String, in_pre: bool) {
    match node.value() {
        Node::Text(text) if in_pre => out.push_str(text),
        Node::Text(text) => out.push_str(&HORIZONTAL_WS.replace_all(&text.replace('\n', " "), " ")),
        Node::Element(element) => {
            let tag = element.name();
            if SKIP_TAGS.contains(&tag) {
                return;
            }
            if tag == "br" {
                out.push('\n');
                return;
            }
            let block = BLOCK_TAGS.contains(&tag);
            if block {
                out.push('\n');
            }
            let in_pre = in_pre || tag == "pre";
            for child in node.children() {
                collect(child, out, in_pre);
            }
            if block {
                out.push('\n');
            }
        }
        _ => {}
    }
}

/// Render an element's visible text, one block per line.
pub fn element_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    let in_pre = element.value().name() == "pre";
    for child in element.children() {
        collect(child, &mut raw, in_pre);
    }
    normalize_content(&HORIZONTAL_WS.replace_all(&raw, " "))
}
