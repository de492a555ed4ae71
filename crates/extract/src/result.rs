// ABOUTME: ExtractionResult struct holding the structured document produced for one URL.
// ABOUTME: Includes formatting helpers used by the CLI.

use serde::{Deserialize, Serialize};

/// The structured document produced by one extraction attempt.
///
/// `title` and `content` are always plain text. Missing data is an empty
/// string or a placeholder message, never HTML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ExtractionResult {
    pub url: String,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub image_url: String,
}

impl ExtractionResult {
    /// Format the result as a markdown document.
    pub fn format_markdown(&self) -> String {
        let mut parts = Vec::new();

        if !self.title.is_empty() {
            parts.push(format!("# {}", self.title));
        }

        if !self.url.is_empty() {
            parts.push(format!("Source: {}", self.url));
        }

        if !self.excerpt.is_empty() {
            parts.push(format!("> {}", self.excerpt));
        }

        if self.has_image() {
            parts.push(format!("![Lead Image]({})", self.image_url));
        }

        if !parts.is_empty() && !self.content.is_empty() {
            parts.push("---".to_string());
        }

        if !self.content.is_empty() {
            // Single newlines would collapse into one paragraph in markdown.
            parts.push(self.content.replace('\n', "\n\n"));
        }

        parts.join("\n\n")
    }

    /// Returns true if the result has neither title nor content.
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.content.is_empty()
    }

    /// Returns true if the result has a representative image.
    pub fn has_image(&self) -> bool {
        !self.image_url.is_empty()
    }
}
