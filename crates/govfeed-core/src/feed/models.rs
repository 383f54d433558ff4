use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::html_to_text;

/// One entry parsed from a source feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawItem {
    pub title: String,
    /// Identity key used for deduplication
    pub link: String,
    /// Summary or content body, possibly HTML
    pub description: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// A classified search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub description: String,
    /// `None` when the source gave no usable date
    pub published: Option<DateTime<Utc>>,
    pub category: String,
}

impl FeedItem {
    pub fn from_raw(raw: &RawItem, category: impl Into<String>) -> Self {
        Self {
            title: raw.title.clone(),
            link: raw.link.clone(),
            description: raw.description.clone(),
            published: raw.published_at,
            category: category.into(),
        }
    }

    /// Plain-text preview of the description (first N characters, whitespace collapsed)
    pub fn description_preview(&self, max_len: usize) -> String {
        if max_len == 0 {
            return String::new();
        }

        let text = html_to_text(&self.description);
        let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
        match flat.char_indices().nth(max_len) {
            Some((idx, _)) => format!("{}...", &flat[..idx]),
            None => flat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(description: &str) -> FeedItem {
        FeedItem {
            title: "t".to_string(),
            link: "https://example.com/a".to_string(),
            description: description.to_string(),
            published: None,
            category: "Other".to_string(),
        }
    }

    #[test]
    fn test_description_preview_respects_char_boundaries() {
        assert_eq!(item("défense budget").description_preview(3), "déf...");
        assert_eq!(item("short").description_preview(10), "short");
        assert_eq!(item("anything").description_preview(0), "");
    }

    #[test]
    fn test_description_preview_flattens_markup() {
        assert_eq!(item("  spread \n  over   lines ").description_preview(40), "spread over lines");
        assert_eq!(item("<p>Funding &amp; more</p>").description_preview(40), "Funding & more");
    }
}
