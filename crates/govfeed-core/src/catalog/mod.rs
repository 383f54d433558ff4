//! Static list of feed endpoints and the ordered domain -> category table.
//!
//! The catalog is built once from configuration and shared read-only by
//! every search; changing it requires a restart.

mod opml;

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

pub use opml::{parse_opml, parse_opml_file, OpmlOutline};

use crate::config::AppConfig;
use crate::{Error, Result};

/// Wire format served by a source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// RSS, Atom or JSON Feed document
    #[default]
    Rss,
    /// Federal Register `documents.json` API
    FederalRegister,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rss => "rss",
            Self::FederalRegister => "federal_register",
        }
    }
}

/// One remote feed endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSource {
    id: String,
    url: String,
    kind: SourceKind,
    name: String,
    category: Option<String>,
}

impl FeedSource {
    /// Create an RSS source, validating the URL
    pub fn new(url: &str) -> Result<Self> {
        Self::with_kind(url, SourceKind::Rss)
    }

    pub fn with_kind(url: &str, kind: SourceKind) -> Result<Self> {
        let parsed = Url::parse(url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Config(format!("Unsupported feed URL scheme: {}", url)));
        }

        let name = parsed.host_str().unwrap_or(url).to_string();

        Ok(Self {
            id: url.to_string(),
            url: url.to_string(),
            kind,
            name,
            category: None,
        })
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Pin every item of this source to one category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Cache key; the endpoint URL
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }
}

/// One row of the domain -> category table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainCategory {
    /// Case-insensitive fragment matched against the source URL
    pub domain: String,
    pub category: String,
}

impl DomainCategory {
    pub fn new(domain: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            domain: domain.into().to_lowercase(),
            category: category.into(),
        }
    }
}

/// Ordered, de-duplicated set of sources plus the classification table
#[derive(Debug, Clone, Default)]
pub struct SourceCatalog {
    sources: Vec<Arc<FeedSource>>,
    domain_categories: Vec<DomainCategory>,
}

impl SourceCatalog {
    /// Build a catalog; later duplicates of a URL are dropped
    pub fn new(sources: Vec<FeedSource>, domain_categories: Vec<DomainCategory>) -> Self {
        let mut seen = HashSet::new();
        let sources = sources
            .into_iter()
            .filter(|s| {
                let fresh = seen.insert(s.id.clone());
                if !fresh {
                    tracing::debug!(source = %s.url, "Dropping duplicate catalog entry");
                }
                fresh
            })
            .map(Arc::new)
            .collect();

        Self {
            sources,
            domain_categories,
        }
    }

    /// Build the catalog from `[catalog]` configuration and the optional OPML file
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let mut sources = Vec::with_capacity(config.catalog.sources.len());

        for entry in &config.catalog.sources {
            let mut source = FeedSource::with_kind(&entry.url, entry.kind)?;
            if let Some(ref name) = entry.name {
                source = source.named(name.clone());
            }
            if let Some(ref category) = entry.category {
                source = source.with_category(category.clone());
            }
            sources.push(source);
        }

        if let Some(path) = config.opml_path() {
            let outlines = parse_opml_file(&path)?;
            tracing::info!(path = %path.display(), feeds = outlines.len(), "Loaded OPML sources");
            for outline in outlines {
                let mut source = FeedSource::new(&outline.url)?;
                if let Some(name) = outline.name {
                    source = source.named(name);
                }
                sources.push(source);
            }
        }

        let domain_categories = config
            .catalog
            .domain_categories
            .iter()
            .map(|d| DomainCategory::new(d.domain.clone(), d.category.clone()))
            .collect();

        Ok(Self::new(sources, domain_categories))
    }

    pub fn sources(&self) -> &[Arc<FeedSource>] {
        &self.sources
    }

    pub fn domain_categories(&self) -> &[DomainCategory] {
        &self.domain_categories
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_name_defaults_to_host() {
        let source = FeedSource::new("https://www.nsf.gov/rss/rss_www_news.xml").unwrap();
        assert_eq!(source.name(), "www.nsf.gov");
        assert_eq!(source.id(), "https://www.nsf.gov/rss/rss_www_news.xml");
        assert_eq!(source.kind(), SourceKind::Rss);
    }

    #[test]
    fn test_invalid_urls_rejected() {
        assert!(FeedSource::new("not a url").is_err());
        assert!(FeedSource::new("ftp://example.com/feed").is_err());
    }

    #[test]
    fn test_duplicates_dropped_in_order() {
        let urls = [
            "https://a.example.com/feed",
            "https://b.example.com/feed",
            "https://a.example.com/feed",
        ];
        let sources = urls.iter().map(|u| FeedSource::new(u).unwrap()).collect();
        let catalog = SourceCatalog::new(sources, Vec::new());

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.sources()[0].url(), "https://a.example.com/feed");
        assert_eq!(catalog.sources()[1].url(), "https://b.example.com/feed");
    }

    #[test]
    fn test_default_config_catalog_builds() {
        let catalog = SourceCatalog::from_config(&AppConfig::default()).unwrap();
        assert!(!catalog.is_empty());
        assert_eq!(catalog.domain_categories()[8].category, "International");

        let federal = catalog
            .sources()
            .iter()
            .find(|s| s.kind() == SourceKind::FederalRegister)
            .unwrap();
        assert_eq!(federal.category(), Some("Federal Register"));
    }

    #[test]
    fn test_domain_fragments_lowercased() {
        let row = DomainCategory::new("RAND.org", "Think Tank");
        assert_eq!(row.domain, "rand.org");
    }
}
