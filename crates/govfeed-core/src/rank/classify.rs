use crate::catalog::{DomainCategory, FeedSource, SourceCatalog};

pub const CATEGORY_GRANT: &str = "Grant";
pub const CATEGORY_OPPORTUNITY: &str = "Gov Opportunity";
pub const CATEGORY_OTHER: &str = "Other";

/// Keywords scanned in title, then description; order matters
const OPPORTUNITY_KEYWORDS: &[&str] = &["grant", "funding opportunity", "apply now", "call for proposals"];

/// Assigns a category label to an item
///
/// Precedence: source category hint, first matching domain row, opportunity
/// keyword, then [`CATEGORY_OTHER`].
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    domains: Vec<DomainCategory>,
}

impl Classifier {
    pub fn new(domains: Vec<DomainCategory>) -> Self {
        Self { domains }
    }

    pub fn from_catalog(catalog: &SourceCatalog) -> Self {
        Self::new(catalog.domain_categories().to_vec())
    }

    pub fn classify(&self, source: &FeedSource, title: &str, description: &str) -> String {
        if let Some(category) = source.category() {
            return category.to_string();
        }

        let url = source.url().to_lowercase();
        if let Some(row) = self.domains.iter().find(|d| url.contains(&d.domain)) {
            return row.category.clone();
        }

        let title = title.to_lowercase();
        let description = description.to_lowercase();
        let keyword = OPPORTUNITY_KEYWORDS
            .iter()
            .find(|kw| title.contains(*kw))
            .or_else(|| OPPORTUNITY_KEYWORDS.iter().find(|kw| description.contains(*kw)));

        match keyword {
            Some(&"grant") => CATEGORY_GRANT.to_string(),
            Some(_) => CATEGORY_OPPORTUNITY.to_string(),
            None => CATEGORY_OTHER.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn classifier() -> Classifier {
        Classifier::from_catalog(&SourceCatalog::from_config(&AppConfig::default()).unwrap())
    }

    fn source(url: &str) -> FeedSource {
        FeedSource::new(url).unwrap()
    }

    #[test]
    fn test_domain_table() {
        let c = classifier();
        assert_eq!(c.classify(&source("https://www.defenseone.com/rss/all/"), "x", ""), "News");
        assert_eq!(c.classify(&source("https://www.rand.org/topics/x.xml"), "grant", ""), "Think Tank");
        assert_eq!(c.classify(&source("https://www.gov.uk/mod.atom"), "x", ""), "International");
    }

    #[test]
    fn test_domain_table_order_wins() {
        let c = Classifier::new(vec![
            DomainCategory::new("army", "First"),
            DomainCategory::new("army.mil", "Second"),
        ]);
        assert_eq!(c.classify(&source("https://www.army.mil/rss"), "x", ""), "First");
    }

    #[test]
    fn test_keywords_when_no_domain_matches() {
        let c = classifier();
        let nsf = source("https://www.nsf.gov/rss/rss_www_news.xml");

        assert_eq!(c.classify(&nsf, "New GRANTS for rural clinics", ""), CATEGORY_GRANT);
        assert_eq!(c.classify(&nsf, "Program update", "Call for proposals opens"), CATEGORY_OPPORTUNITY);
        // title keywords are checked before the description
        assert_eq!(c.classify(&nsf, "Apply now", "grant details inside"), CATEGORY_OPPORTUNITY);
        assert_eq!(c.classify(&nsf, "Quarterly newsletter", "nothing here"), CATEGORY_OTHER);
    }

    #[test]
    fn test_source_hint_takes_precedence() {
        let c = classifier();
        let src = source("https://www.defenseone.com/special").with_category("Federal Register");
        assert_eq!(c.classify(&src, "grant", ""), "Federal Register");
    }

    #[test]
    fn test_classification_is_pure() {
        let c = classifier();
        let src = source("https://defence-blog.com/feed/");
        let first = c.classify(&src, "Funding opportunity announced", "");
        for _ in 0..10 {
            assert_eq!(c.classify(&src, "Funding opportunity announced", ""), first);
        }
    }
}
