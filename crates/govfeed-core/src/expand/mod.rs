//! Best-effort related-term lookup used to broaden deep searches.

mod datamuse;
mod openai;

use std::sync::Arc;

pub use datamuse::DatamuseExpander;
pub use openai::OpenAiExpander;

use crate::config::ExpansionConfig;
use crate::{Error, Result};

/// Trait for related-term providers
#[async_trait::async_trait]
pub trait TermExpander: Send + Sync {
    /// Terms related to `term`; errors are treated as "no expansion"
    async fn expand(&self, term: &str) -> Result<Vec<String>>;

    fn name(&self) -> &'static str;
}

/// Build the configured expander, or `None` when expansion is disabled
pub fn create_expander(config: &ExpansionConfig) -> Result<Option<Arc<dyn TermExpander>>> {
    if !config.enabled {
        return Ok(None);
    }

    let expander: Arc<dyn TermExpander> = match config.provider.as_str() {
        "datamuse" => Arc::new(DatamuseExpander::new(&config.datamuse_base_url, config.max_terms)?),
        "openai" => {
            let api_key = config
                .openai_api_key
                .as_ref()
                .ok_or_else(|| Error::Config("OpenAI API key not configured".to_string()))?;
            Arc::new(OpenAiExpander::new(api_key, &config.openai_model, config.max_terms))
        }
        other => {
            return Err(Error::Config(format!("Unknown expansion provider: {}", other)));
        }
    };

    tracing::info!(provider = expander.name(), "Term expansion enabled");
    Ok(Some(expander))
}

/// Normalize provider output: lower-case, trimmed, unique, capped
fn clean_terms<I, S>(raw: I, term: &str, max_terms: usize) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let term = term.to_lowercase();
    let mut out: Vec<String> = Vec::new();

    for candidate in raw {
        let candidate = candidate
            .as_ref()
            .trim()
            .trim_matches(|c: char| c == '"' || c == '.' || c == '\'')
            .to_lowercase();
        if candidate.is_empty() || candidate == term || out.contains(&candidate) {
            continue;
        }
        out.push(candidate);
        if out.len() >= max_terms {
            break;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_expansion_builds_nothing() {
        let expander = create_expander(&ExpansionConfig::default()).unwrap();
        assert!(expander.is_none());
    }

    #[test]
    fn test_openai_requires_key() {
        let config = ExpansionConfig {
            enabled: true,
            provider: "openai".to_string(),
            ..ExpansionConfig::default()
        };
        assert!(matches!(create_expander(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let config = ExpansionConfig {
            enabled: true,
            provider: "thesaurus".to_string(),
            ..ExpansionConfig::default()
        };
        assert!(matches!(create_expander(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_datamuse_provider_builds() {
        let config = ExpansionConfig {
            enabled: true,
            ..ExpansionConfig::default()
        };
        let expander = create_expander(&config).unwrap().unwrap();
        assert_eq!(expander.name(), "datamuse");
    }

    #[test]
    fn test_clean_terms() {
        let cleaned = clean_terms(
            [" UAV", "drone", "\"uav\"", "", "quadcopter.", "rpa", "uas"],
            "Drone",
            3,
        );
        assert_eq!(cleaned, vec!["uav", "quadcopter", "rpa"]);
    }
}
