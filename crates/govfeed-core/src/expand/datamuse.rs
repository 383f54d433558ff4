use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::{clean_terms, TermExpander};
use crate::{Error, Result};

const REQUEST_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Deserialize)]
struct DatamuseWord {
    word: String,
}

/// Related words from the Datamuse "means like" endpoint
pub struct DatamuseExpander {
    client: Client,
    base_url: Url,
    max_terms: usize,
}

impl DatamuseExpander {
    pub fn new(base_url: &str, max_terms: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
            max_terms,
        })
    }

    fn request_url(&self, term: &str) -> Result<Url> {
        let mut url = self.base_url.join("words")?;
        url.query_pairs_mut()
            .append_pair("ml", term)
            .append_pair("max", &(self.max_terms * 2).to_string());
        Ok(url)
    }
}

fn parse_words(body: &[u8]) -> Result<Vec<String>> {
    let words: Vec<DatamuseWord> = serde_json::from_slice(body)?;
    Ok(words.into_iter().map(|w| w.word).collect())
}

#[async_trait::async_trait]
impl TermExpander for DatamuseExpander {
    async fn expand(&self, term: &str) -> Result<Vec<String>> {
        let url = self.request_url(term)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::ExpansionUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::ExpansionUnavailable(format!(
                "Datamuse returned HTTP {}",
                response.status()
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::ExpansionUnavailable(e.to_string()))?;
        let words = parse_words(&body).map_err(|e| Error::ExpansionUnavailable(e.to_string()))?;

        Ok(clean_terms(words, term, self.max_terms))
    }

    fn name(&self) -> &'static str {
        "datamuse"
    }
}
