//! Federal Register `documents.json` responses.

use chrono::{NaiveDate, TimeZone, Utc};
use serde::Deserialize;

use super::models::RawItem;
use crate::{Error, Result};

#[derive(Debug, Deserialize)]
struct FederalResponse {
    #[serde(default)]
    results: Vec<FederalDoc>,
}

#[derive(Debug, Deserialize)]
struct FederalDoc {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    html_url: Option<String>,
    #[serde(rename = "abstract", default)]
    summary: Option<String>,
    #[serde(default)]
    publication_date: Option<String>,
}

/// Parse a Federal Register documents listing into raw items
pub fn parse_federal_register(content: &[u8], url: &str) -> Result<Vec<RawItem>> {
    let response: FederalResponse =
        serde_json::from_slice(content).map_err(|e| Error::malformed(url, e))?;

    let items = response
        .results
        .into_iter()
        .filter_map(|doc| {
            let link = doc.html_url.filter(|l| !l.trim().is_empty())?;
            let published_at = doc
                .publication_date
                .as_deref()
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| Utc.from_utc_datetime(&dt));

            Some(RawItem {
                title: doc.title.unwrap_or_default(),
                link,
                description: doc.summary.unwrap_or_default(),
                published_at,
            })
        })
        .collect();

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_documents() {
        let body = r#"{
            "count": 2,
            "results": [
                {
                    "title": "Small Business Innovation Research Grant Program",
                    "html_url": "https://www.federalregister.gov/d/2024-1",
                    "abstract": "Notice of funding opportunity.",
                    "publication_date": "2024-10-01"
                },
                {
                    "title": "Undated notice",
                    "html_url": "https://www.federalregister.gov/d/2024-2",
                    "abstract": null,
                    "publication_date": "sometime"
                },
                { "title": "No link" }
            ]
        }"#;

        let items = parse_federal_register(body.as_bytes(), "https://www.federalregister.gov/api").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].link, "https://www.federalregister.gov/d/2024-1");
        assert_eq!(
            items[0].published_at,
            Some(Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(items[1].published_at, None);
        assert_eq!(items[1].description, "");
    }

    #[test]
    fn test_non_json_is_malformed() {
        let err = parse_federal_register(b"<rss/>", "https://www.federalregister.gov/api").unwrap_err();
        assert!(matches!(err, Error::SourceMalformed { .. }));
    }
}
