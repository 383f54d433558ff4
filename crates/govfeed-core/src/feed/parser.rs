use chrono::{DateTime, Utc};
use feed_rs::parser;

use super::models::RawItem;
use crate::{Error, Result};

/// Parse RSS/Atom/JSON Feed content into raw items
///
/// Entries without a link have no identity and are skipped.
pub fn parse_feed(content: &[u8], url: &str) -> Result<Vec<RawItem>> {
    let feed = parser::parse(content).map_err(|e| Error::malformed(url, e))?;

    let total = feed.entries.len();
    let items: Vec<RawItem> = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let link = entry.links.first().map(|l| l.href.trim().to_string())?;
            if link.is_empty() {
                return None;
            }

            let title = entry
                .title
                .map(|t| t.content.trim().to_string())
                .unwrap_or_default();

            let description = entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body))
                .unwrap_or_default();

            let published_at = entry
                .published
                .or(entry.updated)
                .map(DateTime::<Utc>::from);

            Some(RawItem {
                title,
                link,
                description,
                published_at,
            })
        })
        .collect();

    if items.len() < total {
        tracing::debug!(
            source = %url,
            skipped = total - items.len(),
            "Skipped feed entries without a link"
        );
    }

    Ok(items)
}

/// Convert HTML content to its visible plain text for matching
///
/// html2text appends link targets as `[N]: url` footnotes; those lines are
/// dropped so words that only occur inside an `href` never match.
pub fn html_to_text(html: &str) -> String {
    if !html.contains('<') && !html.contains('&') {
        return html.to_string();
    }

    let rendered = match html2text::from_read(html.as_bytes(), 200) {
        Ok(text) => text,
        Err(_) => return html.to_string(),
    };

    rendered
        .lines()
        .filter(|line| !is_link_footnote(line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_link_footnote(line: &str) -> bool {
    let Some(rest) = line.trim_start().strip_prefix('[') else {
        return false;
    };
    let digits = rest.chars().take_while(char::is_ascii_digit).count();
    digits > 0 && rest[digits..].starts_with("]: ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Defense Wire</title>
    <link>https://defense.example.com</link>
    <description>Test feed</description>
    <item>
      <title>Pentagon Cyber Defence Initiative Launched</title>
      <link>https://defense.example.com/cyber</link>
      <description>A new initiative for &lt;b&gt;cyber&lt;/b&gt; resilience.</description>
      <pubDate>Tue, 01 Oct 2024 12:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Undated Item</title>
      <link>https://defense.example.com/undated</link>
    </item>
    <item>
      <title>No Link Here</title>
      <description>Dropped</description>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_rss_items() {
        let items = parse_feed(RSS.as_bytes(), "https://defense.example.com/rss").unwrap();
        assert_eq!(items.len(), 2);

        let first = &items[0];
        assert_eq!(first.title, "Pentagon Cyber Defence Initiative Launched");
        assert_eq!(first.link, "https://defense.example.com/cyber");
        assert!(first.description.contains("cyber"));
        assert_eq!(
            first.published_at,
            Some(Utc.with_ymd_and_hms(2024, 10, 1, 12, 0, 0).unwrap())
        );

        assert_eq!(items[1].published_at, None);
        assert_eq!(items[1].description, "");
    }

    #[test]
    fn test_parse_atom_items() {
        let atom = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Ministry of Defence</title>
  <id>urn:example:mod</id>
  <updated>2024-10-02T09:30:00Z</updated>
  <entry>
    <title>Funding opportunity for SMEs</title>
    <id>urn:example:1</id>
    <link href="https://www.gov.uk/news/1"/>
    <updated>2024-10-02T09:30:00Z</updated>
    <summary>Apply now.</summary>
  </entry>
</feed>"#;

        let items = parse_feed(atom.as_bytes(), "https://www.gov.uk/mod.atom").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "https://www.gov.uk/news/1");
        assert_eq!(items[0].description, "Apply now.");
        // falls back to <updated> when <published> is missing
        assert!(items[0].published_at.is_some());
    }

    #[test]
    fn test_garbage_is_malformed() {
        let err = parse_feed(b"<html><body>not a feed", "https://x.example.com").unwrap_err();
        assert!(matches!(err, Error::SourceMalformed { .. }));
    }

    #[test]
    fn test_html_to_text_strips_markup() {
        let text = html_to_text("<p>Call for <b>proposals</b></p>");
        assert!(text.contains("Call for"));
        assert!(text.contains("proposals"));
        assert!(!text.contains("<b>"));
        assert_eq!(html_to_text("plain words"), "plain words");
    }

    #[test]
    fn test_html_to_text_drops_link_targets() {
        let text = html_to_text(r#"<p>See <a href="https://example.com/grant-awards">the list</a></p>"#);
        assert!(text.contains("the list"));
        assert!(!text.contains("grant-awards"));
        assert!(!text.contains("https://"));
    }

    #[test]
    fn test_link_footnote_detection() {
        assert!(is_link_footnote("[1]: https://example.com"));
        assert!(is_link_footnote("  [12]: https://example.com"));
        assert!(!is_link_footnote("[the list][1]"));
        assert!(!is_link_footnote("[]: nothing"));
    }
}
