use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use url::Url;

use crate::{Error, Result};

/// A feed outline extracted from an OPML file
#[derive(Debug, Clone)]
pub struct OpmlOutline {
    pub url: String,
    pub name: Option<String>,
}

/// Parse OPML file and extract feed outlines
pub fn parse_opml_file(path: &Path) -> Result<Vec<OpmlOutline>> {
    let content = std::fs::read_to_string(path)?;
    parse_opml(&content)
}

/// Parse OPML content string
///
/// Attribute values are unescaped, so `&amp;` in a query string becomes `&`.
/// An outline whose `xmlUrl` is not an http(s) URL is an error naming its line.
pub fn parse_opml(content: &str) -> Result<Vec<OpmlOutline>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut outlines = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"outline" => {
                let line = line_at(content, reader.buffer_position());
                // Folders carry no xmlUrl
                if let Some(outline) = outline_from(&e, line)? {
                    outlines.push(outline);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                let line = line_at(content, reader.error_position());
                return Err(Error::Config(format!("Failed to parse OPML at line {}: {}", line, e)));
            }
            _ => {}
        }
    }

    Ok(outlines)
}

fn outline_from(e: &BytesStart<'_>, line: usize) -> Result<Option<OpmlOutline>> {
    let mut xml_url = None;
    let mut title = None;
    let mut text = None;

    for attr in e.attributes().flatten() {
        let slot = match attr.key.as_ref() {
            b"xmlUrl" => &mut xml_url,
            b"title" => &mut title,
            b"text" => &mut text,
            _ => continue,
        };
        let value = attr
            .unescape_value()
            .map_err(|err| Error::Config(format!("OPML line {}: bad attribute value: {}", line, err)))?;
        *slot = Some(value.trim().to_string());
    }

    let Some(url) = xml_url.filter(|u| !u.is_empty()) else {
        return Ok(None);
    };

    match Url::parse(&url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
        _ => {
            return Err(Error::Config(format!(
                "OPML line {}: feed URL must be http(s): {}",
                line, url
            )));
        }
    }

    let name = title.or(text).filter(|n| !n.is_empty());
    Ok(Some(OpmlOutline { url, name }))
}

/// 1-based line of a byte offset
fn line_at(content: &str, position: u64) -> usize {
    let end = (position as usize).min(content.len());
    content.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_opml() {
        let opml = r#"<?xml version="1.0" encoding="UTF-8"?>
<opml version="2.0">
  <head><title>Sources</title></head>
  <body>
    <outline text="Grants">
      <outline text="NSF" title="NSF Funding" xmlUrl="https://www.nsf.gov/rss/funding.xml" type="rss"/>
      <outline text="NIH" xmlUrl="https://grants.nih.gov/feed.xml" type="rss"/>
    </outline>
    <outline text="Loose" xmlUrl="https://example.com/feed.xml" type="rss"/>
  </body>
</opml>"#;

        let outlines = parse_opml(opml).unwrap();
        assert_eq!(outlines.len(), 3);
        assert_eq!(outlines[0].name.as_deref(), Some("NSF Funding")); // title wins over text
        assert_eq!(outlines[1].name.as_deref(), Some("NIH"));
        assert_eq!(outlines[2].url, "https://example.com/feed.xml");
    }

    #[test]
    fn test_parse_opml_skips_empty_folders() {
        let opml = r#"<?xml version="1.0" encoding="UTF-8"?>
<opml version="2.0">
  <body>
    <outline text="Empty Category"/>
  </body>
</opml>"#;

        assert!(parse_opml(opml).unwrap().is_empty());
    }

    #[test]
    fn test_parse_opml_unescapes_query_strings() {
        let opml = r#"<opml version="2.0"><body>
<outline text="Register" xmlUrl="https://www.federalregister.gov/api/v1/documents.rss?per_page=20&amp;order=newest"/>
</body></opml>"#;

        let outlines = parse_opml(opml).unwrap();
        assert_eq!(
            outlines[0].url,
            "https://www.federalregister.gov/api/v1/documents.rss?per_page=20&order=newest"
        );
        assert_eq!(outlines[0].name.as_deref(), Some("Register"));
    }

    #[test]
    fn test_parse_opml_rejects_non_http_urls_with_line() {
        let opml = "<opml version=\"2.0\">\n<body>\n<outline text=\"ok\" xmlUrl=\"https://example.com/rss\"/>\n<outline text=\"bad\" xmlUrl=\"ftp://example.com/rss\"/>\n</body>\n</opml>";

        match parse_opml(opml) {
            Err(Error::Config(msg)) => {
                assert!(msg.contains("line 4"), "{}", msg);
                assert!(msg.contains("ftp://example.com/rss"), "{}", msg);
            }
            other => panic!("expected config error, got {:?}", other),
        }
    }
}
