//! Minimal Atom reader for GitHub commit feeds

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Newest entry of a commit feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct FeedEntry {
    /// `href` of the entry's first `<link>`
    pub link: String,
    /// Text of the entry's `<updated>`
    pub updated: String,
}

/// Control characters that are not legal in XML 1.0
fn is_illegal_xml_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0b | 0x0c | 0x0e..=0x1f | 0x7f)
}

/// Extract the first `<entry>` of an Atom document
pub(super) fn latest_entry(document: &[u8]) -> Result<FeedEntry, String> {
    let cleaned: Vec<u8> = document
        .iter()
        .copied()
        .filter(|b| !is_illegal_xml_byte(*b))
        .collect();
    let text = String::from_utf8_lossy(&cleaned);

    let mut reader = Reader::from_str(&text);
    reader.config_mut().trim_text(true);

    let mut depth = 0usize;
    let mut in_entry = false;
    let mut in_updated = false;
    let mut link: Option<String> = None;
    let mut updated: Option<String> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("invalid feed at byte {}: {e}", reader.buffer_position()))?;

        match event {
            Event::Start(e) => {
                depth += 1;
                if !in_entry && depth == 2 && e.local_name().as_ref() == b"entry" {
                    in_entry = true;
                } else if in_entry && depth == 3 {
                    match e.local_name().as_ref() {
                        b"link" if link.is_none() => link = href(&e)?,
                        b"updated" => in_updated = true,
                        _ => {}
                    }
                }
            }
            Event::Empty(e) => {
                if in_entry && depth == 2 && link.is_none() && e.local_name().as_ref() == b"link" {
                    link = href(&e)?;
                }
            }
            Event::Text(t) if in_updated => {
                let value = t.unescape().map_err(|e| format!("invalid updated tag: {e}"))?;
                updated = Some(value.into_owned());
            }
            Event::End(_) => {
                if in_updated && depth == 3 {
                    in_updated = false;
                }
                if in_entry && depth == 2 {
                    break;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !in_entry {
        return Err("no commits found in feed".to_string());
    }
    let link = link.ok_or_else(|| "no link tag found in feed entry".to_string())?;
    let updated = updated.ok_or_else(|| "no updated tag found in feed entry".to_string())?;
    Ok(FeedEntry { link, updated })
}

fn href(element: &BytesStart<'_>) -> Result<Option<String>, String> {
    let attr = element
        .try_get_attribute("href")
        .map_err(|e| format!("invalid link attribute: {e}"))?;
    attr.map(|a| {
        a.unescape_value()
            .map(|v| v.into_owned())
            .map_err(|e| format!("invalid link href: {e}"))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:media="http://search.yahoo.com/mrss/" xml:lang="en-US">
  <id>tag:github.com,2008:/foo/bar/commits/HEAD</id>
  <link type="text/html" rel="alternate" href="https://github.com/foo/bar/commits/HEAD"/>
  <title>Recent Commits to bar:HEAD</title>
  <updated>2024-02-02T00:00:00Z</updated>
  <entry>
    <id>tag:github.com,2008:Grit::Commit/abc123</id>
    <link type="text/html" rel="alternate" href="https://github.com/foo/bar/commit/abc123"/>
    <title>Fix things &amp; stuff</title>
    <updated>2024-01-01T10:00:00Z</updated>
    <author><name>someone</name><uri>https://github.com/someone</uri></author>
  </entry>
  <entry>
    <link type="text/html" rel="alternate" href="https://github.com/foo/bar/commit/older"/>
    <updated>2023-12-31T10:00:00Z</updated>
  </entry>
</feed>"#;

    #[test]
    fn reads_first_entry() {
        let entry = latest_entry(FEED.as_bytes()).unwrap();
        assert_eq!(entry.link, "https://github.com/foo/bar/commit/abc123");
        assert_eq!(entry.updated, "2024-01-01T10:00:00Z");
    }

    #[test]
    fn strips_control_characters() {
        let dirty = FEED.replace("Fix things", "Fix\u{1}\u{8} things");
        let entry = latest_entry(dirty.as_bytes()).unwrap();
        assert_eq!(entry.link, "https://github.com/foo/bar/commit/abc123");
    }

    #[test]
    fn empty_feed_has_no_commits() {
        let err = latest_entry(br#"<feed xmlns="http://www.w3.org/2005/Atom"></feed>"#).unwrap_err();
        assert!(err.contains("no commits"));
    }

    #[test]
    fn entry_without_updated_is_rejected() {
        let doc = br#"<feed><entry><link href="https://github.com/a/b/commit/c"/></entry></feed>"#;
        let err = latest_entry(doc).unwrap_err();
        assert!(err.contains("no updated tag"));
    }

    #[test]
    fn entry_without_link_is_rejected() {
        let doc = br#"<feed><entry><updated>2024-01-01T00:00:00Z</updated></entry></feed>"#;
        let err = latest_entry(doc).unwrap_err();
        assert!(err.contains("no link tag"));
    }
}
