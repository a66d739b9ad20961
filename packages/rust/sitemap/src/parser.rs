//! Streaming sitemap XML parser.
//!
//! Understands the two document types of the sitemaps protocol
//! (<https://www.sitemaps.org/protocol.html>):
//! - `<urlset>` — each `<url><loc>` is a page
//! - `<sitemapindex>` — each `<sitemap><loc>` is another sitemap
//!
//! Elements are matched by local name, so prefixed or default-namespaced
//! documents parse the same way.

use std::io::Cursor;

use quick_xml::Reader;
use quick_xml::events::Event;
use sitedocs_shared::{Result, SiteDocsError, SitemapEntry};
use url::Url;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which kind of sitemap document the root element declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitemapKind {
    /// `<urlset>`: locations are pages.
    UrlSet,
    /// `<sitemapindex>`: locations are child sitemaps.
    Index,
}

/// One-pass iterator over the `<loc>` entries of a sitemap document.
///
/// Owns the document bytes; consumed by iteration. Fetch the sitemap again
/// to read it a second time.
pub struct SitemapUrls {
    reader: Reader<Cursor<Vec<u8>>>,
    buf: Vec<u8>,
    kind: SitemapKind,
    depth: usize,
    in_loc: bool,
    loc_text: String,
    done: bool,
}

impl std::fmt::Debug for SitemapUrls {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SitemapUrls")
            .field("kind", &self.kind)
            .field("depth", &self.depth)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Start parsing a sitemap document.
///
/// Reads up to the root element and validates it; the remaining entries are
/// produced lazily by the returned iterator.
pub fn parse_sitemap(body: impl Into<Vec<u8>>) -> Result<SitemapUrls> {
    let mut reader = Reader::from_reader(Cursor::new(body.into()));
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let (kind, is_empty) = loop {
        buf.clear();
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| xml_error(&reader, e))?;

        match event {
            Event::Start(e) => break (root_kind(e.local_name().as_ref())?, false),
            Event::Empty(e) => break (root_kind(e.local_name().as_ref())?, true),
            Event::Text(_) | Event::CData(_) => {
                return Err(SiteDocsError::parse(
                    "document is not XML: text before the root element",
                ));
            }
            Event::Eof => {
                return Err(SiteDocsError::parse("sitemap document is empty"));
            }
            // Declaration, comments, processing instructions, doctype
            _ => {}
        }
    };

    Ok(SitemapUrls {
        reader,
        buf,
        kind,
        depth: 1,
        in_loc: false,
        loc_text: String::new(),
        done: is_empty,
    })
}

impl SitemapUrls {
    /// Document type declared by the root element.
    pub fn kind(&self) -> SitemapKind {
        self.kind
    }
}

impl Iterator for SitemapUrls {
    type Item = Result<SitemapEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }

            self.buf.clear();
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(e) => {
                    self.done = true;
                    return Some(Err(xml_error(&self.reader, e)));
                }
            };

            match event {
                Event::Start(e) => {
                    self.depth += 1;
                    if e.local_name().as_ref() == b"loc" {
                        self.in_loc = true;
                        self.loc_text.clear();
                    }
                }
                Event::End(e) => {
                    self.depth = self.depth.saturating_sub(1);
                    let closes_loc = e.local_name().as_ref() == b"loc";
                    if self.depth == 0 {
                        self.done = true;
                    }
                    if closes_loc && self.in_loc {
                        self.in_loc = false;
                        let text = self.loc_text.trim();
                        if !text.is_empty() {
                            let entry = to_entry(text);
                            if entry.is_err() {
                                self.done = true;
                            }
                            return Some(entry);
                        }
                    }
                }
                Event::Text(t) => {
                    if self.in_loc {
                        match t.unescape() {
                            Ok(text) => self.loc_text.push_str(&text),
                            Err(e) => {
                                self.done = true;
                                return Some(Err(SiteDocsError::parse(format!(
                                    "invalid text in <loc>: {e}"
                                ))));
                            }
                        }
                    }
                }
                Event::CData(c) => {
                    if self.in_loc {
                        self.loc_text
                            .push_str(&String::from_utf8_lossy(&c.into_inner()));
                    }
                }
                Event::Eof => {
                    self.done = true;
                    return Some(Err(SiteDocsError::parse(
                        "unexpected end of document: unclosed elements",
                    )));
                }
                _ => {}
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn root_kind(local_name: &[u8]) -> Result<SitemapKind> {
    match local_name {
        b"urlset" => Ok(SitemapKind::UrlSet),
        b"sitemapindex" => Ok(SitemapKind::Index),
        other => Err(SiteDocsError::parse(format!(
            "unexpected root element <{}>, expected <urlset> or <sitemapindex>",
            String::from_utf8_lossy(other)
        ))),
    }
}

fn to_entry(text: &str) -> Result<SitemapEntry> {
    let url = Url::parse(text)
        .map_err(|e| SiteDocsError::parse(format!("invalid <loc> URL {text:?}: {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(SitemapEntry { url }),
        scheme => Err(SiteDocsError::parse(format!(
            "unsupported scheme {scheme:?} in <loc> {text:?}"
        ))),
    }
}

fn xml_error(reader: &Reader<Cursor<Vec<u8>>>, err: quick_xml::Error) -> SiteDocsError {
    SiteDocsError::parse(format!(
        "malformed XML at byte {}: {err}",
        reader.error_position()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(xml: &str) -> Vec<String> {
        parse_sitemap(xml)
            .unwrap()
            .map(|e| e.unwrap().url.to_string())
            .collect()
    }

    #[test]
    fn parse_urlset_fixture() {
        let xml = include_str!("../../../../fixtures/sitemaps/urlset.xml");
        let parsed = parse_sitemap(xml).unwrap();
        assert_eq!(parsed.kind(), SitemapKind::UrlSet);

        let entries: Vec<_> = parsed.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].url.as_str(), "https://docs.example.com/");
        assert_eq!(
            entries[2].url.as_str(),
            "https://docs.example.com/guide/install?lang=en&v=2"
        );
    }

    #[test]
    fn parse_index_fixture() {
        let xml = include_str!("../../../../fixtures/sitemaps/index.xml");
        let parsed = parse_sitemap(xml).unwrap();
        assert_eq!(parsed.kind(), SitemapKind::Index);
        assert_eq!(parsed.count(), 2);
    }

    #[test]
    fn parse_prefixed_namespace() {
        let xml = r#"<?xml version="1.0"?>
<sm:urlset xmlns:sm="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sm:url><sm:loc>https://x.com/a</sm:loc></sm:url>
</sm:urlset>"#;
        assert_eq!(urls(xml), vec!["https://x.com/a"]);
    }

    #[test]
    fn parse_cdata_and_whitespace() {
        let xml = "<urlset><url><loc>\n  <![CDATA[https://x.com/a]]>\n</loc></url></urlset>";
        assert_eq!(urls(xml), vec!["https://x.com/a"]);
    }

    #[test]
    fn empty_loc_is_skipped() {
        let xml = "<urlset><url><loc> </loc></url><url><loc>https://x.com/b</loc></url></urlset>";
        assert_eq!(urls(xml), vec!["https://x.com/b"]);
    }

    #[test]
    fn empty_urlset_yields_nothing() {
        assert!(urls("<urlset/>").is_empty());
        assert!(urls("<urlset></urlset>").is_empty());
    }

    #[test]
    fn non_sitemap_root_fails() {
        let err = parse_sitemap("<html><body>Not found</body></html>").unwrap_err();
        assert!(matches!(err, SiteDocsError::Parse { .. }));
        assert!(err.to_string().contains("<html>"));
    }

    #[test]
    fn plain_text_fails() {
        let err = parse_sitemap("this is not xml").unwrap_err();
        assert!(matches!(err, SiteDocsError::Parse { .. }));
    }

    #[test]
    fn empty_document_fails() {
        assert!(parse_sitemap("").is_err());
    }

    #[test]
    fn mismatched_end_tag_fails_during_iteration() {
        let xml = "<urlset><url><loc>https://x.com/a</loc></url><url><loc>https://x.com/b</url></urlset>";
        let results: Vec<_> = parse_sitemap(xml).unwrap().collect();
        assert!(results[0].is_ok());
        assert!(results.last().unwrap().is_err());
        assert!(results.iter().all(|r| match r {
            Ok(e) => e.url.as_str() == "https://x.com/a",
            Err(_) => true,
        }));
    }

    #[test]
    fn truncated_document_fails() {
        let xml = "<urlset><url><loc>https://x.com/a</loc></url>";
        let results: Vec<_> = parse_sitemap(xml).unwrap().collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(SiteDocsError::Parse { .. })));
    }

    #[test]
    fn relative_loc_fails() {
        let xml = "<urlset><url><loc>/relative/page</loc></url></urlset>";
        let mut parsed = parse_sitemap(xml).unwrap();
        assert!(parsed.next().unwrap().is_err());
        assert!(parsed.next().is_none());
    }

    #[test]
    fn iterator_is_fused_after_error() {
        let xml = "<urlset><url><loc>ftp://x.com/a</loc></url><url><loc>https://x.com/b</loc></url></urlset>";
        let results: Vec<_> = parse_sitemap(xml).unwrap().collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }
}
