use crate::models::{PageType, WikiPage};
use anyhow::{Context, Result};
use bzip2::read::BzDecoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::fs::File;
use std::io::{BufRead, BufReader};
use tracing::warn;

const READ_BUFFER: usize = 256 * 1024;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    None,
    Title,
    Ns,
    Id,
    Timestamp,
    Text,
}

#[derive(Default)]
struct PageBuilder {
    id: Option<u32>,
    title: String,
    ns: Option<i32>,
    timestamp: Option<String>,
    redirect: Option<String>,
    text: Option<String>,
}

impl PageBuilder {
    fn finish(self) -> WikiPage {
        let page_type = match (self.redirect, self.ns) {
            (Some(target), _) => PageType::Redirect(target),
            (None, Some(0) | None) => PageType::Article,
            (None, Some(_)) => PageType::Special,
        };
        WikiPage {
            id: self.id.unwrap_or(0),
            title: self.title,
            ns: self.ns,
            timestamp: self.timestamp,
            page_type,
            text: self.text,
        }
    }
}

/// Streaming reader over a MediaWiki XML export, plain or bz2-compressed.
///
/// Yields one [`WikiPage`] per `<page>` element. A read error ends the
/// iteration after being logged.
pub struct WikiReader {
    reader: Reader<Box<dyn BufRead + Send>>,
    buf: Vec<u8>,
    skip_text: bool,
    done: bool,
}

impl WikiReader {
    pub fn new(path: &str, skip_text: bool) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Failed to open dump: {}", path))?;
        let inner: Box<dyn BufRead + Send> = if path.ends_with(".bz2") {
            Box::new(BufReader::with_capacity(READ_BUFFER, BzDecoder::new(file)))
        } else {
            Box::new(BufReader::with_capacity(READ_BUFFER, file))
        };
        Ok(Self::from_reader(inner, skip_text))
    }

    pub fn from_reader(inner: Box<dyn BufRead + Send>, skip_text: bool) -> Self {
        Self {
            reader: Reader::from_reader(inner),
            buf: Vec::with_capacity(64 * 1024),
            skip_text,
            done: false,
        }
    }

    fn next_page(&mut self) -> Result<Option<WikiPage>> {
        let mut page: Option<PageBuilder> = None;
        let mut in_revision = false;
        let mut field = Field::None;

        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(e) => match e.name().as_ref() {
                    b"page" => {
                        page = Some(PageBuilder::default());
                        in_revision = false;
                    }
                    b"revision" => in_revision = true,
                    b"title" => field = Field::Title,
                    b"ns" => field = Field::Ns,
                    b"id" if !in_revision => field = Field::Id,
                    b"timestamp" => field = Field::Timestamp,
                    b"text" => {
                        field = Field::Text;
                        if let (Some(p), false) = (page.as_mut(), self.skip_text) {
                            p.text = Some(String::new());
                        }
                    }
                    b"redirect" => {
                        if let Some(p) = page.as_mut() {
                            p.redirect = redirect_target(&e)?;
                        }
                    }
                    _ => {}
                },
                Event::Empty(e) => match e.name().as_ref() {
                    b"redirect" => {
                        if let Some(p) = page.as_mut() {
                            p.redirect = redirect_target(&e)?;
                        }
                    }
                    b"text" => {
                        if let (Some(p), false) = (page.as_mut(), self.skip_text) {
                            p.text = Some(String::new());
                        }
                    }
                    _ => {}
                },
                Event::Text(e) => {
                    if let Some(p) = page.as_mut() {
                        if field != Field::None {
                            let value = e.unescape()?;
                            p.push_field(field, &value);
                        }
                    }
                }
                Event::CData(e) => {
                    if let Some(p) = page.as_mut() {
                        if field != Field::None {
                            let raw = e.into_inner();
                            p.push_field(field, &String::from_utf8_lossy(&raw));
                        }
                    }
                }
                Event::End(e) => match e.name().as_ref() {
                    b"page" => {
                        if let Some(p) = page.take() {
                            return Ok(Some(p.finish()));
                        }
                    }
                    b"revision" => in_revision = false,
                    _ => field = Field::None,
                },
                Event::Eof => return Ok(None),
                _ => {}
            }
        }
    }
}

impl PageBuilder {
    fn push_field(&mut self, field: Field, value: &str) {
        match field {
            Field::Title => self.title.push_str(value),
            Field::Ns => self.ns = value.trim().parse().ok(),
            Field::Id => {
                if self.id.is_none() {
                    self.id = value.trim().parse().ok();
                }
            }
            Field::Timestamp => self.timestamp = Some(value.trim().to_string()),
            Field::Text => {
                if let Some(text) = self.text.as_mut() {
                    text.push_str(value);
                }
            }
            Field::None => {}
        }
    }
}

fn redirect_target(e: &BytesStart<'_>) -> Result<Option<String>> {
    match e.try_get_attribute("title")? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(Some(String::new())),
    }
}

impl Iterator for WikiReader {
    type Item = WikiPage;

    fn next(&mut self) -> Option<WikiPage> {
        if self.done {
            return None;
        }
        match self.next_page() {
            Ok(Some(page)) => Some(page),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                warn!(error = %e, "Stopping dump read after XML error");
                self.done = true;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader_for(xml: &str, skip_text: bool) -> WikiReader {
        WikiReader::from_reader(Box::new(Cursor::new(xml.as_bytes().to_vec())), skip_text)
    }

    const SAMPLE: &str = r#"<mediawiki>
  <page>
    <title>frei</title>
    <ns>0</ns>
    <id>7</id>
    <revision>
      <id>900</id>
      <timestamp>2022-07-01T00:00:00Z</timestamp>
      <text xml:space="preserve">==German==
# [[free]] &amp; easy</text>
    </revision>
  </page>
  <page>
    <title>Frei</title>
    <ns>0</ns>
    <id>8</id>
    <redirect title="frei" />
    <revision>
      <id>901</id>
      <text>#REDIRECT [[frei]]</text>
    </revision>
  </page>
  <page>
    <title>Wiktionary:Main Page</title>
    <ns>4</ns>
    <id>9</id>
    <revision>
      <id>902</id>
      <text />
    </revision>
  </page>
</mediawiki>"#;

    #[test]
    fn reads_pages_in_order() {
        let pages: Vec<_> = reader_for(SAMPLE, false).collect();
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].title, "frei");
        assert_eq!(pages[0].id, 7);
        assert_eq!(pages[1].id, 8);
    }

    #[test]
    fn revision_id_does_not_override_page_id() {
        let pages: Vec<_> = reader_for(SAMPLE, false).collect();
        assert_eq!(pages[0].id, 7);
    }

    #[test]
    fn unescapes_text() {
        let pages: Vec<_> = reader_for(SAMPLE, false).collect();
        assert_eq!(
            pages[0].text.as_deref(),
            Some("==German==\n# [[free]] & easy")
        );
    }

    #[test]
    fn classifies_page_types() {
        let pages: Vec<_> = reader_for(SAMPLE, false).collect();
        assert_eq!(pages[0].page_type, PageType::Article);
        assert_eq!(pages[1].page_type, PageType::Redirect("frei".to_string()));
        assert_eq!(pages[2].page_type, PageType::Special);
        assert!(pages[0].is_entry());
        assert!(!pages[1].is_entry());
    }

    #[test]
    fn skip_text_leaves_text_empty() {
        let pages: Vec<_> = reader_for(SAMPLE, true).collect();
        assert!(pages.iter().all(|p| p.text.is_none()));
    }

    #[test]
    fn reads_timestamp() {
        let pages: Vec<_> = reader_for(SAMPLE, true).collect();
        assert_eq!(pages[0].timestamp.as_deref(), Some("2022-07-01T00:00:00Z"));
        assert_eq!(pages[1].timestamp, None);
    }

    #[test]
    fn truncated_xml_stops_cleanly() {
        let pages: Vec<_> = reader_for("<mediawiki><page><title>x</title>", false).collect();
        assert!(pages.is_empty());
    }
}
