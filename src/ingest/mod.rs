// src/ingest/mod.rs
//! Feed normalizer: turns one raw feed document into a lazy stream of
//! uniform `RawEntry` values.

pub mod atom;
pub mod dates;
pub mod fetch;
pub mod preprint;
pub mod rss;
pub mod sources;
mod xml;

use chrono::NaiveDate;
use once_cell::sync::OnceCell;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::iter::FusedIterator;

use crate::error::ParseError;
use crate::types::{FeedSource, RawEntry};

use self::xml::XmlItems;

pub const TITLE_MAX_CHARS: usize = 500;
pub const SUMMARY_MAX_CHARS: usize = 4000;

/// Normalize text: decode entities, strip tags, collapse whitespace, cap length.
pub fn normalize_text(s: &str, max_chars: usize) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[a-z][^>]*>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace (also folds multi-line titles)
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Length cap
    if out.chars().count() > max_chars {
        out = out.chars().take(max_chars).collect();
    }
    out
}

/// Document shapes the normalizer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    Atom,
    Rss,
    PreprintJson,
}

/// Lazy, fused sequence of entries in document order. Re-parse to restart.
pub struct EntryStream<'a> {
    source: &'a FeedSource,
    inner: Inner<'a>,
}

enum Inner<'a> {
    Atom(XmlItems<'a>),
    Rss(XmlItems<'a>),
    Preprint(preprint::PreprintRecords),
}

impl EntryStream<'_> {
    pub fn format(&self) -> FeedFormat {
        match self.inner {
            Inner::Atom(_) => FeedFormat::Atom,
            Inner::Rss(_) => FeedFormat::Rss,
            Inner::Preprint(_) => FeedFormat::PreprintJson,
        }
    }
}

impl Iterator for EntryStream<'_> {
    type Item = Result<RawEntry, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            Inner::Atom(items) => items
                .next()
                .map(|r| r.and_then(|(idx, slice)| atom::parse_entry(idx, slice, self.source))),
            Inner::Rss(items) => items
                .next()
                .map(|r| r.and_then(|(idx, slice)| rss::parse_item(idx, slice, self.source))),
            Inner::Preprint(records) => records.next_entry(self.source),
        }
    }
}

impl FusedIterator for EntryStream<'_> {}

/// Sniff the document and return its entries. A document-level failure
/// (unknown shape, broken before the first entry) is an `Err`; per-entry
/// failures are yielded in-stream.
pub fn normalize<'a>(raw: &'a str, source: &'a FeedSource) -> Result<EntryStream<'a>, ParseError> {
    let doc = raw.trim_start_matches('\u{feff}').trim_start();
    if doc.starts_with('{') {
        let records = preprint::PreprintRecords::from_document(doc, source)?;
        return Ok(EntryStream {
            source,
            inner: Inner::Preprint(records),
        });
    }
    if !doc.starts_with('<') {
        return Err(ParseError::UnknownFormat(describe_prefix(doc)));
    }

    let mut reader = Reader::from_str(doc);
    let root = loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                break String::from_utf8_lossy(e.local_name().as_ref()).to_ascii_lowercase();
            }
            Ok(Event::Eof) => return Err(ParseError::Document("no root element".into())),
            Ok(_) => continue,
            Err(err) => {
                return Err(ParseError::Document(format!(
                    "at byte {}: {err}",
                    reader.buffer_position()
                )))
            }
        }
    };

    let inner = match root.as_str() {
        "feed" => Inner::Atom(XmlItems::new(doc, reader, b"entry")),
        "rss" | "rdf" => Inner::Rss(XmlItems::new(doc, reader, b"item")),
        other => return Err(ParseError::UnknownFormat(format!("root element <{other}>"))),
    };
    Ok(EntryStream { source, inner })
}

fn describe_prefix(doc: &str) -> String {
    let head: String = doc.chars().take(24).collect();
    format!("starts with {head:?}")
}

/// Inclusive publication window in UTC calendar days. Unknown dates pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedWindow {
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
}

impl PublishedWindow {
    pub fn contains(&self, published_at: u64) -> bool {
        if published_at == 0 {
            return true;
        }
        let Some(day) = i64::try_from(published_at)
            .ok()
            .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
            .map(|dt| dt.date_naive())
        else {
            return true;
        };
        self.since.map_or(true, |s| day >= s) && self.until.map_or(true, |u| day <= u)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_strips_markup_and_collapses_ws() {
        let s = "  <p>Deep&nbsp;&nbsp;learning\n   for <i>protein</i> folding.</p> ";
        assert_eq!(
            normalize_text(s, 100),
            "Deep learning for protein folding."
        );
    }

    #[test]
    fn normalize_text_respects_cap() {
        assert_eq!(normalize_text("abcdef", 3), "abc");
    }

    #[test]
    fn normalize_text_keeps_math_comparisons() {
        assert_eq!(normalize_text("p < 0.05 and n > 3", 100), "p < 0.05 and n > 3");
    }

    #[test]
    fn unknown_documents_are_rejected() {
        let src = FeedSource::new("x", "https://x.test", "x");
        assert!(matches!(
            normalize("hello world", &src),
            Err(ParseError::UnknownFormat(_))
        ));
        assert!(matches!(
            normalize("<html><body/></html>", &src),
            Err(ParseError::UnknownFormat(_))
        ));
    }

    #[test]
    fn window_is_inclusive_and_keeps_unknown_dates() {
        let w = PublishedWindow {
            since: NaiveDate::from_ymd_opt(2024, 3, 1),
            until: NaiveDate::from_ymd_opt(2024, 3, 15),
        };
        // 2024-03-01T00:00:00Z and 2024-03-15T23:59:59Z
        assert!(w.contains(1_709_251_200));
        assert!(w.contains(1_710_547_199));
        // 2024-03-16T00:00:00Z
        assert!(!w.contains(1_710_547_200));
        assert!(w.contains(0));
    }
}
