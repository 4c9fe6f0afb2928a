// src/ingest/preprint.rs
//! bioRxiv / medRxiv "details" API documents: `{"collection": [ ... ]}`.

use serde::Deserialize;
use serde_json::Value;

use crate::error::ParseError;
use crate::ingest::dates::parse_feed_date;
use crate::ingest::sources::PreprintServer;
use crate::ingest::{normalize_text, SUMMARY_MAX_CHARS, TITLE_MAX_CHARS};
use crate::types::{FeedSource, RawEntry};

#[derive(Debug, Deserialize)]
struct Record {
    #[serde(default)]
    doi: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    authors: String,
    #[serde(default)]
    date: String,
    #[serde(rename = "abstract", default)]
    abstract_text: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    version: Option<Value>,
    #[serde(default)]
    server: Option<String>,
}

pub(crate) struct PreprintRecords {
    records: std::vec::IntoIter<Value>,
    index: usize,
    fallback_server: PreprintServer,
}

impl PreprintRecords {
    pub(crate) fn from_document(doc: &str, source: &FeedSource) -> Result<Self, ParseError> {
        let mut root: Value =
            serde_json::from_str(doc).map_err(|e| ParseError::Document(e.to_string()))?;
        let records = match root.get_mut("collection").map(Value::take) {
            Some(Value::Array(items)) => items,
            Some(_) => return Err(ParseError::Document("`collection` is not an array".into())),
            None => return Err(ParseError::UnknownFormat("JSON without `collection`".into())),
        };
        Ok(Self {
            records: records.into_iter(),
            index: 0,
            fallback_server: PreprintServer::from_url(&source.url),
        })
    }

    pub(crate) fn next_entry(&mut self, source: &FeedSource) -> Option<Result<RawEntry, ParseError>> {
        let value = self.records.next()?;
        let index = self.index;
        self.index += 1;
        Some(self.convert(index, value, source))
    }

    fn convert(&self, index: usize, value: Value, source: &FeedSource) -> Result<RawEntry, ParseError> {
        let rec: Record = serde_json::from_value(value).map_err(|e| ParseError::Entry {
            index,
            reason: e.to_string(),
        })?;

        let server = rec
            .server
            .as_deref()
            .and_then(PreprintServer::parse)
            .unwrap_or(self.fallback_server);
        let version = match &rec.version {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => "1".to_string(),
        };
        let link = pdf_link(server, &rec.doi, &version);
        let title = normalize_text(&rec.title, TITLE_MAX_CHARS);

        if title.is_empty() && link.is_empty() {
            return Err(ParseError::Entry {
                index,
                reason: "neither title nor doi".into(),
            });
        }

        Ok(RawEntry {
            title,
            summary: normalize_text(&rec.abstract_text, SUMMARY_MAX_CHARS),
            link,
            published_at: parse_feed_date(&rec.date),
            source_id: source.id.clone(),
            authors: normalize_text(&rec.authors, 2000),
            category: rec.category.trim().to_string(),
        })
    }
}

/// `10.1101/2024.03.21.586123` -> `https://www.biorxiv.org/content/10.1101/2024.03.21.586123v1.full.pdf`
pub fn pdf_link(server: PreprintServer, doi: &str, version: &str) -> String {
    let doi = doi.trim();
    if doi.is_empty() {
        return String::new();
    }
    format!(
        "https://www.{}.org/content/{doi}v{version}.full.pdf",
        server.as_str()
    )
}
