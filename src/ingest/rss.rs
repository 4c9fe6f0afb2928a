// src/ingest/rss.rs
//! RSS 2.0 / RSS 1.0 items.

use quick_xml::de::from_str;
use serde::Deserialize;

use crate::error::ParseError;
use crate::ingest::atom::arxiv_pdf_link;
use crate::ingest::dates::parse_feed_date;
use crate::ingest::xml::scrub_html_entities;
use crate::ingest::{normalize_text, SUMMARY_MAX_CHARS, TITLE_MAX_CHARS};
use crate::types::{FeedSource, RawEntry};

#[derive(Debug, Default, Deserialize)]
struct Text {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "pubDate", default)]
    pub_date: Option<String>,
    #[serde(default)]
    guid: Option<Text>,
    #[serde(default)]
    author: Option<String>,
    #[serde(rename = "category", default)]
    categories: Vec<Text>,
}

pub(crate) fn parse_item(index: usize, slice: &str, source: &FeedSource) -> Result<RawEntry, ParseError> {
    let clean = scrub_html_entities(slice);
    let it: Item = from_str(&clean).map_err(|e| ParseError::Entry {
        index,
        reason: e.to_string(),
    })?;

    let title = normalize_text(it.title.as_deref().unwrap_or_default(), TITLE_MAX_CHARS);
    let summary = normalize_text(it.description.as_deref().unwrap_or_default(), SUMMARY_MAX_CHARS);

    let raw_link = it
        .link
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .or_else(|| {
            it.guid
                .as_ref()
                .map(|g| g.value.trim().to_string())
                .filter(|g| g.starts_with("http"))
        })
        .unwrap_or_default();
    let link = arxiv_pdf_link(&raw_link);

    if title.is_empty() && link.is_empty() {
        return Err(ParseError::Entry {
            index,
            reason: "neither title nor link".into(),
        });
    }

    Ok(RawEntry {
        title,
        summary,
        link,
        published_at: it.pub_date.as_deref().map(parse_feed_date).unwrap_or(0),
        source_id: source.id.clone(),
        authors: normalize_text(it.author.as_deref().unwrap_or_default(), 1000),
        category: it
            .categories
            .first()
            .map(|c| c.value.trim().to_string())
            .unwrap_or_default(),
    })
}
