// src/ingest/atom.rs
//! Atom entries (arXiv query API and friends).

use quick_xml::de::from_str;
use serde::Deserialize;

use crate::error::ParseError;
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
struct Entry {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<Text>,
    #[serde(default)]
    summary: Option<Text>,
    #[serde(default)]
    content: Option<Text>,
    #[serde(default)]
    published: Option<String>,
    #[serde(default)]
    updated: Option<String>,
    #[serde(rename = "author", default)]
    authors: Vec<Author>,
    #[serde(rename = "link", default)]
    links: Vec<Link>,
    #[serde(rename = "category", default)]
    categories: Vec<Category>,
}

#[derive(Debug, Deserialize)]
struct Author {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct Link {
    #[serde(rename = "@href", default)]
    href: String,
    #[serde(rename = "@rel", default)]
    rel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Category {
    #[serde(rename = "@term", default)]
    term: String,
}

pub(crate) fn parse_entry(index: usize, slice: &str, source: &FeedSource) -> Result<RawEntry, ParseError> {
    let clean = scrub_html_entities(slice);
    let entry: Entry = from_str(&clean).map_err(|e| ParseError::Entry {
        index,
        reason: e.to_string(),
    })?;

    let title = normalize_text(
        &entry.title.map(|t| t.value).unwrap_or_default(),
        TITLE_MAX_CHARS,
    );
    let summary = entry
        .summary
        .or(entry.content)
        .map(|t| normalize_text(&t.value, SUMMARY_MAX_CHARS))
        .unwrap_or_default();

    // rel defaults to "alternate" when absent
    let alternate = entry
        .links
        .iter()
        .find(|l| l.rel.as_deref().map_or(true, |r| r == "alternate") && !l.href.is_empty())
        .or_else(|| entry.links.iter().find(|l| !l.href.is_empty()))
        .map(|l| l.href.trim().to_string())
        .or_else(|| entry.id.as_deref().map(str::trim).filter(|id| id.starts_with("http")).map(String::from))
        .unwrap_or_default();
    let link = arxiv_pdf_link(&alternate);

    if title.is_empty() && link.is_empty() {
        return Err(ParseError::Entry {
            index,
            reason: "neither title nor link".into(),
        });
    }

    let published_at = entry
        .published
        .as_deref()
        .map(parse_feed_date)
        .filter(|ts| *ts > 0)
        .or_else(|| entry.updated.as_deref().map(parse_feed_date))
        .unwrap_or(0);

    let authors = entry
        .authors
        .iter()
        .map(|a| normalize_text(&a.name, 200))
        .filter(|n| !n.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    let category = entry
        .categories
        .first()
        .map(|c| c.term.trim().to_string())
        .unwrap_or_default();

    Ok(RawEntry {
        title,
        summary,
        link,
        published_at,
        source_id: source.id.clone(),
        authors,
        category,
    })
}

/// arXiv abstract pages map to their PDF: `/abs/<id>` -> `/pdf/<id>.pdf`.
pub fn arxiv_pdf_link(link: &str) -> String {
    if link.contains("arxiv.org/abs/") {
        format!("{}.pdf", link.replacen("/abs/", "/pdf/", 1))
    } else {
        link.to_string()
    }
}
