// src/ingest/sources.rs
//! Builders for the preprint feeds the tool knows about out of the box.

use chrono::NaiveDate;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::FeedSource;

pub const ARXIV_API: &str = "http://export.arxiv.org/api/query";
pub const PREPRINT_API: &str = "https://api.biorxiv.org/details";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreprintServer {
    Biorxiv,
    Medrxiv,
}

impl PreprintServer {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreprintServer::Biorxiv => "biorxiv",
            PreprintServer::Medrxiv => "medrxiv",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PreprintServer::Biorxiv => "bioRxiv",
            PreprintServer::Medrxiv => "medRxiv",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "biorxiv" => Some(Self::Biorxiv),
            "medrxiv" => Some(Self::Medrxiv),
            _ => None,
        }
    }

    /// Guess from a details-API URL; bioRxiv unless the path names medRxiv.
    pub fn from_url(url: &str) -> Self {
        if url.to_ascii_lowercase().contains("medrxiv") {
            Self::Medrxiv
        } else {
            Self::Biorxiv
        }
    }
}

/// arXiv query API, newest submissions first.
pub fn arxiv(categories: &[String], max_results: usize) -> FeedSource {
    let query = categories
        .iter()
        .map(|c| format!("cat:{}", c.trim()))
        .collect::<Vec<_>>()
        .join("+OR+");
    let url = format!(
        "{ARXIV_API}?search_query={query}&start=0&max_results={max_results}&sortBy=submittedDate&sortOrder=descending"
    );
    let id = if categories.is_empty() {
        "arxiv".to_string()
    } else {
        format!("arxiv:{}", categories.join(","))
    };
    FeedSource::new(id, url, format!("arXiv ({})", categories.join(", ")))
}

/// bioRxiv/medRxiv details API for `[since, until]`, filtered client-side by category.
pub fn preprint_server(
    server: PreprintServer,
    since: NaiveDate,
    until: NaiveDate,
    categories: &[String],
) -> FeedSource {
    let url = format!(
        "{PREPRINT_API}/{}/{}/{}",
        server.as_str(),
        since.format("%Y-%m-%d"),
        until.format("%Y-%m-%d")
    );
    FeedSource::new(server.as_str(), url, server.label()).with_categories(categories.iter().cloned())
}

/// arXiv category codes look like `cs.AI`, `q-bio.GN`, `astro-ph.CO`.
pub fn is_arxiv_category(code: &str) -> bool {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"^[a-z][a-z\-]*\.[A-Za-z][A-Za-z\-]*$").unwrap())
        .is_match(code.trim())
}
