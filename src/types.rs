// src/types.rs
//! Data model shared by every stage of a run: sources, entries, identities,
//! scores, budgets and the final selection.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ConfigError;

/// One polled feed. Immutable for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedSource {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub label: String,
    /// Client-side category filter (case-insensitive). Empty keeps everything.
    #[serde(default)]
    pub categories: Vec<String>,
}

impl FeedSource {
    pub fn new(id: impl Into<String>, url: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            label: label.into(),
            categories: Vec::new(),
        }
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    /// True when `category` passes this source's filter.
    pub fn accepts_category(&self, category: &str) -> bool {
        self.categories.is_empty()
            || self
                .categories
                .iter()
                .any(|c| c.trim().eq_ignore_ascii_case(category.trim()))
    }
}

/// One syndication item in the uniform shape. Missing fields are empty / 0.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RawEntry {
    pub title: String,
    pub summary: String,
    pub link: String,
    /// Unix seconds, 0 when the feed did not carry a usable date.
    pub published_at: u64,
    pub source_id: String,
    #[serde(default)]
    pub authors: String,
    #[serde(default)]
    pub category: String,
}

impl RawEntry {
    /// Text handed to the relevance judge.
    pub fn judge_text(&self) -> String {
        let mut out = format!("Title: {}\n", self.title);
        if !self.authors.is_empty() {
            out.push_str(&format!("Authors: {}\n", self.authors));
        }
        if !self.category.is_empty() {
            out.push_str(&format!("Category: {}\n", self.category));
        }
        out.push_str(&format!("Abstract: {}", self.summary));
        out
    }
}

/// Stable dedup fingerprint (hex digest). See `dedup::identity_of`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryIdentity(pub(crate) String);

impl EntryIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The user's description of what they care about. Opaque to the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterestProfile(String);

impl InterestProfile {
    pub fn new(text: impl Into<String>) -> Result<Self, ConfigError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ConfigError::EmptyProfile);
        }
        Ok(Self(text.trim().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScorerStatus {
    Scored,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredEntry {
    pub identity: EntryIdentity,
    pub entry: RawEntry,
    /// In [0,1]. Failed entries carry 0.0.
    pub relevance_score: f32,
    pub rationale: String,
    /// Explicit yes/no from the judge, when it gave one.
    pub is_relevant: Option<bool>,
    pub status: ScorerStatus,
    pub attempts: u32,
}

impl ScoredEntry {
    pub fn is_failed(&self) -> bool {
        self.status == ScorerStatus::Failed
    }
}

/// Limits applied by the selector. Both limits apply; the tighter one wins.
/// Fields missing from config fall back to `Budget::default()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Budget {
    pub max_count: Option<usize>,
    pub min_score: Option<f32>,
    /// Drop entries the judge explicitly called irrelevant.
    pub drop_irrelevant: bool,
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            max_count: Some(10),
            min_score: None,
            drop_irrelevant: true,
        }
    }
}

impl Budget {
    pub fn new(max_count: Option<usize>, min_score: Option<f32>) -> Result<Self, ConfigError> {
        let b = Self {
            max_count,
            min_score,
            drop_irrelevant: true,
        };
        b.validate()?;
        Ok(b)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(min) = self.min_score {
            if min.is_nan() || !(0.0..=1.0).contains(&min) {
                return Err(ConfigError::InvalidBudget(format!(
                    "min_score must be within [0, 1], got {min}"
                )));
            }
        }
        Ok(())
    }
}

/// Ranked, budget-bounded result of a run. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Selection {
    entries: Vec<ScoredEntry>,
}

impl Selection {
    pub(crate) fn from_ranked(entries: Vec<ScoredEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ScoredEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScoredEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn identities(&self) -> impl Iterator<Item = &EntryIdentity> {
        self.entries.iter().map(|e| &e.identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_rejects_out_of_range_min_score() {
        assert!(Budget::new(Some(3), Some(1.5)).is_err());
        assert!(Budget::new(Some(3), Some(f32::NAN)).is_err());
        assert!(Budget::new(None, Some(-0.1)).is_err());
        assert!(Budget::new(Some(0), Some(1.0)).is_ok());
    }

    #[test]
    fn category_filter_is_case_insensitive() {
        let src = FeedSource::new("bio", "https://x.test", "bio").with_categories(["Genomics"]);
        assert!(src.accepts_category("genomics"));
        assert!(!src.accepts_category("Neuroscience"));
        let open = FeedSource::new("all", "https://x.test", "all");
        assert!(open.accepts_category("anything"));
    }

    #[test]
    fn empty_profile_is_rejected() {
        assert!(InterestProfile::new("   ").is_err());
        assert_eq!(
            InterestProfile::new(" single-cell genomics ").unwrap().as_str(),
            "single-cell genomics"
        );
    }
}
