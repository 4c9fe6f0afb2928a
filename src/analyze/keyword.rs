// src/analyze/keyword.rs
//! Deterministic offline judge: keyword overlap between profile and entry.

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::analyze::judge::RelevanceJudge;
use crate::error::JudgeError;
use crate::types::InterestProfile;

const STOPWORDS: &[&str] = &[
    "about", "also", "and", "are", "based", "between", "for", "from", "have", "into", "like", "more",
    "new", "not", "our", "paper", "papers", "that", "the", "their", "them", "these", "this", "using",
    "very", "was", "which", "with", "work",
];

#[derive(Debug, Default, Clone)]
pub struct KeywordJudge;

fn keywords(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '-')
        .map(|w| w.trim_matches('-').to_lowercase())
        .filter(|w| w.chars().count() > 2 && !STOPWORDS.contains(&w.as_str()))
        .collect()
}

#[async_trait]
impl RelevanceJudge for KeywordJudge {
    fn name(&self) -> &'static str {
        "keyword"
    }

    async fn judge(&self, entry_text: &str, profile: &InterestProfile) -> Result<String, JudgeError> {
        let wanted = keywords(profile.as_str());
        if wanted.is_empty() {
            return Err(JudgeError::Rejected("profile has no usable keywords".into()));
        }
        let have = keywords(entry_text);
        let hits: Vec<&String> = wanted.iter().filter(|w| have.contains(*w)).collect();

        // Two matching keywords already make an entry a solid candidate.
        let coverage = hits.len() as f64 / wanted.len().min(4) as f64;
        let score = (1.0 + 9.0 * coverage.min(1.0)).round() as u32;
        let reason = if hits.is_empty() {
            "No overlap with the stated interests.".to_string()
        } else {
            let shown: Vec<&str> = hits.iter().take(5).map(|s| s.as_str()).collect();
            format!("Mentions {}.", shown.join(", "))
        };
        let reply = serde_json::json!({
            "reason": reason,
            "is_relevant": !hits.is_empty(),
            "relevance_score": score,
        });
        Ok(reply.to_string())
    }
}
