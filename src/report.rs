// src/report.rs
//! Presentation of a finished run: markdown digest or JSON.

use serde::Serialize;
use std::fmt::Write as _;

use crate::error::RunWarning;
use crate::pipeline::{RunReport, RunStats};
use crate::types::ScoredEntry;

/// Scores are stored in [0,1] and shown on the judge's 10-point scale.
pub fn display_score(score: f32) -> String {
    format!("{:.1}", score * 10.0)
}

fn published_day(ts: u64) -> Option<String> {
    if ts == 0 {
        return None;
    }
    let secs = i64::try_from(ts).ok()?;
    chrono::DateTime::from_timestamp(secs, 0).map(|dt| dt.format("%Y-%m-%d").to_string())
}

pub fn render_markdown(report: &RunReport) -> String {
    let mut out = String::new();
    if report.selection.is_empty() {
        out.push_str("No new relevant papers.\n");
    }
    for (idx, e) in report.selection.iter().enumerate() {
        let _ = writeln!(out, "## Paper {}", idx + 1);
        let _ = writeln!(out, "**Title:** {}", e.entry.title);
        let _ = writeln!(out, "**Score:** {}", display_score(e.relevance_score));
        let _ = writeln!(out, "**Reason:** {}", e.rationale);
        if !e.entry.authors.is_empty() {
            let _ = writeln!(out, "**Authors:** {}", e.entry.authors);
        }
        if let Some(day) = published_day(e.entry.published_at) {
            let _ = writeln!(out, "**Published:** {day}");
        }
        let _ = writeln!(out, "**Link:** {}", e.entry.link);
        out.push('\n');
    }

    if !report.warnings.is_empty() {
        let _ = writeln!(out, "---\n### Warnings ({})", report.warnings.len());
        for w in &report.warnings {
            let _ = writeln!(out, "- {w}");
        }
    }
    out
}

#[derive(Serialize)]
struct JsonItem<'a> {
    title: &'a str,
    link: &'a str,
    score: f32,
    rationale: &'a str,
    published_at: u64,
    source_id: &'a str,
}

impl<'a> From<&'a ScoredEntry> for JsonItem<'a> {
    fn from(e: &'a ScoredEntry) -> Self {
        Self {
            title: &e.entry.title,
            link: &e.entry.link,
            score: e.relevance_score,
            rationale: &e.rationale,
            published_at: e.entry.published_at,
            source_id: &e.entry.source_id,
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    items: Vec<JsonItem<'a>>,
    warnings: &'a [RunWarning],
    stats: &'a RunStats,
}

pub fn render_json(report: &RunReport) -> Result<String, serde_json::Error> {
    let doc = JsonReport {
        items: report.selection.iter().map(JsonItem::from).collect(),
        warnings: &report.warnings,
        stats: &report.stats,
    };
    serde_json::to_string_pretty(&doc)
}
