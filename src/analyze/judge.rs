// src/analyze/judge.rs
//! Judge capability + defensive parsing of whatever the model sends back.

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::JudgeError;
use crate::types::InterestProfile;

pub const RATIONALE_MAX_CHARS: usize = 400;

/// Any provider able to answer "how relevant is this text to this profile".
/// Returns the raw reply; the scorer parses it.
#[async_trait]
pub trait RelevanceJudge: Send + Sync {
    fn name(&self) -> &'static str;

    async fn judge(&self, entry_text: &str, profile: &InterestProfile) -> Result<String, JudgeError>;
}

/// A usable judgment, score normalized to [0,1].
#[derive(Debug, Clone, PartialEq)]
pub struct Judgment {
    pub score: f32,
    pub rationale: String,
    pub is_relevant: Option<bool>,
}

/// Parse a model reply. `None` means the reply is unusable.
///
/// Accepted shapes, in order:
/// 1. a JSON object (optionally inside a fenced block) with `relevance_score`
///    (10-point scale) or `score`, plus `reason`/`rationale` and `is_relevant`;
/// 2. free text containing e.g. `score: 7/10` or `Score = 0.8`.
///
/// A reply that is a JSON object is judged on its fields alone; text inside
/// it is never scanned for a score.
pub fn parse_judgment(reply: &str) -> Option<Judgment> {
    let text = strip_code_fence(reply.trim());
    match json_object(text) {
        Some(obj) => judgment_from_object(&obj),
        None => parse_text_judgment(text),
    }
}

fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    // drop an optional language tag on the fence line
    let body = rest.split_once('\n').map_or(rest, |(_, b)| b);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn json_object(text: &str) -> Option<Map<String, Value>> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str(&text[start..=end]).ok()? {
        Value::Object(obj) => Some(obj),
        _ => None,
    }
}

fn judgment_from_object(obj: &Map<String, Value>) -> Option<Judgment> {
    let score = if let Some(raw) = obj.get("relevance_score").and_then(number_of) {
        ten_point(raw)?
    } else {
        normalize_score(obj.get("score").and_then(number_of)?, None)?
    };
    let rationale = obj
        .get("reason")
        .or_else(|| obj.get("rationale"))
        .and_then(Value::as_str)
        .map(sanitize_rationale)
        .unwrap_or_default();
    let is_relevant = obj.get("is_relevant").and_then(|v| match v {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    });

    Some(Judgment {
        score,
        rationale,
        is_relevant,
    })
}

fn number_of(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn ten_point(raw: f64) -> Option<f32> {
    if raw.is_finite() && (0.0..=10.0).contains(&raw) {
        Some((raw / 10.0) as f32)
    } else {
        None
    }
}

/// Map a raw score onto [0,1]. With an explicit denominator the ratio is
/// used; otherwise unit scale if <= 1, then 10-point, then 100-point.
fn normalize_score(raw: f64, denominator: Option<f64>) -> Option<f32> {
    if !raw.is_finite() || raw < 0.0 {
        return None;
    }
    let unit = match denominator {
        Some(d) if d > 0.0 && raw <= d => raw / d,
        Some(_) => return None,
        None if raw <= 1.0 => raw,
        None if raw <= 10.0 => raw / 10.0,
        None if raw <= 100.0 => raw / 100.0,
        None => return None,
    };
    Some(unit as f32)
}

fn parse_text_judgment(text: &str) -> Option<Judgment> {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?i)\bscore\b[^0-9\n]{0,16}?(\d+(?:\.\d+)?)(?:\s*/\s*(\d+(?:\.\d+)?))?").unwrap()
    });
    let caps = re.captures(text)?;
    let raw: f64 = caps.get(1)?.as_str().parse().ok()?;
    let denominator = caps.get(2).and_then(|m| m.as_str().parse::<f64>().ok());
    let score = normalize_score(raw, denominator)?;

    Some(Judgment {
        score,
        rationale: sanitize_rationale(text),
        is_relevant: text_relevance(text),
    })
}

/// `Some(false)` only for a plain "not relevant" / "irrelevant"; a negated
/// "irrelevant" is left undecided.
fn text_relevance(text: &str) -> Option<bool> {
    static NEGATED: OnceCell<Regex> = OnceCell::new();
    let negated = NEGATED.get_or_init(|| {
        Regex::new(r"(?i)\b(?:not|never|hardly|isn't|wasn't|aren't)\s+(?:\w+\s+)?irrelevant\b").unwrap()
    });
    let lower = text.to_ascii_lowercase();
    if negated.is_match(&lower) {
        return None;
    }
    if lower.contains("not relevant") || lower.contains("irrelevant") {
        Some(false)
    } else {
        None
    }
}

/// Single line, printable, capped.
pub fn sanitize_rationale(input: &str) -> String {
    let mut out = String::with_capacity(input.len().min(RATIONALE_MAX_CHARS));
    let mut prev_space = false;
    let mut count = 0;
    for ch in input.chars() {
        let c = if ch.is_whitespace() || ch.is_control() { ' ' } else { ch };
        if c == ' ' {
            if !prev_space && !out.is_empty() {
                out.push(' ');
                count += 1;
            }
            prev_space = true;
        } else {
            out.push(c);
            count += 1;
            prev_space = false;
        }
        if count >= RATIONALE_MAX_CHARS {
            break;
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_reply_on_ten_point_scale() {
        let j = parse_judgment(
            r#"{"reason": "Matches single-cell methods.", "is_relevant": true, "relevance_score": 8}"#,
        )
        .unwrap();
        assert!((j.score - 0.8).abs() < 1e-6);
        assert_eq!(j.rationale, "Matches single-cell methods.");
        assert_eq!(j.is_relevant, Some(true));
    }

    #[test]
    fn fenced_reply_with_unit_score() {
        let reply = "```json\n{\"score\": 0.35, \"rationale\": \"tangential\"}\n```";
        let j = parse_judgment(reply).unwrap();
        assert!((j.score - 0.35).abs() < 1e-6);
        assert_eq!(j.rationale, "tangential");
        assert_eq!(j.is_relevant, None);
    }

    #[test]
    fn lowest_ten_point_score_stays_low() {
        let j = parse_judgment(r#"{"relevance_score": 1, "reason": "off-topic", "is_relevant": false}"#)
            .unwrap();
        assert!((j.score - 0.1).abs() < 1e-6);
        assert_eq!(j.is_relevant, Some(false));
    }

    #[test]
    fn free_text_fallback() {
        let j = parse_judgment("Relevant to your interests.\nScore: 7/10 because it uses GNNs").unwrap();
        assert!((j.score - 0.7).abs() < 1e-6);
        assert!(j.rationale.starts_with("Relevant to your interests. Score"));

        let j = parse_judgment("I'd say this is not relevant. Score = 2").unwrap();
        assert!((j.score - 0.2).abs() < 1e-6);
        assert_eq!(j.is_relevant, Some(false));
    }

    #[test]
    fn unusable_replies() {
        assert!(parse_judgment("").is_none());
        assert!(parse_judgment("I cannot help with that.").is_none());
        assert!(parse_judgment(r#"{"reason": "no number here"}"#).is_none());
        assert!(parse_judgment(r#"{"relevance_score": 42}"#).is_none());
        assert!(parse_judgment("score: 12/10").is_none());
    }

    #[test]
    fn json_without_score_is_not_rescued_from_its_text() {
        assert!(parse_judgment(
            r#"{"reason": "Overall score 9 would be generous; off-topic.", "is_relevant": true}"#
        )
        .is_none());
        assert!(parse_judgment("```json\n{\"rationale\": \"score: 8/10\"}\n```").is_none());
    }

    #[test]
    fn negated_irrelevant_stays_undecided() {
        let j = parse_judgment("Not irrelevant at all. Score: 6/10").unwrap();
        assert_eq!(j.is_relevant, None);
        let j = parse_judgment("This is not entirely irrelevant. Score: 5/10").unwrap();
        assert_eq!(j.is_relevant, None);
        let j = parse_judgment("Irrelevant to the profile. Score: 1/10").unwrap();
        assert_eq!(j.is_relevant, Some(false));
    }

    #[test]
    fn rationale_is_single_line_and_capped() {
        let long = "word\n".repeat(500);
        let s = sanitize_rationale(&long);
        assert!(!s.contains('\n'));
        assert!(s.chars().count() <= RATIONALE_MAX_CHARS);
    }
}
