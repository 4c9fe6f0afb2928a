// src/analyze/scorer.rs
//! Relevance scorer: one judgment per entry, with bounded retries.

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::analyze::judge::{parse_judgment, RelevanceJudge};
use crate::dedup::Candidate;
use crate::error::JudgeError;
use crate::types::{InterestProfile, ScoredEntry, ScorerStatus};

fn default_max_attempts() -> u32 {
    3
}
fn default_initial_backoff_ms() -> u64 {
    500
}
fn default_max_backoff_ms() -> u64 {
    8_000
}
fn default_call_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            call_timeout_secs: default_call_timeout_secs(),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self) -> ExponentialBackoff {
        let initial = Duration::from_millis(self.initial_backoff_ms);
        ExponentialBackoff {
            current_interval: initial,
            initial_interval: initial,
            max_interval: Duration::from_millis(self.max_backoff_ms.max(self.initial_backoff_ms)),
            multiplier: 2.0,
            // attempts are bounded by max_attempts, not wall time
            max_elapsed_time: None,
            ..Default::default()
        }
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs.max(1))
    }
}

#[derive(Clone)]
pub struct RelevanceScorer {
    judge: Arc<dyn RelevanceJudge>,
    policy: RetryPolicy,
    call_timeout: Duration,
}

impl RelevanceScorer {
    pub fn new(judge: Arc<dyn RelevanceJudge>, policy: RetryPolicy) -> Self {
        let call_timeout = policy.call_timeout();
        Self {
            judge,
            policy,
            call_timeout,
        }
    }

    /// Sub-second per-call timeout, for tests and tight local setups.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn judge_name(&self) -> &'static str {
        self.judge.name()
    }

    /// Never errors: exhausted retries, rejections and unusable replies all
    /// come back as `ScorerStatus::Failed` with a zero score.
    pub async fn score(&self, candidate: Candidate, profile: &InterestProfile) -> ScoredEntry {
        let text = candidate.entry.judge_text();
        let max_attempts = self.policy.max_attempts.max(1);
        let mut backoff = self.policy.backoff();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            counter!("scorer_calls_total").increment(1);
            let t0 = Instant::now();
            let outcome = tokio::time::timeout(self.call_timeout, self.judge.judge(&text, profile)).await;
            histogram!("scorer_call_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

            let transient = match outcome {
                Ok(Ok(reply)) => {
                    return match parse_judgment(&reply) {
                        Some(j) => ScoredEntry {
                            identity: candidate.identity,
                            entry: candidate.entry,
                            relevance_score: j.score.clamp(0.0, 1.0),
                            rationale: j.rationale,
                            is_relevant: j.is_relevant,
                            status: ScorerStatus::Scored,
                            attempts,
                        },
                        None => {
                            debug!(identity = %candidate.identity, "unusable judge reply");
                            failed(candidate, attempts, "unparseable judge reply".into())
                        }
                    };
                }
                Ok(Err(JudgeError::Rejected(msg))) => {
                    return failed(candidate, attempts, format!("judge rejected request: {msg}"));
                }
                Ok(Err(JudgeError::Transient(msg))) => msg,
                Err(_) => format!("judge call timed out after {:?}", self.call_timeout),
            };

            if attempts >= max_attempts {
                return failed(
                    candidate,
                    attempts,
                    format!("gave up after {attempts} attempts: {transient}"),
                );
            }
            let Some(delay) = backoff.next_backoff() else {
                return failed(candidate, attempts, format!("backoff exhausted: {transient}"));
            };
            counter!("scorer_retries_total").increment(1);
            warn!(
                identity = %candidate.identity,
                attempt = attempts,
                delay_ms = delay.as_millis() as u64,
                error = %transient,
                "transient judge failure, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

fn failed(candidate: Candidate, attempts: u32, reason: String) -> ScoredEntry {
    counter!("scorer_failures_total").increment(1);
    ScoredEntry {
        identity: candidate.identity,
        entry: candidate.entry,
        relevance_score: 0.0,
        rationale: reason,
        is_relevant: None,
        status: ScorerStatus::Failed,
        attempts,
    }
}
