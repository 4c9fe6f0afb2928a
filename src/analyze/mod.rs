// src/analyze/mod.rs
//! Relevance scoring: judge providers, reply parsing and the retrying scorer.

pub mod judge;
pub mod keyword;
pub mod openai;
pub mod scorer;

use std::sync::Arc;
use tracing::info;

use crate::config::ScorerConfig;
use crate::error::ConfigError;

pub use judge::{parse_judgment, Judgment, RelevanceJudge};
pub use keyword::KeywordJudge;
pub use openai::OpenAiJudge;
pub use scorer::{RelevanceScorer, RetryPolicy};

pub const ENV_AI_TEST_MODE: &str = "AI_TEST_MODE";

/// Build the judge named by config.
///
/// * `AI_TEST_MODE=mock` always yields the offline keyword judge.
/// * `provider = "keyword"` (aliases `offline`, `mock`) likewise.
/// * `provider = "openai"` needs the key in `cfg.api_key_env`.
pub fn build_judge(cfg: &ScorerConfig) -> Result<Arc<dyn RelevanceJudge>, ConfigError> {
    if std::env::var(ENV_AI_TEST_MODE)
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        info!("AI_TEST_MODE=mock, using keyword judge");
        return Ok(Arc::new(KeywordJudge));
    }

    match cfg.provider.trim().to_ascii_lowercase().as_str() {
        "keyword" | "offline" | "mock" => Ok(Arc::new(KeywordJudge)),
        "openai" => {
            let key = std::env::var(&cfg.api_key_env)
                .map_err(|_| ConfigError::MissingApiKey(cfg.api_key_env.clone()))?;
            let judge = OpenAiJudge::new(
                key,
                cfg.base_url.as_deref(),
                cfg.model.as_deref(),
                cfg.retry.call_timeout(),
            )?;
            info!(provider = "openai", model = ?cfg.model, "judge ready");
            Ok(Arc::new(judge))
        }
        other => Err(ConfigError::UnknownProvider(other.to_string())),
    }
}
