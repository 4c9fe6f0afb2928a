// src/config/mod.rs
//! Run configuration: TOML file + env overrides + preference directory.
//!
//! Lookup order for the file:
//! 1) `$ARXIVEROO_CONFIG_PATH` (must exist)
//! 2) `config/arxiveroo.toml` (optional; built-in defaults when absent)

pub mod preferences;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::analyze::RetryPolicy;
use crate::error::ConfigError;
use crate::ingest::fetch::DEFAULT_USER_AGENT;
use crate::ingest::sources::{self, PreprintServer};
use crate::ingest::PublishedWindow;
use crate::pipeline::PipelineOptions;
use crate::types::{Budget, FeedSource, InterestProfile};

pub const DEFAULT_CONFIG_PATH: &str = "config/arxiveroo.toml";
pub const ENV_CONFIG_PATH: &str = "ARXIVEROO_CONFIG_PATH";
pub const ENV_MAX_COUNT: &str = "ARXIVEROO_MAX_COUNT";
pub const ENV_MIN_SCORE: &str = "ARXIVEROO_MIN_SCORE";

fn default_provider() -> String {
    "openai".into()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_concurrency() -> usize {
    4
}
fn default_fetch_timeout_secs() -> u64 {
    30
}
fn default_arxiv_max_results() -> usize {
    200
}
fn default_days_back() -> u64 {
    7
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Inline interest description. Wins over `path`.
    pub text: Option<String>,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArxivConfig {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default = "default_arxiv_max_results")]
    pub max_results: usize,
}

/// `[biorxiv]` / `[medrxiv]`: days back from today unless the run gives a window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprintConfig {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default = "default_days_back")]
    pub days_back: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorerConfig {
    /// "openai" | "keyword" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    /// Name of the env var holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            base_url: None,
            api_key_env: default_api_key_env(),
            concurrency: default_concurrency(),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout_secs(),
            concurrency: default_concurrency(),
            user_agent: None,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeenConfig {
    /// Defaults to `<preference dir>/seen.json`.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Overrides `$PREFERENCE_PATH`.
    pub preference_dir: Option<PathBuf>,
    pub profile: ProfileConfig,
    pub budget: Budget,
    pub sources: Vec<FeedSource>,
    pub arxiv: Option<ArxivConfig>,
    pub biorxiv: Option<PreprintConfig>,
    pub medrxiv: Option<PreprintConfig>,
    pub scorer: ScorerConfig,
    pub fetch: FetchConfig,
    pub seen: SeenConfig,
}

impl AppConfig {
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&data).map_err(|reason| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn from_toml_str(data: &str) -> Result<Self, String> {
        toml::from_str(data).map_err(|e| e.to_string())
    }

    /// Env path, then the default path, then built-in defaults.
    pub fn load_default() -> Result<Self, ConfigError> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            return Self::load_from(Path::new(&p));
        }
        let default = Path::new(DEFAULT_CONFIG_PATH);
        if default.exists() {
            return Self::load_from(default);
        }
        Ok(Self::default())
    }

    /// `ARXIVEROO_MAX_COUNT` / `ARXIVEROO_MIN_SCORE`. Unparseable values are fatal.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(v) = std::env::var(ENV_MAX_COUNT) {
            let n = v.trim().parse::<usize>().map_err(|_| ConfigError::InvalidEnv {
                name: ENV_MAX_COUNT,
                value: v.clone(),
            })?;
            self.budget.max_count = Some(n);
        }
        if let Ok(v) = std::env::var(ENV_MIN_SCORE) {
            let s = v
                .trim()
                .parse::<f32>()
                .ok()
                .filter(|s| s.is_finite())
                .ok_or_else(|| ConfigError::InvalidEnv {
                    name: ENV_MIN_SCORE,
                    value: v.clone(),
                })?;
            self.budget.min_score = Some(s);
        }
        Ok(())
    }

    pub fn preference_dir(&self) -> PathBuf {
        self.preference_dir
            .clone()
            .unwrap_or_else(preferences::default_preference_dir)
    }

    pub fn seen_path(&self) -> PathBuf {
        self.seen
            .path
            .clone()
            .unwrap_or_else(|| self.preference_dir().join(preferences::SEEN_FILE))
    }

    /// `profile.text`, else `profile.path`, else the preference directory.
    pub fn load_profile(&self) -> Result<InterestProfile, ConfigError> {
        if let Some(text) = self.profile.text.as_deref() {
            if !text.trim().is_empty() {
                return InterestProfile::new(text);
            }
        }
        if let Some(path) = self.profile.path.as_deref() {
            return preferences::read_profile_file(path);
        }
        preferences::load_profile_from_dir(&self.preference_dir())
    }

    /// Explicit `[[sources]]` plus the `[arxiv]`/`[biorxiv]`/`[medrxiv]`
    /// sections. With none of those, `categories.json` decides.
    pub fn resolve_sources(
        &self,
        window: &PublishedWindow,
        today: NaiveDate,
    ) -> Result<Vec<FeedSource>, ConfigError> {
        let mut out = self.sources.clone();

        if let Some(a) = &self.arxiv {
            if !a.categories.is_empty() {
                out.push(sources::arxiv(&a.categories, a.max_results));
            }
        }
        for (server, cfg) in [
            (PreprintServer::Biorxiv, &self.biorxiv),
            (PreprintServer::Medrxiv, &self.medrxiv),
        ] {
            if let Some(cfg) = cfg {
                let (since, until) = preprint_interval(window, today, cfg.days_back);
                out.push(sources::preprint_server(server, since, until, &cfg.categories));
            }
        }

        if out.is_empty() {
            let categories = preferences::load_categories(&self.preference_dir())?;
            out = sources_from_categories(&categories, window, today);
        }
        Ok(out)
    }

    pub fn pipeline_options(&self, window: PublishedWindow) -> PipelineOptions {
        PipelineOptions {
            fetch_concurrency: self.fetch.concurrency.max(1),
            score_concurrency: self.scorer.concurrency.max(1),
            fetch_timeout: self.fetch.timeout(),
            window,
            commit_seen: true,
        }
    }
}

fn preprint_interval(
    window: &PublishedWindow,
    today: NaiveDate,
    days_back: u64,
) -> (NaiveDate, NaiveDate) {
    let until = window.until.unwrap_or(today);
    let since = window.since.unwrap_or_else(|| {
        until
            .checked_sub_days(Days::new(days_back))
            .unwrap_or(until)
    });
    (since, until)
}

/// arXiv-shaped codes go to one arXiv query; the rest filter bioRxiv and medRxiv.
pub fn sources_from_categories(
    categories: &[String],
    window: &PublishedWindow,
    today: NaiveDate,
) -> Vec<FeedSource> {
    let (arxiv_cats, preprint_cats): (Vec<String>, Vec<String>) = categories
        .iter()
        .cloned()
        .partition(|c| sources::is_arxiv_category(c));

    let mut out = Vec::new();
    if !arxiv_cats.is_empty() {
        out.push(sources::arxiv(&arxiv_cats, default_arxiv_max_results()));
    }
    if !preprint_cats.is_empty() {
        let (since, until) = preprint_interval(window, today, default_days_back());
        for server in [PreprintServer::Biorxiv, PreprintServer::Medrxiv] {
            out.push(sources::preprint_server(server, since, until, &preprint_cats));
        }
    }
    out
}
