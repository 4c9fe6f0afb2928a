// src/pipeline.rs
//! Orchestrator: one run is FETCHING → NORMALIZING → DEDUPING → SCORING →
//! RANKING → DONE. Per-source and per-entry failures become warnings; only
//! an invalid budget aborts the run.

use metrics::{counter, gauge};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::analyze::RelevanceScorer;
use crate::dedup::{Candidate, DedupStore, SeenStore};
use crate::error::{ConfigError, FetchError, RunWarning};
use crate::ingest::fetch::FeedFetcher;
use crate::ingest::{self, PublishedWindow};
use crate::select::select;
use crate::telemetry::ensure_metrics_described;
use crate::types::{Budget, FeedSource, InterestProfile, RawEntry, ScoredEntry, Selection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStage {
    Fetching,
    Normalizing,
    Deduping,
    Scoring,
    Ranking,
    Done,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStage::Fetching => "FETCHING",
            RunStage::Normalizing => "NORMALIZING",
            RunStage::Deduping => "DEDUPING",
            RunStage::Scoring => "SCORING",
            RunStage::Ranking => "RANKING",
            RunStage::Done => "DONE",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub fetch_concurrency: usize,
    pub score_concurrency: usize,
    /// Per fetch call, not per run.
    pub fetch_timeout: Duration,
    pub window: PublishedWindow,
    /// `false` = dry run: nothing is marked seen.
    pub commit_seen: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            fetch_concurrency: 4,
            score_concurrency: 4,
            fetch_timeout: Duration::from_secs(30),
            window: PublishedWindow::default(),
            commit_seen: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub sources_total: usize,
    pub sources_failed: usize,
    pub entries_parsed: usize,
    pub parse_errors: usize,
    /// Dropped by a source's category filter or the publication window.
    pub filtered_out: usize,
    pub already_seen: usize,
    pub repeated: usize,
    pub candidates: usize,
    pub scored: usize,
    pub failed: usize,
    pub selected: usize,
    pub newly_seen: usize,
}

/// Everything a presentation layer needs from one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub selection: Selection,
    pub warnings: Vec<RunWarning>,
    pub stats: RunStats,
}

pub struct Pipeline {
    fetcher: Arc<dyn FeedFetcher>,
    scorer: RelevanceScorer,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(fetcher: Arc<dyn FeedFetcher>, scorer: RelevanceScorer, options: PipelineOptions) -> Self {
        Self {
            fetcher,
            scorer,
            options,
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run once. `store` is read at the start and written at most once, after
    /// ranking. Dropping the returned future aborts in-flight tasks and
    /// leaves the store untouched.
    pub async fn run(
        &self,
        sources: &[FeedSource],
        profile: &InterestProfile,
        budget: &Budget,
        store: &dyn SeenStore,
    ) -> Result<RunReport, ConfigError> {
        budget.validate()?;
        ensure_metrics_described();

        let mut warnings = Vec::new();
        let mut stats = RunStats {
            sources_total: sources.len(),
            ..Default::default()
        };

        info!(stage = %RunStage::Fetching, sources = sources.len(), "run stage");
        let documents = self.fetch_all(sources).await;

        info!(stage = %RunStage::Normalizing, "run stage");
        let mut entries: Vec<RawEntry> = Vec::new();
        for (source, doc) in sources.iter().zip(documents) {
            match doc {
                Ok(body) => {
                    self.normalize_one(source, &body, &mut entries, &mut warnings, &mut stats);
                }
                Err(err) => {
                    counter!("feed_fetch_errors_total").increment(1);
                    warn!(source = %source.id, error = %err, "feed fetch failed");
                    stats.sources_failed += 1;
                    warnings.push(RunWarning::fetch(&source.id, &err));
                }
            }
        }

        info!(stage = %RunStage::Deduping, entries = entries.len(), "run stage");
        let (mut dedup, load_err) = DedupStore::load(store);
        if let Some(err) = load_err {
            warnings.push(RunWarning::persistence(&err));
        }
        let outcome = dedup.filter_unseen(entries);
        counter!("dedup_seen_total").increment(outcome.already_seen as u64);
        stats.already_seen = outcome.already_seen;
        stats.repeated = outcome.repeated;
        stats.candidates = outcome.candidates.len();

        info!(
            stage = %RunStage::Scoring,
            candidates = outcome.candidates.len(),
            judge = self.scorer.judge_name(),
            "run stage"
        );
        let scored = self.score_all(outcome.candidates, profile).await;
        for s in scored.iter().filter(|s| s.is_failed()) {
            warnings.push(RunWarning::Scorer {
                identity: s.identity.clone(),
                title: s.entry.title.clone(),
                message: s.rationale.clone(),
            });
        }
        stats.failed = scored.iter().filter(|s| s.is_failed()).count();
        stats.scored = scored.len() - stats.failed;

        info!(stage = %RunStage::Ranking, "run stage");
        let selection = select(scored, budget);
        stats.selected = selection.len();
        gauge!("selection_size").set(selection.len() as f64);

        if self.options.commit_seen {
            stats.newly_seen = dedup.mark_seen(selection.identities());
            if let Err(err) = dedup.commit(store) {
                warn!(store = %store.describe(), error = %err, "seen set not saved");
                warnings.push(RunWarning::persistence(&err));
                stats.newly_seen = 0;
            }
        } else {
            debug!("dry run, seen set left untouched");
        }

        let now = chrono::Utc::now().timestamp().max(0) as u64;
        gauge!("pipeline_last_run_ts").set(now as f64);
        info!(
            stage = %RunStage::Done,
            selected = stats.selected,
            warnings = warnings.len(),
            "run stage"
        );

        Ok(RunReport {
            selection,
            warnings,
            stats,
        })
    }

    /// One slot per source, in submission order.
    async fn fetch_all(&self, sources: &[FeedSource]) -> Vec<Result<String, FetchError>> {
        let permits = Arc::new(Semaphore::new(self.options.fetch_concurrency.max(1)));
        let timeout = self.options.fetch_timeout;
        let mut tasks = JoinSet::new();

        for (idx, source) in sources.iter().enumerate() {
            let fetcher = Arc::clone(&self.fetcher);
            let permits = Arc::clone(&permits);
            let source = source.clone();
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                counter!("feed_fetch_total").increment(1);
                let res = match tokio::time::timeout(timeout, fetcher.fetch(&source)).await {
                    Ok(r) => r,
                    Err(_) => Err(FetchError::Timeout {
                        millis: timeout.as_millis() as u64,
                    }),
                };
                (idx, res)
            });
        }

        let mut slots: Vec<Option<Result<String, FetchError>>> =
            std::iter::repeat_with(|| None).take(sources.len()).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, res)) => slots[idx] = Some(res),
                Err(err) => warn!(error = %err, "fetch task did not complete"),
            }
        }
        slots
            .into_iter()
            .map(|s| s.unwrap_or_else(|| Err(FetchError::Task("fetch task aborted".into()))))
            .collect()
    }

    fn normalize_one(
        &self,
        source: &FeedSource,
        body: &str,
        entries: &mut Vec<RawEntry>,
        warnings: &mut Vec<RunWarning>,
        stats: &mut RunStats,
    ) {
        let stream = match ingest::normalize(body, source) {
            Ok(s) => s,
            Err(err) => {
                counter!("feed_parse_errors_total").increment(1);
                warn!(source = %source.id, error = %err, "feed not parseable");
                stats.parse_errors += 1;
                warnings.push(RunWarning::parse(&source.id, &err));
                return;
            }
        };
        let format = stream.format();

        let (mut kept, mut skipped) = (0usize, 0usize);
        for item in stream {
            match item {
                Ok(entry) => {
                    stats.entries_parsed += 1;
                    if source.accepts_category(&entry.category)
                        && self.options.window.contains(entry.published_at)
                    {
                        kept += 1;
                        entries.push(entry);
                    } else {
                        stats.filtered_out += 1;
                    }
                }
                Err(err) => {
                    counter!("feed_parse_errors_total").increment(1);
                    debug!(source = %source.id, error = %err, "entry skipped");
                    stats.parse_errors += 1;
                    skipped += 1;
                    warnings.push(RunWarning::parse(&source.id, &err));
                }
            }
        }
        counter!("feed_entries_total").increment(kept as u64);
        info!(source = %source.id, ?format, kept, skipped, "feed normalized");
    }

    /// One slot per candidate, so output order never depends on completion order.
    async fn score_all(&self, candidates: Vec<Candidate>, profile: &InterestProfile) -> Vec<ScoredEntry> {
        let permits = Arc::new(Semaphore::new(self.options.score_concurrency.max(1)));
        let profile = Arc::new(profile.clone());
        let mut tasks = JoinSet::new();
        let mut fallback = Vec::with_capacity(candidates.len());

        for (idx, candidate) in candidates.into_iter().enumerate() {
            fallback.push(candidate.clone());
            let scorer = self.scorer.clone();
            let permits = Arc::clone(&permits);
            let profile = Arc::clone(&profile);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                (idx, scorer.score(candidate, &profile).await)
            });
        }

        let mut slots: Vec<Option<ScoredEntry>> = vec![None; fallback.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, scored)) => slots[idx] = Some(scored),
                Err(err) => warn!(error = %err, "scoring task did not complete"),
            }
        }
        slots
            .into_iter()
            .zip(fallback)
            .map(|(slot, candidate)| slot.unwrap_or_else(|| aborted(candidate)))
            .collect()
    }
}

fn aborted(candidate: Candidate) -> ScoredEntry {
    ScoredEntry {
        identity: candidate.identity,
        entry: candidate.entry,
        relevance_score: 0.0,
        rationale: "scoring task aborted".into(),
        is_relevant: None,
        status: crate::types::ScorerStatus::Failed,
        attempts: 0,
    }
}
