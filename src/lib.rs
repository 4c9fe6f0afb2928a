// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod analyze;
pub mod config;
pub mod dedup;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod report;
pub mod select;
pub mod telemetry;
pub mod types;

// ---- Re-exports for stable public API ----
pub use crate::analyze::{KeywordJudge, OpenAiJudge, RelevanceJudge, RelevanceScorer, RetryPolicy};
pub use crate::dedup::{identity_of, JsonFileStore, MemoryStore, SeenSet, SeenStore};
pub use crate::error::{ConfigError, FetchError, JudgeError, ParseError, PersistenceError, RunWarning};
pub use crate::ingest::fetch::{FeedFetcher, HttpFetcher, StaticFetcher};
pub use crate::ingest::{normalize, PublishedWindow};
pub use crate::pipeline::{Pipeline, PipelineOptions, RunReport, RunStage, RunStats};
pub use crate::select::select;
pub use crate::types::{
    Budget, EntryIdentity, FeedSource, InterestProfile, RawEntry, ScoredEntry, ScorerStatus, Selection,
};
