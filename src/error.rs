// src/error.rs
//! Error taxonomy. Everything except `ConfigError` is recoverable and ends up
//! as a `RunWarning` on the run report.

use serde::Serialize;
use std::path::PathBuf;

use crate::types::EntryIdentity;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("timed out after {millis}ms")]
    Timeout { millis: u64 },

    #[error("unreachable: {0}")]
    Unreachable(String),

    #[error("fetch task aborted: {0}")]
    Task(String),
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unrecognized feed document ({0})")]
    UnknownFormat(String),

    #[error("malformed document: {0}")]
    Document(String),

    #[error("skipped entry #{index}: {reason}")]
    Entry { index: usize, reason: String },
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum JudgeError {
    /// Timeouts, rate limits, 5xx, network flakiness. Retried.
    #[error("transient judge error: {0}")]
    Transient(String),

    /// The provider refused the request. Terminal for the entry.
    #[error("judge rejected request: {0}")]
    Rejected(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("seen store {path} unreadable: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("seen store {path} corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("seen store {path} not writable: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The store could not be loaded, so saving would drop its history.
    #[error("seen store {store} left as is: it failed to load this run")]
    NotOverwritten { store: String },
}

/// The only fatal class: a run cannot even build a Selection.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid budget: {0}")]
    InvalidBudget(String),

    #[error("interest profile is empty")]
    EmptyProfile,

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },

    #[error("invalid value {value:?} for {name}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("missing API key (set {0})")]
    MissingApiKey(String),

    #[error("unsupported judge provider: {0}")]
    UnknownProvider(String),

    #[error("cannot build HTTP client: {0}")]
    HttpClient(String),
}

/// Recoverable problem attached to a run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunWarning {
    Fetch { source_id: String, message: String },
    Parse { source_id: String, message: String },
    Scorer { identity: EntryIdentity, title: String, message: String },
    Persistence { message: String },
}

impl RunWarning {
    pub fn fetch(source_id: &str, err: &FetchError) -> Self {
        Self::Fetch {
            source_id: source_id.to_string(),
            message: err.to_string(),
        }
    }

    pub fn parse(source_id: &str, err: &ParseError) -> Self {
        Self::Parse {
            source_id: source_id.to_string(),
            message: err.to_string(),
        }
    }

    pub fn persistence(err: &PersistenceError) -> Self {
        Self::Persistence {
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for RunWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunWarning::Fetch { source_id, message } => write!(f, "fetch [{source_id}]: {message}"),
            RunWarning::Parse { source_id, message } => write!(f, "parse [{source_id}]: {message}"),
            RunWarning::Scorer { title, message, .. } => write!(f, "scorer [{title}]: {message}"),
            RunWarning::Persistence { message } => write!(f, "seen store: {message}"),
        }
    }
}
