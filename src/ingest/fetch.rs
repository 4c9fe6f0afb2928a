// src/ingest/fetch.rs
//! Feed fetch collaborators: real HTTP and an in-memory fixture map.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{ConfigError, FetchError};
use crate::types::FeedSource;

pub const DEFAULT_USER_AGENT: &str = "arxiveroo/0.1 (+feed relevance digest)";

#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Raw document text for `source.url`. Any error is a per-source failure.
    async fn fetch(&self, source: &FeedSource) -> Result<String, FetchError>;
}

pub struct HttpFetcher {
    http: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(10).min(timeout))
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl FeedFetcher for HttpFetcher {
    async fn fetch(&self, source: &FeedSource) -> Result<String, FetchError> {
        let resp = self.http.get(&source.url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: source.url.clone(),
            });
        }
        Ok(resp.text().await?)
    }
}

/// Serves documents from memory, keyed by URL.
#[derive(Default, Clone)]
pub struct StaticFetcher {
    docs: HashMap<String, String>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.docs.insert(url.into(), body.into());
        self
    }
}

#[async_trait]
impl FeedFetcher for StaticFetcher {
    async fn fetch(&self, source: &FeedSource) -> Result<String, FetchError> {
        self.docs
            .get(&source.url)
            .cloned()
            .ok_or_else(|| FetchError::Unreachable(source.url.clone()))
    }
}
