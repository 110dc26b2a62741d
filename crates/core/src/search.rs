use std::{collections::HashMap, path::Path, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::{
    error::{LyrireelError, Result},
    types::Candidate,
};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Missing API key for {backend_name}")]
    MissingApiKey { backend_name: String },
}

/// Opaque semantic video search. Implementations only need to fill
/// `resource_id`, `start_ms`, `end_ms` and `score`.
#[async_trait]
pub trait SearchCollaborator: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Candidate>>;
}

#[async_trait]
impl<T: SearchCollaborator + ?Sized> SearchCollaborator for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Candidate>> {
        (**self).search(query, limit).await
    }
}

#[async_trait]
impl<T: SearchCollaborator + ?Sized> SearchCollaborator for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Candidate>> {
        (**self).search(query, limit).await
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchBackendKind {
    #[default]
    Http,
    Fixture,
}

impl SearchBackendKind {
    pub fn name(&self) -> &'static str {
        match self {
            SearchBackendKind::Http => "HTTP",
            SearchBackendKind::Fixture => "Fixture",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchBackendConfig {
    pub kind: SearchBackendKind,
    pub api_url: String,
    pub index: String,
    pub env_var: String,
    pub fixture_path: Option<PathBuf>,
}

impl Default for SearchBackendConfig {
    fn default() -> Self {
        Self {
            kind: SearchBackendKind::Http,
            api_url: "http://localhost:8080/v1/search".to_string(),
            index: "default".to_string(),
            env_var: "LYRIREEL_SEARCH_API_KEY".to_string(),
            fixture_path: None,
        }
    }
}

impl SearchBackendConfig {
    /// Validate that the API key is set for backends that need one
    pub fn validate_api_key(&self) -> std::result::Result<Option<String>, ProviderError> {
        match self.kind {
            SearchBackendKind::Fixture => Ok(None),
            SearchBackendKind::Http => {
                std::env::var(&self.env_var)
                    .map(Some)
                    .map_err(|_| ProviderError::MissingApiKey {
                        backend_name: self.kind.name().to_string(),
                    })
            }
        }
    }
}

/// Search backend, resolved once from config. Each variant is one concrete
/// backend behind the same contract.
pub enum SearchBackend {
    Http(HttpSearch),
    Fixture(FixtureSearch),
}

impl SearchBackend {
    pub async fn from_config(config: &SearchBackendConfig) -> Result<Self> {
        match config.kind {
            SearchBackendKind::Http => {
                let api_key = config.validate_api_key().map_err(|_| {
                    LyrireelError::MissingApiKey {
                        env_var: config.env_var.clone(),
                    }
                })?;
                Ok(SearchBackend::Http(HttpSearch::new(
                    &config.api_url,
                    &config.index,
                    api_key.unwrap_or_default(),
                )))
            }
            SearchBackendKind::Fixture => {
                let path = config
                    .fixture_path
                    .as_deref()
                    .ok_or_else(|| LyrireelError::InvalidConfig {
                        reason: "search.fixture_path is required for the fixture backend"
                            .to_string(),
                    })?;
                Ok(SearchBackend::Fixture(FixtureSearch::from_file(path).await?))
            }
        }
    }
}

#[async_trait]
impl SearchCollaborator for SearchBackend {
    fn name(&self) -> &str {
        match self {
            SearchBackend::Http(http) => http.name(),
            SearchBackend::Fixture(fixture) => fixture.name(),
        }
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Candidate>> {
        match self {
            SearchBackend::Http(http) => http.search(query, limit).await,
            SearchBackend::Fixture(fixture) => fixture.search(query, limit).await,
        }
    }
}

pub struct HttpSearch {
    client: reqwest::Client,
    api_url: String,
    index: String,
    api_key: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    video_id: String,
    start: f64,
    end: f64,
    score: f64,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl From<SearchHit> for Candidate {
    fn from(hit: SearchHit) -> Self {
        Candidate {
            resource_id: hit.video_id,
            start_ms: seconds_to_ms(hit.start),
            end_ms: seconds_to_ms(hit.end),
            score: hit.score,
            metadata: serde_json::Value::Object(hit.extra),
        }
    }
}

fn seconds_to_ms(seconds: f64) -> u64 {
    (seconds.max(0.0) * 1000.0).round() as u64
}

impl HttpSearch {
    pub fn new(api_url: &str, index: &str, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.to_string(),
            index: index.to_string(),
            api_key,
        }
    }

    fn unavailable(&self, reason: impl Into<String>) -> LyrireelError {
        LyrireelError::SearchUnavailable {
            backend: self.name().to_string(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl SearchCollaborator for HttpSearch {
    fn name(&self) -> &str {
        "http"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Candidate>> {
        let response = self
            .client
            .post(&self.api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({
                "query": query,
                "limit": limit,
                "index": self.index,
            }))
            .send()
            .await
            .map_err(|e| self.unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.unavailable(format!("{status}: {body}")));
        }

        let parsed: SearchResponse = response.json().await?;
        let mut candidates: Vec<Candidate> = parsed
            .results
            .into_iter()
            .map(Candidate::from)
            .filter(|c| c.end_ms > c.start_ms)
            .collect();
        candidates.truncate(limit);

        debug!(query, hits = candidates.len(), "search returned");
        Ok(candidates)
    }
}

/// In-memory backend keyed by query. A `"*"` entry answers unknown queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FixtureSearch {
    results: HashMap<String, Vec<Candidate>>,
}

impl FixtureSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn from_file(path: &Path) -> Result<Self> {
        let json_content = fs::read_to_string(path).await?;
        let fixture: FixtureSearch = serde_json::from_str(&json_content)?;
        Ok(fixture)
    }

    pub fn insert(&mut self, query: impl Into<String>, candidates: Vec<Candidate>) {
        self.results.insert(query.into(), candidates);
    }

    pub fn with(mut self, query: impl Into<String>, candidates: Vec<Candidate>) -> Self {
        self.insert(query, candidates);
        self
    }

    fn lookup(&self, query: &str) -> Option<&Vec<Candidate>> {
        self.results
            .get(query)
            .or_else(|| {
                self.results
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(query))
                    .map(|(_, v)| v)
            })
            .or_else(|| self.results.get("*"))
    }
}

#[async_trait]
impl SearchCollaborator for FixtureSearch {
    fn name(&self) -> &str {
        "fixture"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Candidate>> {
        Ok(self
            .lookup(query)
            .map(|hits| hits.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}
