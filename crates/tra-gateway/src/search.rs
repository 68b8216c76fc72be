//! Search gateway: one `search` operation with normalised results.

use crate::error::{GatewayError, GatewayResult};
use crate::retry::with_backoff;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.tavily.com";
const API_KEY_ENV: &str = "TRA_SEARCH_API_KEY";

/// A search request; the caller constructs the query text.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub query: String,
    /// "basic" or "advanced".
    pub depth: String,
    pub max_results: u32,
}

/// One normalised search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
    /// 0.0-1.0, higher is more authoritative.
    pub authority_score: f64,
}

/// Uniform search interface; the workflow only sees this trait.
#[async_trait]
pub trait SearchGateway: Send + Sync {
    async fn search(&self, query: SearchQuery) -> GatewayResult<Vec<SearchHit>>;
}

#[derive(Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'a str,
    max_results: u32,
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Deserialize)]
struct TavilyResult {
    title: String,
    url: String,
    #[serde(default)]
    content: String,
    score: Option<f64>,
}

/// Production search gateway speaking the Tavily API.
pub struct TavilySearch {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for TavilySearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TavilySearch")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl TavilySearch {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Read the API key from `TRA_SEARCH_API_KEY`.
    pub fn from_env(timeout: Duration) -> GatewayResult<Self> {
        let api_key =
            std::env::var(API_KEY_ENV).map_err(|_| GatewayError::MissingApiKey(API_KEY_ENV))?;
        Ok(Self::new(api_key, timeout))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn call_once(&self, query: &SearchQuery) -> GatewayResult<Vec<SearchHit>> {
        let body = TavilyRequest {
            api_key: &self.api_key,
            query: &query.query,
            search_depth: &query.depth,
            max_results: query.max_results,
        };

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout
                } else {
                    GatewayError::Http(e)
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(GatewayError::RateLimited {
                retry_after_secs: None,
            });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::SearchFailed(format!(
                "status {}: {}",
                status, message
            )));
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::SearchFailed(e.to_string()))?;

        Ok(parsed
            .results
            .into_iter()
            .map(|r| SearchHit {
                title: r.title,
                url: r.url,
                snippet: r.content,
                authority_score: r.score.unwrap_or(0.0),
            })
            .collect())
    }
}

#[async_trait]
impl SearchGateway for TavilySearch {
    async fn search(&self, query: SearchQuery) -> GatewayResult<Vec<SearchHit>> {
        let hits = with_backoff("search", 3, Duration::from_millis(500), || {
            self.call_once(&query)
        })
        .await?;
        debug!(query = %query.query, hits = hits.len(), "search completed");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_search_normalises_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    {"title": "Postgres docs", "url": "https://postgresql.org", "content": "snippet", "score": 0.92},
                    {"title": "Comparison", "url": "https://example.com", "content": ""}
                ]
            })))
            .mount(&server)
            .await;

        let gateway =
            TavilySearch::new("key", Duration::from_secs(5)).with_base_url(server.uri());
        let hits = gateway
            .search(SearchQuery {
                query: "best relational database".to_string(),
                depth: "basic".to_string(),
                max_results: 5,
            })
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "Postgres docs");
        assert!((hits[0].authority_score - 0.92).abs() < 1e-9);
        assert_eq!(hits[1].authority_score, 0.0);
    }

    #[tokio::test]
    async fn test_server_error_is_search_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let gateway =
            TavilySearch::new("key", Duration::from_secs(5)).with_base_url(server.uri());
        let err = gateway
            .search(SearchQuery {
                query: "q".to_string(),
                depth: "basic".to_string(),
                max_results: 1,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::SearchFailed(_)));
    }
}
