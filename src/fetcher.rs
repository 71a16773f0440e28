// src/fetcher.rs
use reqwest::Client;
use serde_json::Value;
use std::time::{Duration, Instant};

use crate::errors::{Result, VerifyError};
use crate::request_builder::{self, BuiltRequest};

/// A parsed upstream response.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedJson {
    pub status: u16,
    pub body: Value,
    pub latency_ms: u64,
}

/// Transport used by the runner to retrieve the response under test.
///
/// Implemented over reqwest for real calls; tests substitute canned bodies.
pub trait JsonFetcher: Send + Sync {
    /// Issues a GET for `request` and parses the body as JSON.
    fn fetch_json(&self, request: &BuiltRequest) -> impl std::future::Future<Output = Result<FetchedJson>> + Send;
}

/// Fetches over HTTP with a shared reqwest client.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::new(client))
    }
}

impl JsonFetcher for HttpFetcher {
    async fn fetch_json(&self, request: &BuiltRequest) -> Result<FetchedJson> {
        log::debug!(
            "GET {} (headers: {:?})",
            request_builder::without_query(&request.url),
            request.header_names()
        );

        let mut builder = self.client.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let start = Instant::now();
        // reqwest errors carry the full URL, query credentials included.
        let resp = builder.send().await.map_err(|e| VerifyError::Request(e.without_url()))?;
        let status = resp.status();
        let text = resp.text().await.map_err(|e| VerifyError::Request(e.without_url()))?;
        let latency_ms = start.elapsed().as_millis() as u64;

        log::info!("Upstream responded {} in {}ms", status, latency_ms);
        if !status.is_success() {
            // Non-2xx bodies are still parsed and verified.
            log::warn!("Upstream returned non-success status {}", status);
        }

        let body: Value = serde_json::from_str(&text)?;
        Ok(FetchedJson {
            status: status.as_u16(),
            body,
            latency_ms,
        })
    }
}
