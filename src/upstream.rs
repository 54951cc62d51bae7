//! HTTP client for the remote trading API.
//!
//! Every proxy endpoint and every live log session goes through one shared
//! [`UpstreamClient`]. Replies are classified into three outcomes:
//!
//! - 2xx with a JSON body: [`UpstreamReply`] carrying the parsed body
//! - non-2xx: [`UpstreamReply`] carrying the status and whatever JSON body
//!   came with it (or `Null`)
//! - connect failure, timeout or an unparsable 2xx body: [`UpstreamError`]

use crate::config::DashboardConfig;
use crate::types::{LiveLogsPage, Trade};
use async_trait::async_trait;
use axum::http::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

// ============================================================================
// UPSTREAM PATHS
// ============================================================================

pub const PATH_PERFORMANCE_CHART: &str = "/api/agent-performance-chart";
pub const PATH_POOL_HISTORY: &str = "/api/get-pool-historical-data";
pub const PATH_LIVE_LOGS: &str = "/api/live-logs";
pub const PATH_LOGS: &str = "/api/logs";
pub const PATH_PERFORMANCE_METRICS: &str = "/api/performance-metrics";
pub const PATH_TRADING_HISTORY: &str = "/api/get-trading-history";
pub const PATH_POOL_DATA: &str = "/api/pool-data";

/// Upstream result type
pub type UpstreamResult<T> = Result<T, UpstreamError>;

/// Upstream errors
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid JSON from upstream: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Upstream returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("Upstream reported failure: {0}")]
    Rejected(String),
}

/// A reply from the upstream API that made it back over the wire
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: StatusCode,
    pub body: Value,
}

impl UpstreamReply {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The `error` string of a JSON error body, if there is one
    pub fn error_message(&self) -> Option<&str> {
        self.body
            .get("error")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Turn a non-2xx reply into an error, using `fallback` when the body has
    /// no message of its own
    pub fn into_error(self, fallback: &str) -> UpstreamError {
        UpstreamError::Status {
            status: self.status,
            message: self.error_message().unwrap_or(fallback).to_string(),
        }
    }

    /// Extract the typed payload of a `{ data, success }` envelope. Bodies
    /// without an envelope are decoded as the payload directly.
    pub fn into_data<T: DeserializeOwned>(self, fallback: &str) -> UpstreamResult<T> {
        if !self.is_success() {
            return Err(self.into_error(fallback));
        }

        let mut body = self.body;
        if let Some(false) = body.get("success").and_then(Value::as_bool) {
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or(fallback)
                .to_string();
            return Err(UpstreamError::Rejected(message));
        }

        let enveloped = body.get("success").is_some();
        let payload = match body.get_mut("data") {
            Some(data) if enveloped => data.take(),
            _ => body,
        };
        Ok(serde_json::from_value(payload)?)
    }
}

/// Client for the remote trading API
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    base_url: String,
    client: reqwest::Client,
}

impl UpstreamClient {
    /// Create a client for `base_url` (trailing slashes are ignored)
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn from_config(config: &DashboardConfig) -> Self {
        Self::new(config.api_bots_url.clone(), config.upstream_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for an upstream path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET `path` with `query` and parse the JSON reply.
    ///
    /// Non-2xx replies are returned as `Ok` so callers can relay the status;
    /// only transport and decode failures are errors.
    pub async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> UpstreamResult<UpstreamReply> {
        let url = self.url(path);
        debug!("Upstream GET {} {:?}", url, query);

        let response = self
            .client
            .get(&url)
            .query(query)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = StatusCode::from_u16(response.status().as_u16())
            .unwrap_or(StatusCode::BAD_GATEWAY);
        let bytes = response.bytes().await?;

        if status.is_success() {
            let body: Value = serde_json::from_slice(&bytes)?;
            return Ok(UpstreamReply { status, body });
        }

        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        warn!("Upstream {} returned {}", url, status);
        Ok(UpstreamReply { status, body })
    }

    /// Fetch a page of live log entries
    pub async fn live_logs(&self, limit: u32, offset: u32) -> UpstreamResult<LiveLogsPage> {
        let limit = limit.to_string();
        let offset = offset.to_string();
        let reply = self
            .get_json(PATH_LIVE_LOGS, &[("limit", &limit), ("offset", &offset)])
            .await?;
        reply.into_data("Failed to fetch logs")
    }

    /// Fetch a page of trade history
    pub async fn trading_history(&self, offset: u32, limit: u32) -> UpstreamResult<Vec<Trade>> {
        let offset = offset.to_string();
        let limit = limit.to_string();
        let reply = self
            .get_json(PATH_TRADING_HISTORY, &[("offset", &offset), ("limit", &limit)])
            .await?;
        reply.into_data("Failed to fetch trading history data")
    }
}

// ============================================================================
// DATA SOURCES
// ============================================================================

/// Source of live log pages for a display session
#[async_trait]
pub trait LogSource: Send + Sync {
    async fn fetch_logs(&self, limit: u32) -> UpstreamResult<LiveLogsPage>;
}

/// Source of trade history pages
#[async_trait]
pub trait TradeSource: Send + Sync {
    async fn fetch_trades(&self, offset: u32, limit: u32) -> UpstreamResult<Vec<Trade>>;
}

#[async_trait]
impl LogSource for UpstreamClient {
    async fn fetch_logs(&self, limit: u32) -> UpstreamResult<LiveLogsPage> {
        self.live_logs(limit, 0).await
    }
}

#[async_trait]
impl TradeSource for UpstreamClient {
    async fn fetch_trades(&self, offset: u32, limit: u32) -> UpstreamResult<Vec<Trade>> {
        self.trading_history(offset, limit).await
    }
}
