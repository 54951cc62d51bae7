//! HTTP route handlers for the dashboard.
//!
//! The `/api/*` handlers are thin proxies onto the upstream trading API: they
//! apply parameter defaults, validate where needed, forward the request and
//! relay the reply inside the standard envelope. The `/partials/*` handlers
//! fetch the same data typed and render it as HTMX fragments.

use crate::config::{LOG_DAYS_LISTED, TRADE_PAGE_SIZE};
use crate::dashboard::error::{ensure_envelope, ApiError};
use crate::dashboard::render::{
    render_day_logs, render_error_box, render_logs_page, render_performance, render_pool,
    render_trade_error, render_trade_rows,
};
use crate::dashboard::sse::create_log_feed_stream;
use crate::dashboard::state::DashboardState;
use crate::log_groups::group_day_logs;
use crate::types::{recognized_tags, DayLogs, PerformanceMetrics, PoolSnapshot};
use crate::upstream::{
    PATH_LIVE_LOGS, PATH_LOGS, PATH_PERFORMANCE_CHART, PATH_PERFORMANCE_METRICS, PATH_POOL_DATA,
    PATH_POOL_HISTORY, PATH_TRADING_HISTORY,
};
use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Json},
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, warn};

const MSG_PERFORMANCE_CHART: &str = "Failed to fetch agent performance chart data";
const MSG_POOL_HISTORY: &str = "Failed to fetch pool historical data";
const MSG_LOGS: &str = "Failed to fetch logs";
const MSG_PERFORMANCE_METRICS: &str = "Failed to fetch performance metrics";
const MSG_TRADING_HISTORY: &str = "Failed to fetch trading history data";
const MSG_POOL_DATA: &str = "Failed to fetch pool data";

// ============================================================================
// QUERY PARAMETERS
// ============================================================================

// All parameters arrive as raw strings; an empty value counts as missing.

#[derive(Debug, Default, Deserialize)]
pub struct TimeframeQuery {
    pub timeframe: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LiveLogsQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogsQuery {
    pub module: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TradingHistoryQuery {
    pub offset: Option<String>,
    pub limit: Option<String>,
}

/// Parameter value, or `default` when absent or empty
fn param<'a>(value: &'a Option<String>, default: &'a str) -> &'a str {
    value.as_deref().filter(|v| !v.is_empty()).unwrap_or(default)
}

fn is_valid_date(date: &str) -> bool {
    let bytes = date.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

fn is_valid_module(module: &str) -> bool {
    !module.is_empty()
        && module
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Check a per-day log request, returning `(module, date)`
pub fn validate_logs_query(query: &LogsQuery) -> Result<(&str, &str), ApiError> {
    let module = query.module.as_deref().filter(|m| !m.is_empty());
    let date = query.date.as_deref().filter(|d| !d.is_empty());

    let (Some(module), Some(date)) = (module, date) else {
        return Err(ApiError::validation(
            "Both module and date parameters are required",
        ));
    };
    if !is_valid_date(date) {
        return Err(ApiError::validation(
            "Invalid date format. Please use YYYY-MM-DD format.",
        ));
    }
    if !is_valid_module(module) {
        return Err(ApiError::validation("Invalid module name format"));
    }
    Ok((module, date))
}

// ============================================================================
// UPSTREAM FORWARDING
// ============================================================================

/// Forward a GET upstream and return the raw 2xx body
async fn forward(
    state: &DashboardState,
    path: &str,
    query: &[(&str, &str)],
    generic: &str,
) -> Result<Value, ApiError> {
    let expose = state.expose_error_details();

    let reply = state.upstream.get_json(path, query).await.map_err(|e| {
        error!("{} ({}): {}", generic, path, e);
        ApiError::from_upstream(e, generic, expose)
    })?;

    if !reply.is_success() {
        warn!("{} ({}): upstream status {}", generic, path, reply.status);
        return Err(ApiError::from_upstream(reply.into_error(generic), generic, expose));
    }
    Ok(reply.body)
}

/// Forward a GET upstream and decode the envelope payload as `T`
async fn fetch<T: DeserializeOwned>(
    state: &DashboardState,
    path: &str,
    query: &[(&str, &str)],
    generic: &str,
) -> Result<T, ApiError> {
    let expose = state.expose_error_details();
    let result = match state.upstream.get_json(path, query).await {
        Ok(reply) => reply.into_data(generic),
        Err(e) => Err(e),
    };
    result.map_err(|e| {
        warn!("{} ({}): {}", generic, path, e);
        ApiError::from_upstream(e, generic, expose)
    })
}

// ============================================================================
// HTML PAGE HANDLERS
// ============================================================================

/// Main dashboard page
pub async fn index_page() -> impl IntoResponse {
    Html(include_str!("../../static/index.html"))
}

/// Log browser: one tab per bot, the last days newest first
pub async fn logs_page(State(state): State<Arc<DashboardState>>) -> impl IntoResponse {
    let today = Utc::now().date_naive();
    let dates: Vec<_> = (0..LOG_DAYS_LISTED)
        .filter_map(|days| today.checked_sub_signed(chrono::Duration::days(days)))
        .collect();
    Html(render_logs_page(&state.config.bots, &dates))
}

// ============================================================================
// API HANDLERS (JSON PROXY)
// ============================================================================

pub async fn api_performance_chart(
    State(state): State<Arc<DashboardState>>,
    Query(query): Query<TimeframeQuery>,
) -> Result<Json<Value>, ApiError> {
    let timeframe = param(&query.timeframe, "30d");
    let body = forward(
        &state,
        PATH_PERFORMANCE_CHART,
        &[("timeframe", timeframe)],
        MSG_PERFORMANCE_CHART,
    )
    .await?;
    Ok(Json(ensure_envelope(body)))
}

/// Served under both the historical and the `get-` prefixed route
pub async fn api_pool_history(
    State(state): State<Arc<DashboardState>>,
    Query(query): Query<TimeframeQuery>,
) -> Result<Json<Value>, ApiError> {
    let timeframe = param(&query.timeframe, "30d");
    let body = forward(
        &state,
        PATH_POOL_HISTORY,
        &[("timeframe", timeframe)],
        MSG_POOL_HISTORY,
    )
    .await?;
    Ok(Json(ensure_envelope(body)))
}

/// Live logs, always reshaped to `{ data: { logs, tags }, success: true }`
pub async fn api_live_logs(
    State(state): State<Arc<DashboardState>>,
    Query(query): Query<LiveLogsQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = param(&query.limit, "20");
    let offset = param(&query.offset, "0");
    let body = forward(
        &state,
        PATH_LIVE_LOGS,
        &[("limit", limit), ("offset", offset)],
        MSG_LOGS,
    )
    .await?;
    Ok(Json(reshape_live_logs(&body)))
}

fn reshape_live_logs(body: &Value) -> Value {
    let payload = body.get("data").filter(|d| d.is_object()).unwrap_or(body);
    let logs = payload
        .get("logs")
        .filter(|v| v.is_array())
        .cloned()
        .unwrap_or_else(|| json!([]));
    let tags = payload
        .get("tags")
        .filter(|v| v.is_array())
        .cloned()
        .unwrap_or_else(|| json!(recognized_tags()));

    json!({ "data": { "logs": logs, "tags": tags }, "success": true })
}

pub async fn api_logs(
    State(state): State<Arc<DashboardState>>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Value>, ApiError> {
    let (module, date) = validate_logs_query(&query).map_err(|e| {
        debug!("Rejected logs request: {}", e);
        e
    })?;
    let body = forward(
        &state,
        PATH_LOGS,
        &[("module", module), ("date", date)],
        MSG_LOGS,
    )
    .await?;
    Ok(Json(ensure_envelope(body)))
}

pub async fn api_performance_metrics(
    State(state): State<Arc<DashboardState>>,
    Query(query): Query<TimeframeQuery>,
) -> Result<Json<Value>, ApiError> {
    let timeframe = param(&query.timeframe, "24h");
    let body = forward(
        &state,
        PATH_PERFORMANCE_METRICS,
        &[("timeframe", timeframe)],
        MSG_PERFORMANCE_METRICS,
    )
    .await?;
    Ok(Json(ensure_envelope(body)))
}

/// Served under both the plain and the `get-` prefixed route
pub async fn api_trading_history(
    State(state): State<Arc<DashboardState>>,
    Query(query): Query<TradingHistoryQuery>,
) -> Result<Json<Value>, ApiError> {
    let offset = param(&query.offset, "0");
    let limit = param(&query.limit, "100");
    let body = forward(
        &state,
        PATH_TRADING_HISTORY,
        &[("offset", offset), ("limit", limit)],
        MSG_TRADING_HISTORY,
    )
    .await?;
    Ok(Json(ensure_envelope(body)))
}

pub async fn api_pool_data(
    State(state): State<Arc<DashboardState>>,
) -> Result<Json<Value>, ApiError> {
    let body = forward(&state, PATH_POOL_DATA, &[], MSG_POOL_DATA).await?;
    Ok(Json(ensure_envelope(body)))
}

/// SSE live log feed; one session per connection
pub async fn api_live_logs_stream(State(state): State<Arc<DashboardState>>) -> impl IntoResponse {
    create_log_feed_stream(state)
}

// ============================================================================
// HTMX PARTIAL HANDLERS
// ============================================================================

// Partials always answer 200 so HTMX swaps the error box in.

pub async fn partial_logs(
    State(state): State<Arc<DashboardState>>,
    Query(query): Query<LogsQuery>,
) -> Html<String> {
    let (module, date) = match validate_logs_query(&query) {
        Ok(params) => params,
        Err(e) => return Html(render_error_box(e.message())),
    };

    match fetch::<DayLogs>(&state, PATH_LOGS, &[("module", module), ("date", date)], MSG_LOGS).await
    {
        Ok(day) => Html(render_day_logs(&group_day_logs(day.logs))),
        Err(e) => Html(render_error_box(e.message())),
    }
}

pub async fn partial_performance(
    State(state): State<Arc<DashboardState>>,
    Query(query): Query<TimeframeQuery>,
) -> Html<String> {
    let timeframe = param(&query.timeframe, "24h");
    let result = fetch::<PerformanceMetrics>(
        &state,
        PATH_PERFORMANCE_METRICS,
        &[("timeframe", timeframe)],
        MSG_PERFORMANCE_METRICS,
    )
    .await;

    match result {
        Ok(metrics) => Html(render_performance(&metrics)),
        Err(e) => Html(render_error_box(e.message())),
    }
}

pub async fn partial_pool(State(state): State<Arc<DashboardState>>) -> Html<String> {
    match fetch::<PoolSnapshot>(&state, PATH_POOL_DATA, &[], MSG_POOL_DATA).await {
        Ok(pool) => Html(render_pool(&pool)),
        Err(e) => Html(render_error_box(e.message())),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TradesPartialQuery {
    pub offset: Option<String>,
}

/// One page of trade rows, followed by a load-more sentinel on a full page.
///
/// This is the stateless HTML form of [`crate::trade_pager::TradePager`]: the
/// offset travels in the sentinel, the sentinel's single `revealed` trigger
/// stands in for the in-flight guard, and a failed page leaves a retry row
/// at the same offset.
pub async fn partial_trades(
    State(state): State<Arc<DashboardState>>,
    Query(query): Query<TradesPartialQuery>,
) -> Html<String> {
    let offset: u32 = param(&query.offset, "0").parse().unwrap_or(0);

    match state.upstream.trading_history(offset, TRADE_PAGE_SIZE).await {
        Ok(trades) => Html(render_trade_rows(&trades, offset, TRADE_PAGE_SIZE)),
        Err(e) => {
            warn!("{} (offset {}): {}", MSG_TRADING_HISTORY, offset, e);
            Html(render_trade_error(MSG_TRADING_HISTORY, offset))
        }
    }
}

// ============================================================================
// HEALTH CHECK
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

static START_TIME: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();

/// Mark process start for the health uptime counter
pub fn mark_started() {
    START_TIME.get_or_init(std::time::Instant::now);
}

pub async fn health_check() -> impl IntoResponse {
    let start = START_TIME.get_or_init(std::time::Instant::now);

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: start.elapsed().as_secs(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn logs_query(module: Option<&str>, date: Option<&str>) -> LogsQuery {
        LogsQuery {
            module: module.map(String::from),
            date: date.map(String::from),
        }
    }

    #[test]
    fn test_param_defaults() {
        assert_eq!(param(&None, "30d"), "30d");
        assert_eq!(param(&Some(String::new()), "30d"), "30d");
        assert_eq!(param(&Some("7d".to_string()), "30d"), "7d");
    }

    #[test]
    fn test_logs_query_requires_both() {
        for query in [
            logs_query(None, Some("2024-01-01")),
            logs_query(Some("tracker-bot"), None),
            logs_query(Some(""), Some("2024-01-01")),
        ] {
            let err = validate_logs_query(&query).unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
            assert_eq!(err.message(), "Both module and date parameters are required");
        }
    }

    #[test]
    fn test_logs_query_date_format() {
        for date in ["01-01-2024", "2024-1-01", "2024/01/01", "2024-01-011", "abcd-ef-gh"] {
            let err = validate_logs_query(&logs_query(Some("tracker-bot"), Some(date))).unwrap_err();
            assert_eq!(
                err.message(),
                "Invalid date format. Please use YYYY-MM-DD format."
            );
        }
    }

    #[test]
    fn test_logs_query_module_format() {
        for module in ["bad module", "../etc", "bot;drop"] {
            let err =
                validate_logs_query(&logs_query(Some(module), Some("2024-01-01"))).unwrap_err();
            assert_eq!(err.message(), "Invalid module name format");
        }

        let query = logs_query(Some("solana_sniper-bot2"), Some("2024-01-01"));
        let ok = validate_logs_query(&query);
        assert_eq!(ok.unwrap(), ("solana_sniper-bot2", "2024-01-01"));
    }

    #[test]
    fn test_reshape_live_logs() {
        let enveloped = json!({"data": {"logs": [{"id": 1}]}, "success": true});
        let out = reshape_live_logs(&enveloped);
        assert_eq!(out["success"], json!(true));
        assert_eq!(out["data"]["logs"][0]["id"], json!(1));
        assert_eq!(out["data"]["tags"].as_array().unwrap().len(), 4);

        let bare = json!({"logs": [], "tags": [{"name": "x", "description": "y"}]});
        let out = reshape_live_logs(&bare);
        assert_eq!(out["data"]["tags"][0]["name"], json!("x"));

        let out = reshape_live_logs(&json!({}));
        assert_eq!(out["data"]["logs"], json!([]));
    }

    #[tokio::test]
    async fn test_health_check() {
        mark_started();
        let response = health_check().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
