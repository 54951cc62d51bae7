//! Axum server setup.
//!
//! This module wires every route onto the shared state, adds CORS, static
//! file serving and request tracing, and runs the server with graceful
//! shutdown.

use crate::dashboard::handlers::{
    api_live_logs, api_live_logs_stream, api_logs, api_performance_chart,
    api_performance_metrics, api_pool_data, api_pool_history, api_trading_history, health_check,
    index_page, logs_page, mark_started, partial_logs, partial_performance, partial_pool,
    partial_trades,
};
use crate::dashboard::state::DashboardState;
use axum::{
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;

/// Dashboard server
pub struct DashboardServer {
    state: Arc<DashboardState>,
    host: String,
    port: u16,
}

impl DashboardServer {
    /// Create a server bound to the configured host and port
    pub fn new(state: Arc<DashboardState>) -> Self {
        let host = state.config.host.clone();
        let port = state.config.port;
        Self { state, host, port }
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let cors = if self.state.config.enable_cors {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        } else {
            CorsLayer::new()
        };

        let static_service = ServeDir::new(&self.state.config.static_dir)
            .append_index_html_on_directories(true);

        Router::new()
            // HTML pages
            .route("/", get(index_page))
            .route("/logs", get(logs_page))
            // HTMX partials
            .route("/partials/logs", get(partial_logs))
            .route("/partials/performance", get(partial_performance))
            .route("/partials/pool", get(partial_pool))
            .route("/partials/trades", get(partial_trades))
            // API proxy
            .route("/api/agent-performance-chart", get(api_performance_chart))
            .route("/api/historical-pool-data", get(api_pool_history))
            .route("/api/get-pool-historical-data", get(api_pool_history))
            .route("/api/live-logs", get(api_live_logs))
            .route("/api/live-logs/stream", get(api_live_logs_stream))
            .route("/api/logs", get(api_logs))
            .route("/api/performance-metrics", get(api_performance_metrics))
            .route("/api/trading-history", get(api_trading_history))
            .route("/api/get-trading-history", get(api_trading_history))
            .route("/api/pool-data", get(api_pool_data))
            // Health check
            .route("/health", get(health_check))
            // Static files and styles
            .nest_service("/static", static_service)
            .route("/styles.css", get(serve_styles))
            .with_state(self.state.clone())
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server
    pub async fn run(self) -> anyhow::Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.host, self.port).parse()?;

        info!("Starting dashboard server at http://{}", addr);
        info!("Upstream trading API: {}", self.state.upstream.base_url());
        info!("Static files directory: {:?}", self.state.config.static_dir);

        let router = self.build_router();
        let listener = tokio::net::TcpListener::bind(addr).await?;
        mark_started();

        info!("Dashboard ready at http://{}", addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Dashboard server shut down");
        Ok(())
    }
}

/// Serve the embedded stylesheet
async fn serve_styles() -> impl IntoResponse {
    let css = include_str!("../../static/styles.css");
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/css")], css)
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}
