//! Agent Dashboard
//!
//! Serves the dashboard UI and proxies its data requests to the trading
//! agent's API. Configuration comes from the environment (and `.env`).

use agent_dashboard::config::DashboardConfig;
use agent_dashboard::dashboard::{DashboardServer, DashboardState};
use anyhow::Result;
use tracing::info;
use tracing_subscriber::filter::{Directive, EnvFilter, LevelFilter};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    let default_directive: Directive = "agent_dashboard=info"
        .parse()
        .unwrap_or_else(|_| LevelFilter::INFO.into());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(default_directive))
        .init();

    let config = DashboardConfig::from_env();

    info!("Agent Dashboard v{}", env!("CARGO_PKG_VERSION"));
    info!("   Upstream API: {}", config.api_bots_url);
    info!("   Environment: {}", config.environment);
    info!("   Upstream timeout: {}s", config.upstream_timeout.as_secs());
    info!("   Log bots: {}", config.bots.join(", "));

    let state = DashboardState::new(config);
    DashboardServer::new(state).run().await
}
