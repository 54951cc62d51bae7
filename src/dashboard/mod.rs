//! Web Dashboard Module
//!
//! A read-only dashboard for the trading agent, built with Axum and HTMX.
//! It serves no data of its own: every number comes from the upstream
//! trading API, either relayed as JSON under `/api/*` or rendered into HTML
//! fragments under `/partials/*`.
//!
//! # Features
//!
//! - **API proxy**: performance chart, pool history, pool data, performance
//!   metrics, trading history, live and per-day logs
//! - **Live log feed**: Server-Sent Events, one queued reveal session per
//!   connection
//! - **Log browser**: per-bot, per-day logs grouped by run and cycle
//! - **Trade history**: infinite scroll in fixed-size pages
//!
//! # Usage
//!
//! ```rust,ignore
//! use agent_dashboard::config::DashboardConfig;
//! use agent_dashboard::dashboard::{DashboardServer, DashboardState};
//!
//! let state = DashboardState::new(DashboardConfig::from_env());
//! DashboardServer::new(state).run().await?;
//! ```

pub mod error;
pub mod handlers;
pub mod render;
pub mod server;
pub mod sse;
pub mod state;

pub use error::ApiError;
pub use server::DashboardServer;
pub use state::DashboardState;
