//! Agent Dashboard
//!
//! Read-only web dashboard and API proxy for an autonomous trading agent.
//! The dashboard forwards requests to the agent's trading API, drip-feeds
//! its live logs and renders trades, pool composition and performance.

pub mod config;
pub mod dashboard;
pub mod log_feed;
pub mod log_groups;
pub mod log_queue;
pub mod trade_pager;
pub mod types;
pub mod upstream;
