//! Shared application state for the dashboard.
//!
//! The state is immutable after startup: configuration plus the shared
//! upstream client. Live log sessions own their own display state and never
//! share it.

use crate::config::DashboardConfig;
use crate::log_feed::LogFeedConfig;
use crate::upstream::UpstreamClient;
use std::sync::Arc;

/// Shared dashboard state
pub struct DashboardState {
    /// Process-wide configuration
    pub config: DashboardConfig,

    /// Client for the remote trading API
    pub upstream: Arc<UpstreamClient>,

    /// Timing for live log sessions
    pub feed: LogFeedConfig,
}

impl DashboardState {
    /// Create state from configuration
    pub fn new(config: DashboardConfig) -> Arc<Self> {
        Self::with_feed_config(config, LogFeedConfig::default())
    }

    /// Create state with custom live log timing
    pub fn with_feed_config(config: DashboardConfig, feed: LogFeedConfig) -> Arc<Self> {
        let upstream = Arc::new(UpstreamClient::from_config(&config));
        Arc::new(Self {
            config,
            upstream,
            feed,
        })
    }

    /// Whether error responses may include diagnostic detail
    pub fn expose_error_details(&self) -> bool {
        self.config.expose_error_details()
    }
}

impl Default for DashboardState {
    fn default() -> Self {
        let config = DashboardConfig::default();
        Self {
            upstream: Arc::new(UpstreamClient::from_config(&config)),
            config,
            feed: LogFeedConfig::default(),
        }
    }
}
