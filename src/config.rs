//! Process-wide configuration and tuning constants.
//!
//! [`DashboardConfig`] is read once from the environment at startup and then
//! shared read-only for the lifetime of the process.

use std::path::PathBuf;
use std::time::Duration;

/// Upstream trading API used when `API_BOTS_URL` is not set
pub const DEFAULT_API_BOTS_URL: &str = "http://127.0.0.1:9090";

/// Default dashboard port
pub const DEFAULT_DASHBOARD_PORT: u16 = 3000;

/// Upstream request timeout
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;

/// How often a live log session polls for new entries
pub const LOG_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// How often one queued entry is revealed
pub const LOG_REVEAL_INTERVAL: Duration = Duration::from_secs(5);

/// How long the newest entry pulses when nothing new arrived
pub const LOG_BLINK_DURATION: Duration = Duration::from_millis(2500);

/// Entries kept in the rolling log window
pub const MAX_ALL_LOGS: usize = 50;

/// Entries visible in the live feed
pub const MAX_DISPLAYED_LOGS: usize = 10;

/// Page size used by the live feed when polling `/api/live-logs`
pub const LIVE_LOGS_LIMIT: u32 = 20;

/// Page size of the trade history pager
pub const TRADE_PAGE_SIZE: u32 = 20;

/// Days listed on the logs page
pub const LOG_DAYS_LISTED: i64 = 10;

/// Bots whose logs can be browsed on the logs page
pub const DEFAULT_BOTS: [&str; 3] = ["tracker-bot", "telegram-trading-bot", "solana-sniper-bot"];

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Environment::Development,
            _ => Environment::Production,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Dashboard configuration
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Base address of the upstream trading API, without trailing slash
    pub api_bots_url: String,
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Path to static files directory
    pub static_dir: PathBuf,
    /// Enable permissive CORS
    pub enable_cors: bool,
    pub environment: Environment,
    pub upstream_timeout: Duration,
    /// Bot modules listed on the logs page
    pub bots: Vec<String>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_bots_url: DEFAULT_API_BOTS_URL.to_string(),
            host: "127.0.0.1".to_string(),
            port: DEFAULT_DASHBOARD_PORT,
            static_dir: PathBuf::from("static"),
            enable_cors: true,
            environment: Environment::Production,
            upstream_timeout: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
            bots: DEFAULT_BOTS.iter().map(|b| b.to_string()).collect(),
        }
    }
}

impl DashboardConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. Unset or unparsable values
    /// fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let bots: Vec<String> = lookup("DASHBOARD_BOTS")
            .map(|v| {
                v.split(',')
                    .map(|b| b.trim().to_string())
                    .filter(|b| !b.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            api_bots_url: lookup("API_BOTS_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.api_bots_url),
            host: lookup("DASHBOARD_HOST").unwrap_or(defaults.host),
            port: lookup("DASHBOARD_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            static_dir: lookup("DASHBOARD_STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            enable_cors: lookup("DASHBOARD_CORS")
                .map(|v| v == "1" || v.to_lowercase() == "true")
                .unwrap_or(defaults.enable_cors),
            environment: lookup("DASHBOARD_ENV")
                .map(|v| Environment::parse(&v))
                .unwrap_or(defaults.environment),
            upstream_timeout: lookup("UPSTREAM_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.upstream_timeout),
            bots: if bots.is_empty() { defaults.bots } else { bots },
        }
    }

    /// Whether error responses may carry diagnostic detail
    pub fn expose_error_details(&self) -> bool {
        self.environment == Environment::Development
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = DashboardConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.api_bots_url, "http://127.0.0.1:9090");
        assert!(config.enable_cors);
        assert!(!config.expose_error_details());
        assert_eq!(config.bots.len(), 3);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = DashboardConfig::from_lookup(lookup_from(&[
            ("API_BOTS_URL", "http://10.0.0.5:9090/"),
            ("DASHBOARD_PORT", "8088"),
            ("DASHBOARD_CORS", "false"),
            ("DASHBOARD_ENV", "development"),
            ("UPSTREAM_TIMEOUT_SECS", "5"),
            ("DASHBOARD_BOTS", "tracker-bot, ,alpha-bot"),
        ]));
        assert_eq!(config.api_bots_url, "http://10.0.0.5:9090");
        assert_eq!(config.port, 8088);
        assert!(!config.enable_cors);
        assert!(config.expose_error_details());
        assert_eq!(config.upstream_timeout, Duration::from_secs(5));
        assert_eq!(config.bots, vec!["tracker-bot", "alpha-bot"]);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = DashboardConfig::from_lookup(lookup_from(&[
            ("DASHBOARD_PORT", "not-a-port"),
            ("UPSTREAM_TIMEOUT_SECS", "0"),
            ("DASHBOARD_ENV", "staging"),
            ("API_BOTS_URL", "  "),
        ]));
        assert_eq!(config.port, DEFAULT_DASHBOARD_PORT);
        assert_eq!(config.upstream_timeout, Duration::from_secs(30));
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.api_bots_url, DEFAULT_API_BOTS_URL);
    }
}
