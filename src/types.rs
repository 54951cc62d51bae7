//! Wire types shared between the upstream client, the display state machines
//! and the HTML renderers.
//!
//! Field names follow the upstream trading API exactly (it mixes snake_case,
//! camelCase and PascalCase), so most structs carry explicit serde renames.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ============================================================================
// LOGS
// ============================================================================

/// Tag attached to a log entry by the trading agent.
///
/// The agent may emit tags this dashboard does not know about; those are kept
/// verbatim in [`LogTag::Other`] and rendered with fallback styling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogTag {
    BuyTxConfirmed,
    SellTxConfirmed,
    RugValidation,
    TelegramAiTokenAnalysis,
    Other(String),
}

impl LogTag {
    /// Every tag the dashboard has dedicated styling for
    pub const RECOGNIZED: [LogTag; 4] = [
        LogTag::BuyTxConfirmed,
        LogTag::SellTxConfirmed,
        LogTag::RugValidation,
        LogTag::TelegramAiTokenAnalysis,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            LogTag::BuyTxConfirmed => "buy_tx_confirmed",
            LogTag::SellTxConfirmed => "sell_tx_confirmed",
            LogTag::RugValidation => "rug_validation",
            LogTag::TelegramAiTokenAnalysis => "telegram_ai_token_analysis",
            LogTag::Other(s) => s,
        }
    }

    /// Human readable description (falls back to the raw tag name)
    pub fn description(&self) -> &str {
        match self {
            LogTag::BuyTxConfirmed => "Buy transaction confirmed",
            LogTag::SellTxConfirmed => "Sell transaction confirmed",
            LogTag::RugValidation => "Rug validation",
            LogTag::TelegramAiTokenAnalysis => "Telegram AI token analysis",
            LogTag::Other(s) => s,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, LogTag::Other(_))
    }
}

impl From<&str> for LogTag {
    fn from(s: &str) -> Self {
        match s {
            "buy_tx_confirmed" => LogTag::BuyTxConfirmed,
            "sell_tx_confirmed" => LogTag::SellTxConfirmed,
            "rug_validation" => LogTag::RugValidation,
            "telegram_ai_token_analysis" => LogTag::TelegramAiTokenAnalysis,
            other => LogTag::Other(other.to_string()),
        }
    }
}

impl fmt::Display for LogTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for LogTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LogTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(LogTag::from(s.as_str()))
    }
}

/// Empty or null tags are treated as "no tag"
fn deserialize_optional_tag<'de, D>(deserializer: D) -> Result<Option<LogTag>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .filter(|s| !s.trim().is_empty())
        .map(|s| LogTag::from(s.as_str())))
}

/// Missing and null both decode to the type's default
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Tag descriptor as returned by the live-logs endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagInfo {
    pub name: String,
    pub description: String,
}

impl From<&LogTag> for TagInfo {
    fn from(tag: &LogTag) -> Self {
        Self {
            name: tag.as_str().to_string(),
            description: tag.description().to_string(),
        }
    }
}

/// The recognized tag set in wire form
pub fn recognized_tags() -> Vec<TagInfo> {
    LogTag::RECOGNIZED.iter().map(TagInfo::from).collect()
}

/// A single log line produced by the trading agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    /// Calendar day, `YYYY-MM-DD`
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: String,
    /// Time of day, `HH:MM:SS`
    #[serde(default, deserialize_with = "null_as_default")]
    pub time: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub run_prefix: String,
    /// Absent for top-level process logs
    #[serde(default)]
    pub cycle: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_message: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub module: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub function: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub level: String,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_tag",
        skip_serializing_if = "Option::is_none"
    )]
    pub tag: Option<LogTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl LogEntry {
    /// Ordering key; both parts are zero padded so string order is time order
    pub fn sort_key(&self) -> (&str, &str) {
        (self.date.as_str(), self.time.as_str())
    }

    pub fn is_error(&self) -> bool {
        self.level.eq_ignore_ascii_case("error")
    }

    pub fn is_warning(&self) -> bool {
        self.level.eq_ignore_ascii_case("warning") || self.level.eq_ignore_ascii_case("warn")
    }

    /// The payload as display text. String payloads are shown as-is, anything
    /// else is pretty printed JSON.
    pub fn data_text(&self) -> Option<String> {
        match &self.data {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) if s.is_empty() => None,
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) => serde_json::to_string_pretty(other).ok(),
        }
    }
}

/// `data` payload of the live-logs endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiveLogsPage {
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    #[serde(default = "recognized_tags")]
    pub tags: Vec<TagInfo>,
}

/// `data` payload of the per-day logs endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DayLogs {
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

// ============================================================================
// TRADES
// ============================================================================

/// A trade executed by the agent, as reported by the trading-history endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: u64,
    /// Unix timestamp in seconds
    #[serde(rename = "Time")]
    pub time: i64,
    #[serde(rename = "Token")]
    pub token: String,
    #[serde(rename = "TokenName", default, deserialize_with = "null_as_default")]
    pub token_name: String,
    #[serde(rename = "TransactionType")]
    pub transaction_type: String,
    #[serde(rename = "TokenAmount", default, deserialize_with = "null_as_default")]
    pub token_amount: f64,
    #[serde(rename = "SolAmount", default, deserialize_with = "null_as_default")]
    pub sol_amount: f64,
    #[serde(rename = "SolFee", default, deserialize_with = "null_as_default")]
    pub sol_fee: f64,
    #[serde(rename = "PricePerTokenUSDC", default, deserialize_with = "null_as_default")]
    pub price_per_token_usdc: f64,
    #[serde(rename = "TotalUSDC", default, deserialize_with = "null_as_default")]
    pub total_usdc: f64,
    #[serde(rename = "Slot", default, deserialize_with = "null_as_default")]
    pub slot: u64,
    /// Executing venue
    #[serde(rename = "Program", default, deserialize_with = "null_as_default")]
    pub program: String,
    #[serde(rename = "BotName", default, deserialize_with = "null_as_default")]
    pub bot_name: String,
    #[serde(rename = "WalletPublicKey", default, deserialize_with = "null_as_default")]
    pub wallet_public_key: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub comment: String,
    #[serde(rename = "TxId", default, deserialize_with = "null_as_default")]
    pub tx_id: String,
    #[serde(rename = "ProfitLossSOL", default, skip_serializing_if = "Option::is_none")]
    pub profit_loss_sol: Option<f64>,
    #[serde(rename = "ProfitLossUSDC", default, skip_serializing_if = "Option::is_none")]
    pub profit_loss_usdc: Option<f64>,
    #[serde(rename = "ROIPercentage", default, skip_serializing_if = "Option::is_none")]
    pub roi_percentage: Option<f64>,
}

impl Trade {
    pub fn is_buy(&self) -> bool {
        self.transaction_type.eq_ignore_ascii_case("buy")
    }

    pub fn is_sell(&self) -> bool {
        self.transaction_type.eq_ignore_ascii_case("sell")
    }
}

// ============================================================================
// POOL & PERFORMANCE
// ============================================================================

/// One token holding in the trading pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolToken {
    #[serde(default)]
    pub token_name: String,
    pub token_symbol: String,
    #[serde(default)]
    pub token_mint: String,
    #[serde(default)]
    pub balance: f64,
    #[serde(rename = "tokenValueUSDC", default)]
    pub token_value_usdc: f64,
    #[serde(default)]
    pub percentage: f64,
}

/// Point-in-time pool composition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    #[serde(rename = "poolSizeTotalValueUSDC", default)]
    pub pool_size_total_value_usdc: f64,
    #[serde(default)]
    pub tokens: Vec<PoolToken>,
}

/// Accepts either a JSON string or number and keeps its display form
fn deserialize_display_value<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// A metric value with its period-over-period change (percent)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    #[serde(deserialize_with = "deserialize_display_value", default)]
    pub value: String,
    #[serde(default)]
    pub change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub win_rate: MetricValue,
    pub total_trades: MetricValue,
    pub volume: MetricValue,
    pub pool_size: MetricValue,
}
