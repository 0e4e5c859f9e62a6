use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLC candlestick as reported by the MT5 terminal bridge
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub tick_volume: u64,
}

/// Trade direction derived from the 15m trend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "buy",
            Direction::Sell => "sell",
        }
    }
}

/// Bot lifecycle state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BotStatus {
    Stopped,
    Running,
}

impl BotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BotStatus::Stopped => "stopped",
            BotStatus::Running => "running",
        }
    }
}

/// Snapshot of the last order the gateway filled
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeIntent {
    pub direction: Direction,
    pub entry: f64,
    pub sl: f64,
    pub tp: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Open,
    Closed,
}

/// Where a trade record came from: placed by this bot, or reported by the
/// terminal (open position / deal history)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TradeSource {
    Bot,
    Mt5,
}

/// One entry in the merged trade list. Ids are prefixed by origin
/// (`bot-<seq>`, `mt5-<ticket>`, `mt5-closed-<ticket>`) and unique within
/// the list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TradeRecord {
    pub id: String,
    pub symbol: String,
    pub direction: Direction,
    pub entry_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_price: Option<f64>,
    pub quantity: f64,
    pub timestamp: DateTime<Utc>,
    pub status: TradeStatus,
    pub source: TradeSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission: Option<f64>,
}
