use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Mt5Credentials;
use crate::error::{BotError, Result};
use crate::models::Candle;

// MT5 wire constants, as the terminal reports them
pub const TRADE_RETCODE_DONE: u32 = 10009;
pub const ORDER_TYPE_BUY: u8 = 0;
pub const ORDER_TYPE_SELL: u8 = 1;
pub const DEAL_TYPE_BUY: u8 = 0;
pub const DEAL_ENTRY_IN: u8 = 0;
pub const DEAL_ENTRY_OUT: u8 = 1;
pub const DEAL_ENTRY_INOUT: u8 = 2;

/// Candle timeframes the bot queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeframe {
    M5,
    M15,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M5 => "M5",
            Timeframe::M15 => "M15",
        }
    }
}

// ============== Wire Types ==============

#[derive(Debug, Serialize)]
struct ConnectRequest<'a> {
    login: i64,
    password: &'a str,
    server: &'a str,
}

#[derive(Debug, Deserialize)]
struct ConnectResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandlesResponse {
    candles: Vec<CandleRaw>,
}

#[derive(Debug, Deserialize)]
struct CandleRaw {
    time: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    tick_volume: u64,
}

/// MT5 market order request, field names matching the terminal's order_send
#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub volume: f64,
    #[serde(rename = "type")]
    pub order_type: u8,
    pub sl: f64,
    pub tp: f64,
    pub deviation: u32,
    pub magic: u64,
    pub comment: String,
    pub type_time: String,
    pub type_filling: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderResult {
    pub retcode: u32,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PositionsResponse {
    positions: Vec<PositionRaw>,
}

#[derive(Debug, Deserialize)]
struct PositionRaw {
    ticket: i64,
    symbol: String,
    #[serde(rename = "type")]
    position_type: u8,
    volume: f64,
    price_open: f64,
    price_current: f64,
    time: i64,
    profit: f64,
}

#[derive(Debug, Deserialize)]
struct DealsResponse {
    deals: Vec<DealRaw>,
}

#[derive(Debug, Deserialize)]
struct DealRaw {
    ticket: i64,
    symbol: String,
    #[serde(rename = "type")]
    deal_type: u8,
    entry: u8,
    price: f64,
    volume: f64,
    time: i64,
    profit: f64,
    commission: f64,
}

// ============== Public Types ==============

/// Open position reported by the terminal
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub ticket: i64,
    pub symbol: String,
    pub is_buy: bool,
    pub volume: f64,
    pub price_open: f64,
    pub price_current: f64,
    pub time: DateTime<Utc>,
    pub profit: f64,
}

/// Completed execution event from the terminal's deal history
#[derive(Debug, Clone, PartialEq)]
pub struct Deal {
    pub ticket: i64,
    pub symbol: String,
    pub is_buy: bool,
    pub entry: u8,
    pub price: f64,
    pub volume: f64,
    pub time: DateTime<Utc>,
    pub profit: f64,
    pub commission: f64,
}

impl From<PositionRaw> for Position {
    fn from(raw: PositionRaw) -> Self {
        Position {
            ticket: raw.ticket,
            symbol: raw.symbol,
            is_buy: raw.position_type == ORDER_TYPE_BUY,
            volume: raw.volume,
            price_open: raw.price_open,
            price_current: raw.price_current,
            time: epoch_to_utc(raw.time),
            profit: raw.profit,
        }
    }
}

impl From<DealRaw> for Deal {
    fn from(raw: DealRaw) -> Self {
        Deal {
            ticket: raw.ticket,
            symbol: raw.symbol,
            is_buy: raw.deal_type == DEAL_TYPE_BUY,
            entry: raw.entry,
            price: raw.price,
            volume: raw.volume,
            time: epoch_to_utc(raw.time),
            profit: raw.profit,
            commission: raw.commission,
        }
    }
}

fn epoch_to_utc(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

// ============== Implementation ==============

/// Client for the MT5 terminal bridge
#[derive(Clone)]
pub struct BridgeClient {
    client: Client,
    base_url: String,
}

impl BridgeClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Connect the terminal and log into the account. Idempotent on the
    /// bridge side; safe to call when already connected.
    pub async fn connect(&self, credentials: &Mt5Credentials) -> Result<()> {
        let url = format!("{}/connect", self.base_url);
        let body = ConnectRequest {
            login: credentials.login,
            password: &credentials.password,
            server: &credentials.server,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| BotError::Connection(e.to_string()))?;
        if !response.status().is_success() {
            return Err(BotError::Connection(format!(
                "bridge returned {}",
                response.status()
            )));
        }

        let data: ConnectResponse = response
            .json()
            .await
            .map_err(|e| BotError::Connection(e.to_string()))?;
        if !data.success {
            return Err(BotError::Connection(
                data.message.unwrap_or_else(|| "login rejected".to_string()),
            ));
        }

        tracing::info!("MT5 bridge connected (account {})", credentials.login);
        Ok(())
    }

    /// Fetch the most recent `count` candles for a symbol/timeframe
    pub async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Candle>> {
        let url = format!(
            "{}/candles?symbol={}&timeframe={}&count={}",
            self.base_url,
            symbol,
            timeframe.as_str(),
            count
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(BotError::Data(format!(
                "candle fetch returned {}",
                response.status()
            )));
        }

        let data: CandlesResponse = response.json().await?;
        let candles = data
            .candles
            .into_iter()
            .map(|raw| Candle {
                timestamp: epoch_to_utc(raw.time),
                open: raw.open,
                high: raw.high,
                low: raw.low,
                close: raw.close,
                tick_volume: raw.tick_volume,
            })
            .collect();

        Ok(candles)
    }

    /// Submit a market order. The caller decides what the retcode means.
    pub async fn submit_order(&self, request: &OrderRequest) -> Result<OrderResult> {
        let url = format!("{}/order", self.base_url);

        let response = self.client.post(&url).json(request).send().await?;
        if !response.status().is_success() {
            return Err(BotError::Data(format!(
                "order submit returned {}",
                response.status()
            )));
        }

        Ok(response.json().await?)
    }

    /// Fetch all open positions on the account
    pub async fn fetch_positions(&self) -> Result<Vec<Position>> {
        let url = format!("{}/positions", self.base_url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(BotError::Data(format!(
                "positions fetch returned {}",
                response.status()
            )));
        }

        let data: PositionsResponse = response.json().await?;
        Ok(data.positions.into_iter().map(Position::from).collect())
    }

    /// Fetch deal history from `since` up to now
    pub async fn fetch_deals(&self, since: DateTime<Utc>) -> Result<Vec<Deal>> {
        let url = format!("{}/deals?from={}", self.base_url, since.to_rfc3339());

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(BotError::Data(format!(
                "deal history fetch returned {}",
                response.status()
            )));
        }

        let data: DealsResponse = response.json().await?;
        Ok(data.deals.into_iter().map(Deal::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_request_wire_shape() {
        let request = OrderRequest {
            symbol: "BTCUSD".to_string(),
            volume: 1.0,
            order_type: ORDER_TYPE_BUY,
            sl: 98.0,
            tp: 104.0,
            deviation: 20,
            magic: 234000,
            comment: "buy trade".to_string(),
            type_time: "GTC".to_string(),
            type_filling: "IOC".to_string(),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["type"], 0);
        assert_eq!(json["deviation"], 20);
        assert_eq!(json["type_filling"], "IOC");
    }

    #[tokio::test]
    async fn test_fetch_candles_parses_bridge_payload() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/candles?symbol=BTCUSD&timeframe=M15&count=2")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"candles":[
                    {"time":1700000000,"open":100.0,"high":101.0,"low":99.0,"close":100.5,"tick_volume":42},
                    {"time":1700000900,"open":100.5,"high":102.0,"low":100.0,"close":101.5}
                ]}"#,
            )
            .create_async()
            .await;

        let client = BridgeClient::new(server.url());
        let candles = client
            .fetch_candles("BTCUSD", Timeframe::M15, 2)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].tick_volume, 42);
        assert_eq!(candles[1].close, 101.5);
        assert_eq!(candles[1].tick_volume, 0);
    }

    #[tokio::test]
    async fn test_connect_rejected_login() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/connect")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":false,"message":"Login failed"}"#)
            .create_async()
            .await;

        let client = BridgeClient::new(server.url());
        let credentials = Mt5Credentials {
            login: 1,
            password: "pw".to_string(),
            server: "Demo".to_string(),
        };

        let err = client.connect(&credentials).await.unwrap_err();
        assert!(matches!(err, BotError::Connection(_)));
    }
}
