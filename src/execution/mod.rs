use chrono::Utc;

use crate::broker::{BridgeClient, OrderRequest, ORDER_TYPE_BUY, ORDER_TYPE_SELL, TRADE_RETCODE_DONE};
use crate::error::{BotError, Result};
use crate::models::{Direction, TradeIntent};
use crate::risk::Bracket;

const ORDER_DEVIATION: u32 = 20;
const ORDER_MAGIC: u64 = 234000;

/// Execution gateway: turns a confirmed, sized signal into an MT5 market
/// order with fixed lot, GTC time policy and IOC fill policy.
pub struct Executor {
    broker: BridgeClient,
    symbol: String,
    lot: f64,
}

impl Executor {
    pub fn new(broker: BridgeClient, symbol: String, lot: f64) -> Self {
        Self { broker, symbol, lot }
    }

    /// Submit a bracketed market order. Success means the terminal answered
    /// with its "done" retcode; anything else is an `OrderRejected`.
    pub async fn place_order(&self, direction: Direction, bracket: Bracket) -> Result<TradeIntent> {
        let request = self.build_request(direction, &bracket);

        let result = self.broker.submit_order(&request).await?;
        if result.retcode != TRADE_RETCODE_DONE {
            tracing::error!(
                "Order failed: retcode {} ({})",
                result.retcode,
                result.comment.as_deref().unwrap_or("no comment")
            );
            return Err(BotError::OrderRejected {
                retcode: result.retcode,
                comment: result.comment,
            });
        }

        tracing::info!(
            "{} order placed: entry={}, sl={}, tp={}",
            direction.as_str(),
            bracket.entry,
            bracket.sl,
            bracket.tp
        );

        Ok(TradeIntent {
            direction,
            entry: bracket.entry,
            sl: bracket.sl,
            tp: bracket.tp,
            timestamp: Utc::now(),
        })
    }

    fn build_request(&self, direction: Direction, bracket: &Bracket) -> OrderRequest {
        let order_type = match direction {
            Direction::Buy => ORDER_TYPE_BUY,
            Direction::Sell => ORDER_TYPE_SELL,
        };

        OrderRequest {
            symbol: self.symbol.clone(),
            volume: self.lot,
            order_type,
            sl: bracket.sl,
            tp: bracket.tp,
            deviation: ORDER_DEVIATION,
            magic: ORDER_MAGIC,
            comment: format!("{} trade", direction.as_str()),
            type_time: "GTC".to_string(),
            type_filling: "IOC".to_string(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn lot(&self) -> f64 {
        self.lot
    }
}
