use crate::models::{Candle, Direction};

/// Entry and stop-loss candidates from a confirmed 5m breakout
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Confirmation {
    pub entry: f64,
    pub stop: f64,
}

/// 5-minute confirmation filter.
///
/// Looks at the second-to-last candle (`prev`) and the last candle (`curr`).
/// A buy signal is confirmed when the latest close breaks above the prior
/// high (entry = close, stop = prior low); a sell when it breaks below the
/// prior low (entry = close, stop = prior high).
pub fn confirm(direction: Direction, candles: &[Candle]) -> Option<Confirmation> {
    if candles.len() < 2 {
        tracing::warn!(
            "Confirmation skipped: {} candles available, need at least 2",
            candles.len()
        );
        return None;
    }

    let prev = &candles[candles.len() - 2];
    let curr = &candles[candles.len() - 1];

    match direction {
        Direction::Buy if curr.close > prev.high => Some(Confirmation {
            entry: curr.close,
            stop: prev.low,
        }),
        Direction::Sell if curr.close < prev.low => Some(Confirmation {
            entry: curr.close,
            stop: prev.high,
        }),
        _ => None,
    }
}
