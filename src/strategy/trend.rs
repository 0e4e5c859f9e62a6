use crate::indicators::calculate_ema;
use crate::models::{Candle, Direction};

/// 15-minute trend detector: EMA(fast) vs EMA(slow) on closing prices.
///
/// Strictly greater means buy, strictly less means sell, equal means no
/// direction. Degrades to no direction when fewer than 2 candles are
/// available.
#[derive(Debug, Clone)]
pub struct TrendDetector {
    pub fast_span: usize,
    pub slow_span: usize,
}

impl Default for TrendDetector {
    fn default() -> Self {
        Self {
            fast_span: 9,
            slow_span: 15,
        }
    }
}

impl TrendDetector {
    pub fn direction(&self, candles: &[Candle]) -> Option<Direction> {
        if candles.len() < 2 {
            tracing::warn!(
                "Trend detection skipped: {} candles available, need at least 2",
                candles.len()
            );
            return None;
        }

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let fast = calculate_ema(&closes, self.fast_span)?;
        let slow = calculate_ema(&closes, self.slow_span)?;

        if fast > slow {
            Some(Direction::Buy)
        } else if fast < slow {
            Some(Direction::Sell)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                timestamp: Utc::now() - chrono::Duration::minutes((closes.len() - i) as i64 * 15),
                open: close,
                high: close + 0.5,
                low: close - 0.5,
                close,
                tick_volume: 100,
            })
            .collect()
    }

    #[test]
    fn test_rising_closes_give_buy() {
        let closes: Vec<f64> = (0..50).map(|i| 100.0 + i as f64).collect();
        let candles = candles_from_closes(&closes);
        assert_eq!(TrendDetector::default().direction(&candles), Some(Direction::Buy));
    }

    #[test]
    fn test_falling_closes_give_sell() {
        let closes: Vec<f64> = (0..50).map(|i| 200.0 - i as f64).collect();
        let candles = candles_from_closes(&closes);
        assert_eq!(TrendDetector::default().direction(&candles), Some(Direction::Sell));
    }

    #[test]
    fn test_flat_closes_give_none() {
        // Both EMAs converge on the constant, so fast == slow
        let closes = vec![100.0; 50];
        let candles = candles_from_closes(&closes);
        assert_eq!(TrendDetector::default().direction(&candles), None);
    }

    #[test]
    fn test_insufficient_data_gives_none() {
        let candles = candles_from_closes(&[100.0]);
        assert_eq!(TrendDetector::default().direction(&candles), None);
    }
}
