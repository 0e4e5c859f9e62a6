/// Calculate Exponential Moving Average (EMA)
///
/// Standard recurrence with weighting factor alpha = 2 / (span + 1), seeded
/// from the first available price. Returns the latest EMA value.
pub fn calculate_ema(prices: &[f64], span: usize) -> Option<f64> {
    if prices.is_empty() || span == 0 {
        return None;
    }

    let alpha = 2.0 / (span as f64 + 1.0);

    let mut ema = prices[0];
    for price in &prices[1..] {
        ema = alpha * price + (1.0 - alpha) * ema;
    }

    Some(ema)
}
