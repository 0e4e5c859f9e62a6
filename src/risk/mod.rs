use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Direction;

/// Entry/stop/take-profit triple handed to the execution gateway
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Bracket {
    pub entry: f64,
    pub sl: f64,
    pub tp: f64,
}

/// Size the bracket from the confirmed entry and stop.
///
/// Risk is the entry-to-stop distance. The take-profit multiple is 2x risk
/// for buys and 3x for sells, exactly as the strategy has always run it.
pub fn bracket(direction: Direction, entry: f64, stop: f64) -> Bracket {
    let risk = (entry - stop).abs();
    let tp = match direction {
        Direction::Buy => entry + 2.0 * risk,
        Direction::Sell => entry - 3.0 * risk,
    };
    Bracket {
        entry,
        sl: stop,
        tp,
    }
}

/// Minimum enforced interval between trade entries.
///
/// Advanced only after a successful execution, so rejected orders do not
/// burn the cooldown window.
#[derive(Debug, Clone)]
pub struct CooldownGate {
    period: Duration,
    last_entry: Option<DateTime<Utc>>,
}

impl CooldownGate {
    pub fn new(period: std::time::Duration) -> Self {
        Self {
            period: Duration::from_std(period).unwrap_or_else(|_| Duration::seconds(60)),
            last_entry: None,
        }
    }

    /// True when an entry is allowed at `now`
    pub fn ready(&self, now: DateTime<Utc>) -> bool {
        match self.last_entry {
            Some(last) => now - last >= self.period,
            None => true,
        }
    }

    /// Record a successful entry at `now`
    pub fn mark(&mut self, now: DateTime<Utc>) {
        self.last_entry = Some(now);
    }
}
