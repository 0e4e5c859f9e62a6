use std::time::Duration;

use anyhow::{Context, Result};

/// MT5 account credentials, always supplied through the environment
#[derive(Debug, Clone)]
pub struct Mt5Credentials {
    pub login: i64,
    pub password: String,
    pub server: String,
}

/// Runtime configuration, loaded once at startup from the environment
/// (`.env` is honored via dotenvy in `main`).
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Mt5Credentials,
    /// Base URL of the MT5 terminal bridge
    pub bridge_url: String,
    pub symbol: String,
    pub lot: f64,
    pub poll_interval: Duration,
    pub error_backoff: Duration,
    pub cooldown: Duration,
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let login = std::env::var("MT5_LOGIN")
            .context("MT5_LOGIN not found in environment")?
            .parse::<i64>()
            .context("MT5_LOGIN must be a numeric account id")?;
        let password =
            std::env::var("MT5_PASSWORD").context("MT5_PASSWORD not found in environment")?;
        let server =
            std::env::var("MT5_SERVER").context("MT5_SERVER not found in environment")?;

        let bridge_url = std::env::var("MT5_BRIDGE_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:5001".to_string());
        let symbol = std::env::var("TRADE_SYMBOL").unwrap_or_else(|_| "BTCUSD".to_string());
        let lot = parse_env_or("LOT_SIZE", 1.0)?;
        let poll_interval = Duration::from_secs(parse_env_or("POLL_INTERVAL_SECS", 15)?);
        let error_backoff = Duration::from_secs(parse_env_or("ERROR_BACKOFF_SECS", 5)?);
        let cooldown = Duration::from_secs(parse_env_or("COOLDOWN_SECS", 60)?);
        let bind_addr =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:5000".to_string());

        Ok(Self {
            credentials: Mt5Credentials {
                login,
                password,
                server,
            },
            bridge_url,
            symbol,
            lot,
            poll_interval,
            error_backoff,
            cooldown,
            bind_addr,
        })
    }
}

fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value")),
        Err(_) => Ok(default),
    }
}
