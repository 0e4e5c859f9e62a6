use thiserror::Error;

/// Failure taxonomy for the bot core.
///
/// Only `Connection` is ever surfaced to a caller (from start); everything
/// else is absorbed by the loop and exposed through the `error` status field.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("broker connection failed: {0}")]
    Connection(String),

    #[error("market data unavailable: {0}")]
    Data(String),

    #[error("order rejected by broker: retcode {retcode}")]
    OrderRejected {
        retcode: u32,
        comment: Option<String>,
    },

    #[error("bot is already running")]
    AlreadyRunning,

    #[error("bot is already stopped")]
    AlreadyStopped,

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, BotError>;
