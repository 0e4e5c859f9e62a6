// Core modules
pub mod bot;
pub mod broker;
pub mod config;
pub mod error;
pub mod execution;
pub mod indicators;
pub mod models;
pub mod risk;
pub mod server;
pub mod strategy;

// Re-export commonly used types
pub use bot::{BotState, Controller, StatusView};
pub use broker::BridgeClient;
pub use config::Config;
pub use error::{BotError, Result};
pub use models::*;
