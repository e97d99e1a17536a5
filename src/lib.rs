// Core modules
pub mod api;
pub mod config;
pub mod error;
pub mod execution;
pub mod indicators;
pub mod models;
pub mod strategy;

// Re-export commonly used types
pub use api::{BinanceClient, ExchangeClient};
pub use config::BotConfig;
pub use error::{BotError, ConnectivityError};
pub use execution::{CycleReport, TradingEngine};
pub use models::*;
pub use strategy::Strategy;

// Error handling
pub type Result<T> = std::result::Result<T, BotError>;
