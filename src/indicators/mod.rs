// Technical indicators module
// Implements RSI for momentum analysis

pub mod rsi;

pub use rsi::{calculate_rsi, calculate_rsi_series};
