// Decision pipeline: candle retrieval, sizing, order submission and bookkeeping
pub mod candle_store;
pub mod engine;
pub mod executor;
pub mod ledger;
pub mod sizing;

pub use candle_store::{CandleCache, CandleStore};
pub use engine::{CycleReport, TradingEngine};
pub use executor::{ExecutionMode, OrderExecutor};
pub use ledger::{PercentChangeSeries, PortfolioLedger};
pub use sizing::{quantize, size_order, BelowMinimum, SizingParams};
