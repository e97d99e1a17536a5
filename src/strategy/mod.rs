// Trading strategy module
pub mod rsi_cross;
pub mod signals;

use crate::models::Signal;
use crate::Result;

/// Indicator values and the signal derived from them
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Oscillator series, oldest first
    pub oscillator: Vec<f64>,
    pub signal: Signal,
}

impl Evaluation {
    pub fn last_value(&self) -> Option<f64> {
        self.oscillator.last().copied()
    }
}

/// Base trait for all trading strategies
pub trait Strategy: Send + Sync {
    /// Evaluate closing prices (oldest first) into a trading signal
    fn evaluate(&self, closes: &[f64]) -> Result<Evaluation>;

    /// Get strategy name
    fn name(&self) -> &str;

    /// Minimum closes required for this strategy
    fn min_candles_required(&self) -> usize;
}
