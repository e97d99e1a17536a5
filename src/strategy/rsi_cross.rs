use super::{
    signals::{detect_crossing, SignalConfig},
    Evaluation, Strategy,
};
use crate::indicators::calculate_rsi_series;
use crate::Result;

/// RSI threshold-crossing strategy
///
/// Buys when RSI falls through the oversold band and sells when it rises
/// through the overbought band. Resting beyond a band does not repeat the
/// signal.
#[derive(Debug, Clone, Default)]
pub struct RsiCrossStrategy {
    config: SignalConfig,
}

impl RsiCrossStrategy {
    pub fn new(config: SignalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }
}

impl Strategy for RsiCrossStrategy {
    fn evaluate(&self, closes: &[f64]) -> Result<Evaluation> {
        let oscillator = calculate_rsi_series(closes, self.config.rsi_period)?;
        let signal = detect_crossing(&oscillator, &self.config)?;

        tracing::debug!(
            rsi = ?oscillator.last(),
            ?signal,
            "Evaluated RSI crossing"
        );

        Ok(Evaluation { oscillator, signal })
    }

    fn name(&self) -> &str {
        "RsiCrossStrategy"
    }

    fn min_candles_required(&self) -> usize {
        self.config.min_closes()
    }
}
