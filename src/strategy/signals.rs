use crate::error::BotError;
use crate::models::Signal;

/// Configuration for signal generation
#[derive(Debug, Clone, PartialEq)]
pub struct SignalConfig {
    pub rsi_period: usize,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            rsi_oversold: 40.0,
            rsi_overbought: 60.0,
        }
    }
}

impl SignalConfig {
    /// Minimum closes needed before a crossing can be detected
    ///
    /// # Example
    /// ```
    /// use rsibot::strategy::signals::SignalConfig;
    ///
    /// let config = SignalConfig::default();
    /// // 14-period RSI needs 15 closes for its first two values
    /// assert_eq!(config.min_closes(), 15);
    /// ```
    pub fn min_closes(&self) -> usize {
        self.rsi_period + 1
    }

    pub fn validate(&self) -> Result<(), BotError> {
        if self.rsi_period == 0 {
            return Err(BotError::InvalidConfig(
                "rsi_period must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.rsi_oversold)
            || !(0.0..=100.0).contains(&self.rsi_overbought)
        {
            return Err(BotError::InvalidConfig(
                "RSI thresholds must lie within [0, 100]".to_string(),
            ));
        }
        if self.rsi_oversold >= self.rsi_overbought {
            return Err(BotError::InvalidConfig(format!(
                "rsi_oversold ({}) must be below rsi_overbought ({})",
                self.rsi_oversold, self.rsi_overbought
            )));
        }
        Ok(())
    }
}

/// Detect a threshold crossing between the last two oscillator values
///
/// Fires once per traversal rather than while the oscillator rests beyond a
/// threshold:
/// - Buy: previous >= oversold and current < oversold
/// - Sell: previous <= overbought and current > overbought
///
/// The boundary is inclusive on the previous sample only.
pub fn detect_crossing(oscillator: &[f64], config: &SignalConfig) -> Result<Signal, BotError> {
    let (previous, current) = match oscillator {
        [.., previous, current] => (*previous, *current),
        _ => {
            return Err(BotError::InsufficientHistory {
                available: oscillator.len(),
            })
        }
    };

    if previous >= config.rsi_oversold && current < config.rsi_oversold {
        return Ok(Signal::Buy);
    }

    if previous <= config.rsi_overbought && current > config.rsi_overbought {
        return Ok(Signal::Sell);
    }

    Ok(Signal::Hold)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(previous: f64, current: f64) -> Signal {
        detect_crossing(&[previous, current], &SignalConfig::default()).unwrap()
    }

    #[test]
    fn test_buy_on_downward_cross() {
        assert_eq!(detect(41.0, 39.0), Signal::Buy);
    }

    #[test]
    fn test_hold_when_already_below() {
        assert_eq!(detect(39.0, 39.0), Signal::Hold);
        assert_eq!(detect(35.0, 30.0), Signal::Hold);
    }

    #[test]
    fn test_sell_on_upward_cross() {
        assert_eq!(detect(59.0, 61.0), Signal::Sell);
    }

    #[test]
    fn test_hold_when_already_above() {
        assert_eq!(detect(61.0, 65.0), Signal::Hold);
    }

    #[test]
    fn test_previous_boundary_is_inclusive() {
        assert_eq!(detect(40.0, 39.0), Signal::Buy);
        assert_eq!(detect(60.0, 61.0), Signal::Sell);
    }

    #[test]
    fn test_current_boundary_is_exclusive() {
        assert_eq!(detect(41.0, 40.0), Signal::Hold);
        assert_eq!(detect(59.0, 60.0), Signal::Hold);
    }

    #[test]
    fn test_upward_recovery_is_not_a_signal() {
        // Crossing back up through the lower band or down through the upper band
        assert_eq!(detect(39.0, 41.0), Signal::Hold);
        assert_eq!(detect(61.0, 59.0), Signal::Hold);
    }

    #[test]
    fn test_flat_neutral_sequence_always_holds() {
        let config = SignalConfig::default();
        let oscillator: Vec<f64> = (0..50).map(|i| 45.0 + (i % 10) as f64).collect();

        for end in 2..=oscillator.len() {
            let signal = detect_crossing(&oscillator[..end], &config).unwrap();
            assert_eq!(signal, Signal::Hold);
        }
    }

    #[test]
    fn test_only_last_two_values_matter() {
        let config = SignalConfig::default();
        let signal = detect_crossing(&[10.0, 90.0, 50.0, 41.0, 39.0], &config).unwrap();
        assert_eq!(signal, Signal::Buy);
    }

    #[test]
    fn test_insufficient_history() {
        let config = SignalConfig::default();

        let err = detect_crossing(&[45.0], &config).unwrap_err();
        assert!(matches!(err, BotError::InsufficientHistory { available: 1 }));

        let err = detect_crossing(&[], &config).unwrap_err();
        assert!(matches!(err, BotError::InsufficientHistory { available: 0 }));
    }

    #[test]
    fn test_custom_thresholds() {
        let config = SignalConfig {
            rsi_period: 14,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
        };

        assert_eq!(detect_crossing(&[31.0, 29.0], &config).unwrap(), Signal::Buy);
        assert_eq!(detect_crossing(&[41.0, 39.0], &config).unwrap(), Signal::Hold);
        assert_eq!(detect_crossing(&[69.0, 71.0], &config).unwrap(), Signal::Sell);
    }

    #[test]
    fn test_validate() {
        assert!(SignalConfig::default().validate().is_ok());

        let inverted = SignalConfig {
            rsi_oversold: 60.0,
            rsi_overbought: 40.0,
            ..Default::default()
        };
        assert!(inverted.validate().is_err());

        let zero_period = SignalConfig {
            rsi_period: 0,
            ..Default::default()
        };
        assert!(zero_period.validate().is_err());
    }
}
