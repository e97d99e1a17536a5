use crate::error::BotError;

/// Calculate the Relative Strength Index series
///
/// RSI measures the magnitude of recent price changes to evaluate
/// overbought or oversold conditions.
///
/// Gains and losses are smoothed with Wilder's exponential average
/// (`alpha = 1/period`) as one recurrence across the whole input. The change
/// at index 0 counts as zero and seeds both averages, so the first value is
/// emitted at index `period - 1` and the output holds
/// `prices.len() - period + 1` values, oldest first.
///
/// A window with no losses scores 100.
pub fn calculate_rsi_series(prices: &[f64], period: usize) -> Result<Vec<f64>, BotError> {
    if period == 0 {
        return Err(BotError::InvalidConfig(
            "RSI period must be greater than zero".to_string(),
        ));
    }

    if prices.len() < period + 1 {
        return Err(BotError::InsufficientData {
            available: prices.len(),
            required: period + 1,
        });
    }

    let alpha = 1.0 / period as f64;
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    let mut series = Vec::with_capacity(prices.len() - period + 1);

    for i in 0..prices.len() {
        let change = if i == 0 { 0.0 } else { prices[i] - prices[i - 1] };
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);

        if i == 0 {
            avg_gain = gain;
            avg_loss = loss;
        } else {
            avg_gain = alpha * gain + (1.0 - alpha) * avg_gain;
            avg_loss = alpha * loss + (1.0 - alpha) * avg_loss;
        }

        if i + 1 >= period {
            series.push(relative_strength_index(avg_gain, avg_loss));
        }
    }

    Ok(series)
}

/// Latest RSI value, `None` when there is not enough data
pub fn calculate_rsi(prices: &[f64], period: usize) -> Option<f64> {
    calculate_rsi_series(prices, period).ok()?.last().copied()
}

fn relative_strength_index(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }

    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}
