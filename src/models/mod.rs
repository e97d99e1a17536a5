use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// OHLC candlestick as delivered by the exchange
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub close_time: DateTime<Utc>,
}

/// Trading signal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    /// Order side this signal asks for, if any
    pub fn side(&self) -> Option<Side> {
        match self {
            Signal::Buy => Some(Side::Buy),
            Signal::Sell => Some(Side::Sell),
            Signal::Hold => None,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Signal::Buy => "BUY (Oversold)",
            Signal::Sell => "SELL (Overbought)",
            Signal::Hold => "HOLD (Neutral)",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Wire representation used by the exchange
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free (non-locked) funds in the pair's quote and base assets
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Balances {
    pub quote_free: Decimal,
    pub base_free: Decimal,
}

impl Balances {
    pub fn new(quote_free: Decimal, base_free: Decimal) -> Self {
        Self {
            quote_free,
            base_free,
        }
    }

    /// Portfolio value in quote currency at the given price
    pub fn portfolio_value(&self, price: Decimal) -> Decimal {
        self.quote_free + self.base_free * price
    }
}

/// Exchange quantity filter for a symbol (Binance LOT_SIZE)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LotConstraint {
    /// Smallest allowed increment of order quantity
    pub step_size: Decimal,
    /// Venue's own minimum quantity, informational only
    pub min_qty: Decimal,
}

impl LotConstraint {
    pub fn new(step_size: Decimal) -> Self {
        Self {
            step_size,
            min_qty: Decimal::ZERO,
        }
    }

    /// Number of decimal digits implied by the step size,
    /// `round(-log10(step_size))`. `None` for a non-positive step.
    ///
    /// # Example
    /// ```
    /// use rsibot::models::LotConstraint;
    /// use rust_decimal::Decimal;
    ///
    /// let lot = LotConstraint::new(Decimal::new(1, 4)); // 0.0001
    /// assert_eq!(lot.precision(), Some(4));
    /// ```
    pub fn precision(&self) -> Option<i32> {
        if self.step_size <= Decimal::ZERO {
            return None;
        }
        let step = self.step_size.to_f64()?;
        Some((-step.log10()).round() as i32)
    }
}

/// Market order ready for submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub side: Side,
    /// Already quantized to the lot step
    pub quantity: Decimal,
    /// Lets the venue reject a duplicate of the same request
    pub client_order_id: String,
}

impl OrderRequest {
    pub fn new(side: Side, quantity: Decimal) -> Self {
        Self {
            side,
            quantity,
            client_order_id: format!("rb-{}", uuid::Uuid::new_v4().simple()),
        }
    }
}

/// Order as acknowledged by the exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: String,
    pub client_order_id: String,
    pub symbol: String,
    pub side: Side,
    pub status: String,
    pub executed_qty: Decimal,
    pub transact_time: Option<DateTime<Utc>>,
}

/// Outcome of an order submission. Failures are values, never panics or errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderResult {
    Success(OrderRecord),
    Failure { reason: String },
}

impl OrderResult {
    pub fn failure(reason: impl Into<String>) -> Self {
        OrderResult::Failure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, OrderResult::Success(_))
    }
}

/// One decision per cycle, executed or not
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeLogEntry {
    pub timestamp: DateTime<Utc>,
    pub signal: Signal,
    pub action: String,
    pub price: Decimal,
}

impl fmt::Display for TradeLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} | {} at ~{}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.signal,
            self.action,
            self.price
        )
    }
}

/// Portfolio value observed at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub timestamp: DateTime<Utc>,
    pub portfolio_value: Decimal,
    pub price: Decimal,
}
