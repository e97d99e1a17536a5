use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{Balances, PortfolioSnapshot, Signal, TradeLogEntry};

/// Percent change of portfolio value and price against the first snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PercentChangeSeries {
    pub timestamps: Vec<DateTime<Utc>>,
    pub portfolio: Vec<Decimal>,
    pub price: Vec<Decimal>,
}

/// In-memory record of every decision and portfolio valuation
///
/// Append-only for the lifetime of the process. The initial portfolio value
/// is anchored on first use and never recomputed.
#[derive(Debug, Default)]
pub struct PortfolioLedger {
    initial_value: Option<Decimal>,
    entries: Vec<TradeLogEntry>,
    snapshots: Vec<PortfolioSnapshot>,
}

impl PortfolioLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Anchor the initial portfolio value; later calls keep the first anchor
    pub fn initialize(&mut self, balances: &Balances, price: Decimal) -> Decimal {
        *self.initial_value.get_or_insert_with(|| {
            let value = balances.portfolio_value(price);
            tracing::info!(initial_value = %value, "Anchored initial portfolio value");
            value
        })
    }

    pub fn initial_value(&self) -> Option<Decimal> {
        self.initial_value
    }

    /// Log a cycle decision: BUY, SELL and HOLD outcomes alike
    pub fn record_decision(
        &mut self,
        signal: Signal,
        action: impl Into<String>,
        price: Decimal,
        timestamp: DateTime<Utc>,
    ) {
        self.entries.push(TradeLogEntry {
            timestamp,
            signal,
            action: action.into(),
            price,
        });
    }

    pub fn record_snapshot(
        &mut self,
        balances: &Balances,
        price: Decimal,
        timestamp: DateTime<Utc>,
    ) -> &PortfolioSnapshot {
        self.snapshots.push(PortfolioSnapshot {
            timestamp,
            portfolio_value: balances.portfolio_value(price),
            price,
        });
        &self.snapshots[self.snapshots.len() - 1]
    }

    pub fn entries(&self) -> &[TradeLogEntry] {
        &self.entries
    }

    pub fn snapshots(&self) -> &[PortfolioSnapshot] {
        &self.snapshots
    }

    /// Last `n` log entries, newest first
    pub fn recent_entries(&self, n: usize) -> Vec<TradeLogEntry> {
        self.entries.iter().rev().take(n).cloned().collect()
    }

    /// Portfolio value of the latest snapshot
    pub fn current_value(&self) -> Option<Decimal> {
        self.snapshots.last().map(|s| s.portfolio_value)
    }

    /// Return on investment in percent against the initial anchor
    ///
    /// `None` until both an anchor and a snapshot exist, or when the anchor
    /// is zero.
    pub fn roi(&self) -> Option<Decimal> {
        let initial = self.initial_value?;
        let current = self.current_value()?;
        if initial.is_zero() {
            return None;
        }
        Some((current - initial) / initial * Decimal::ONE_HUNDRED)
    }

    /// Portfolio value and price as percent change from their first snapshot
    pub fn percent_change_series(&self) -> PercentChangeSeries {
        let Some(first) = self.snapshots.first() else {
            return PercentChangeSeries::default();
        };

        PercentChangeSeries {
            timestamps: self.snapshots.iter().map(|s| s.timestamp).collect(),
            portfolio: self
                .snapshots
                .iter()
                .map(|s| percent_change(first.portfolio_value, s.portfolio_value))
                .collect(),
            price: self
                .snapshots
                .iter()
                .map(|s| percent_change(first.price, s.price))
                .collect(),
        }
    }
}

/// Zero base yields zero change
fn percent_change(base: Decimal, value: Decimal) -> Decimal {
    if base.is_zero() {
        return Decimal::ZERO;
    }
    (value - base) / base * Decimal::ONE_HUNDRED
}
