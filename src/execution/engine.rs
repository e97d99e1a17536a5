use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::time::Duration;

use super::candle_store::CandleStore;
use super::executor::{ExecutionMode, OrderExecutor};
use super::ledger::{PercentChangeSeries, PortfolioLedger};
use super::sizing::{size_order, BelowMinimum, SizingParams};
use crate::api::ExchangeClient;
use crate::config::BotConfig;
use crate::error::{BotError, ConnectivityError};
use crate::models::{Balances, LotConstraint, OrderResult, Side, Signal, TradeLogEntry};
use crate::strategy::rsi_cross::RsiCrossStrategy;
use crate::strategy::Strategy;
use crate::Result;

/// Rendering-ready outcome of one evaluation cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
    pub balances: Balances,
    /// Full oscillator series for charting, oldest first
    pub oscillator: Vec<f64>,
    pub oscillator_last_value: f64,
    pub signal: Signal,
    /// Human-readable description of what the cycle did
    pub action_result: String,
    /// Order outcome when an order was attempted
    pub order: Option<OrderResult>,
    pub roi: Option<Decimal>,
    /// Newest first
    pub recent_log_entries: Vec<TradeLogEntry>,
    pub percent_change_series: PercentChangeSeries,
}

/// What the cycle decided to do before touching the exchange
#[derive(Debug, Clone, PartialEq)]
enum Decision {
    Hold,
    Skip(BelowMinimum),
    Submit {
        side: Side,
        quantity: Decimal,
        bootstrap: bool,
    },
}

/// Session state and the per-cycle decision pipeline
///
/// Owns the ledger, the candle cache and the cached lot constraint. The
/// bootstrap buy is placed at most once per session, since paper fills never
/// reach the balances read from the exchange.
/// `run_cycle` takes `&mut self`, so cycles can never overlap.
pub struct TradingEngine<E: ExchangeClient> {
    exchange: E,
    strategy: Box<dyn Strategy>,
    candles: CandleStore,
    executor: OrderExecutor,
    ledger: PortfolioLedger,
    lot: Option<LotConstraint>,
    /// Set once a bootstrap buy has been placed
    bootstrapped: bool,
    config: BotConfig,
}

impl<E: ExchangeClient> TradingEngine<E> {
    pub fn new(config: BotConfig, exchange: E) -> Result<Self> {
        config.validate()?;

        let mode = if config.live_trading {
            ExecutionMode::Live
        } else {
            ExecutionMode::Paper
        };

        Ok(Self {
            strategy: Box::new(RsiCrossStrategy::new(config.signal_config())),
            candles: CandleStore::new(
                config.candle_limit,
                Duration::from_secs(config.cache_ttl_secs),
            ),
            executor: OrderExecutor::new(config.symbol.clone(), mode),
            ledger: PortfolioLedger::new(),
            lot: None,
            bootstrapped: false,
            exchange,
            config,
        })
    }

    /// Replace the signal strategy
    pub fn with_strategy(mut self, strategy: Box<dyn Strategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn ledger(&self) -> &PortfolioLedger {
        &self.ledger
    }

    pub fn exchange(&self) -> &E {
        &self.exchange
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        self.executor.mode()
    }

    /// Run one evaluation cycle now
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one evaluation cycle stamped with `timestamp`
    ///
    /// Connectivity errors and warm-up shortfalls abort before the ledger is
    /// touched. Sizing rejections and failed orders are recorded and the
    /// cycle completes.
    pub async fn run_cycle_at(&mut self, timestamp: DateTime<Utc>) -> Result<CycleReport> {
        let symbol = self.config.symbol.clone();

        let candles = self
            .candles
            .fetch(&self.exchange, &symbol, &self.config.interval)
            .await?;
        let closes = CandleStore::closes(&candles);
        let evaluation = self.strategy.evaluate(&closes)?;
        let rsi = evaluation
            .last_value()
            .ok_or(BotError::InsufficientHistory { available: 0 })?;

        let balances = self
            .exchange
            .get_balances(&self.config.base_asset, &self.config.quote_asset)
            .await?;
        let price = self.exchange.get_price(&symbol).await?;
        let lot = self.lot_constraint().await?;

        // Every read succeeded; from here on the cycle always completes
        self.ledger.initialize(&balances, price);

        let decision = self.decide(evaluation.signal, &balances, price, &lot);
        let bootstrap = matches!(decision, Decision::Submit { bootstrap: true, .. });
        let (action_result, order) = self.act(decision).await;
        if bootstrap && order.as_ref().is_some_and(OrderResult::is_success) {
            self.bootstrapped = true;
        }

        tracing::info!(
            symbol = %symbol,
            price = %price,
            rsi,
            signal = ?evaluation.signal,
            "{}",
            action_result
        );

        self.ledger
            .record_decision(evaluation.signal, action_result.clone(), price, timestamp);
        self.ledger.record_snapshot(&balances, price, timestamp);

        Ok(CycleReport {
            timestamp,
            price,
            balances,
            oscillator_last_value: rsi,
            oscillator: evaluation.oscillator,
            signal: evaluation.signal,
            action_result,
            order,
            roi: self.ledger.roi(),
            recent_log_entries: self.ledger.recent_entries(self.config.recent_log_len),
            percent_change_series: self.ledger.percent_change_series(),
        })
    }

    /// Lot constraint, fetched once per process
    async fn lot_constraint(&mut self) -> std::result::Result<LotConstraint, ConnectivityError> {
        if let Some(lot) = self.lot {
            return Ok(lot);
        }
        let lot = self.exchange.get_lot_constraint(&self.config.symbol).await?;
        self.lot = Some(lot);
        Ok(lot)
    }

    fn decide(
        &self,
        signal: Signal,
        balances: &Balances,
        price: Decimal,
        lot: &LotConstraint,
    ) -> Decision {
        let params: SizingParams = self.config.sizing_params();

        if self.config.bootstrap_buy && !self.bootstrapped && balances.base_free < params.min_qty {
            if let Ok(quantity) = size_order(balances, price, lot, &params, Side::Buy) {
                return Decision::Submit {
                    side: Side::Buy,
                    quantity,
                    bootstrap: true,
                };
            }
        }

        let Some(side) = signal.side() else {
            return Decision::Hold;
        };

        match size_order(balances, price, lot, &params, side) {
            Ok(quantity) => Decision::Submit {
                side,
                quantity,
                bootstrap: false,
            },
            Err(below) => Decision::Skip(below),
        }
    }

    async fn act(&self, decision: Decision) -> (String, Option<OrderResult>) {
        match decision {
            Decision::Hold => ("No action taken".to_string(), None),
            Decision::Skip(below) => {
                tracing::debug!("Sizing rejected order: {}", below);
                (format!("No action: {}", below), None)
            }
            Decision::Submit {
                side,
                quantity,
                bootstrap,
            } => {
                let prefix = if bootstrap { "Initial " } else { "" };
                let result = self.executor.submit(&self.exchange, side, quantity).await;
                let description = match &result {
                    OrderResult::Success(_) => format!(
                        "{}{} order placed: {} {} at market",
                        prefix, side, quantity, self.config.base_asset
                    ),
                    OrderResult::Failure { reason } => {
                        format!("{}{} order failed: {}", prefix, side, reason)
                    }
                };
                (description, Some(result))
            }
        }
    }
}
