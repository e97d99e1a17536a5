pub mod binance;

pub use binance::{BinanceClient, BINANCE_API_BASE, BINANCE_TESTNET_API_BASE};

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::ConnectivityError;
use crate::models::{Balances, Candle, LotConstraint, OrderRecord, OrderRequest};

/// Exchange connectivity consumed by the trading engine
///
/// Every call is awaited to completion before the cycle moves on.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Most recent `limit` candles, oldest first
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, ConnectivityError>;

    /// Free balances of the pair's assets. A missing asset counts as zero.
    async fn get_balances(
        &self,
        base_asset: &str,
        quote_asset: &str,
    ) -> Result<Balances, ConnectivityError>;

    /// Last traded price
    async fn get_price(&self, symbol: &str) -> Result<Decimal, ConnectivityError>;

    /// Quantity filter for the symbol; changes rarely
    async fn get_lot_constraint(&self, symbol: &str) -> Result<LotConstraint, ConnectivityError>;

    /// Submit a market order
    async fn submit_order(
        &self,
        symbol: &str,
        request: &OrderRequest,
    ) -> Result<OrderRecord, ConnectivityError>;
}
