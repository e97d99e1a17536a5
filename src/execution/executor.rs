use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::api::ExchangeClient;
use crate::models::{OrderRecord, OrderRequest, OrderResult, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Orders go to the exchange
    Live,
    /// Orders are acknowledged locally and never leave the process
    Paper,
}

/// Submits market orders and contains every failure as an `OrderResult`
pub struct OrderExecutor {
    symbol: String,
    mode: ExecutionMode,
    paper_orders: AtomicU64,
}

impl OrderExecutor {
    pub fn new(symbol: impl Into<String>, mode: ExecutionMode) -> Self {
        Self {
            symbol: symbol.into(),
            mode,
            paper_orders: AtomicU64::new(0),
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Submit a market order for `quantity`
    ///
    /// Never returns an error: a non-positive quantity or any exchange
    /// failure comes back as `OrderResult::Failure` with a readable reason.
    pub async fn submit<E: ExchangeClient + ?Sized>(
        &self,
        exchange: &E,
        side: Side,
        quantity: Decimal,
    ) -> OrderResult {
        if quantity <= Decimal::ZERO {
            return OrderResult::failure("Quantity must be positive");
        }

        let request = OrderRequest::new(side, quantity);

        match self.mode {
            ExecutionMode::Paper => {
                tracing::info!(
                    symbol = %self.symbol,
                    side = %side,
                    quantity = %quantity,
                    "📝 Paper order acknowledged"
                );
                OrderResult::Success(self.paper_record(&request))
            }
            ExecutionMode::Live => match exchange.submit_order(&self.symbol, &request).await {
                Ok(record) => {
                    tracing::info!(
                        symbol = %self.symbol,
                        order_id = %record.order_id,
                        status = %record.status,
                        "Order accepted"
                    );
                    OrderResult::Success(record)
                }
                Err(e) => {
                    tracing::warn!(
                        symbol = %self.symbol,
                        side = %side,
                        quantity = %quantity,
                        "Order submission failed: {}",
                        e
                    );
                    OrderResult::failure(e.to_string())
                }
            },
        }
    }

    fn paper_record(&self, request: &OrderRequest) -> OrderRecord {
        let n = self.paper_orders.fetch_add(1, Ordering::Relaxed) + 1;
        OrderRecord {
            order_id: format!("paper-{}", n),
            client_order_id: request.client_order_id.clone(),
            symbol: self.symbol.clone(),
            side: request.side,
            status: "SIMULATED".to_string(),
            executed_qty: request.quantity,
            transact_time: Some(Utc::now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConnectivityError;
    use crate::models::{Balances, Candle, LotConstraint};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    /// Records submitted orders; optionally rejects them
    struct OrderDesk {
        reject_with: Option<ConnectivityError>,
        submitted: Mutex<Vec<OrderRequest>>,
    }

    impl OrderDesk {
        fn accepting() -> Self {
            Self {
                reject_with: None,
                submitted: Mutex::new(Vec::new()),
            }
        }

        fn rejecting(err: ConnectivityError) -> Self {
            Self {
                reject_with: Some(err),
                submitted: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ExchangeClient for OrderDesk {
        async fn fetch_candles(&self, _: &str, _: &str, _: usize) -> Result<Vec<Candle>, ConnectivityError> {
            unimplemented!()
        }

        async fn get_balances(&self, _: &str, _: &str) -> Result<Balances, ConnectivityError> {
            unimplemented!()
        }

        async fn get_price(&self, _: &str) -> Result<Decimal, ConnectivityError> {
            unimplemented!()
        }

        async fn get_lot_constraint(&self, _: &str) -> Result<LotConstraint, ConnectivityError> {
            unimplemented!()
        }

        async fn submit_order(
            &self,
            symbol: &str,
            request: &OrderRequest,
        ) -> Result<OrderRecord, ConnectivityError> {
            self.submitted.lock().unwrap().push(request.clone());
            if let Some(err) = &self.reject_with {
                return Err(err.clone());
            }
            Ok(OrderRecord {
                order_id: "12345".to_string(),
                client_order_id: request.client_order_id.clone(),
                symbol: symbol.to_string(),
                side: request.side,
                status: "FILLED".to_string(),
                executed_qty: request.quantity,
                transact_time: None,
            })
        }
    }

    #[tokio::test]
    async fn test_live_order_success() {
        let desk = OrderDesk::accepting();
        let executor = OrderExecutor::new("BTCUSDT", ExecutionMode::Live);

        let result = executor.submit(&desk, Side::Buy, dec!(0.0010)).await;

        match result {
            OrderResult::Success(record) => {
                assert_eq!(record.order_id, "12345");
                assert_eq!(record.executed_qty, dec!(0.001));
            }
            other => panic!("expected success, got {:?}", other),
        }
        assert_eq!(desk.submitted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_non_positive_quantity_never_submitted() {
        let desk = OrderDesk::accepting();
        let executor = OrderExecutor::new("BTCUSDT", ExecutionMode::Live);

        for quantity in [dec!(0), dec!(-0.5)] {
            let result = executor.submit(&desk, Side::Sell, quantity).await;
            assert_eq!(result, OrderResult::failure("Quantity must be positive"));
        }
        assert!(desk.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_exchange_rejection_is_contained() {
        let desk = OrderDesk::rejecting(ConnectivityError::Rejected {
            endpoint: "/api/v3/order".to_string(),
            status: 400,
            message: "Account has insufficient balance for requested action. (code -2010)".to_string(),
        });
        let executor = OrderExecutor::new("BTCUSDT", ExecutionMode::Live);

        let result = executor.submit(&desk, Side::Buy, dec!(1)).await;

        match result {
            OrderResult::Failure { reason } => assert!(reason.contains("insufficient balance")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transport_failure_is_contained() {
        let desk = OrderDesk::rejecting(ConnectivityError::transport("/api/v3/order", "connection reset"));
        let executor = OrderExecutor::new("BTCUSDT", ExecutionMode::Live);

        let result = executor.submit(&desk, Side::Sell, dec!(0.01)).await;
        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn test_paper_mode_never_contacts_exchange() {
        let desk = OrderDesk::accepting();
        let executor = OrderExecutor::new("BTCUSDT", ExecutionMode::Paper);

        let first = executor.submit(&desk, Side::Buy, dec!(0.002)).await;
        let second = executor.submit(&desk, Side::Sell, dec!(0.001)).await;

        assert!(desk.submitted.lock().unwrap().is_empty());
        match (first, second) {
            (OrderResult::Success(a), OrderResult::Success(b)) => {
                assert_eq!(a.status, "SIMULATED");
                assert_eq!(a.order_id, "paper-1");
                assert_eq!(b.order_id, "paper-2");
                assert_eq!(b.side, Side::Sell);
            }
            other => panic!("expected simulated fills, got {:?}", other),
        }
    }
}
