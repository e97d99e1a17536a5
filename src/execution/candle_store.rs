use rust_decimal::prelude::ToPrimitive;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::api::ExchangeClient;
use crate::error::ConnectivityError;
use crate::models::Candle;

struct CachedCandles {
    candles: Vec<Candle>,
    expires_at: Instant,
}

/// Memoized candle windows keyed by (symbol, interval)
///
/// An entry is served until its expiry instant, then refetched.
pub struct CandleCache {
    entries: HashMap<(String, String), CachedCandles>,
    ttl: Duration,
}

impl CandleCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// Cached candles, if present and not expired at `now`
    pub fn get(&self, symbol: &str, interval: &str, now: Instant) -> Option<&[Candle]> {
        self.entries
            .get(&(symbol.to_string(), interval.to_string()))
            .filter(|entry| now < entry.expires_at)
            .map(|entry| entry.candles.as_slice())
    }

    /// Store a window, replacing any previous one for the key
    pub fn insert(&mut self, symbol: &str, interval: &str, candles: Vec<Candle>, now: Instant) {
        self.entries.insert(
            (symbol.to_string(), interval.to_string()),
            CachedCandles {
                candles,
                expires_at: now + self.ttl,
            },
        );
    }

    pub fn invalidate(&mut self, symbol: &str, interval: &str) {
        self.entries
            .remove(&(symbol.to_string(), interval.to_string()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Fetches bounded candle windows through the cache
pub struct CandleStore {
    cache: CandleCache,
    limit: usize,
}

impl CandleStore {
    /// # Arguments
    /// * `limit` - Window length requested from the exchange
    /// * `ttl` - How long a fetched window is reused
    pub fn new(limit: usize, ttl: Duration) -> Self {
        Self {
            cache: CandleCache::new(ttl),
            limit,
        }
    }

    /// Recent candles for symbol/interval, oldest first
    pub async fn fetch<E: ExchangeClient + ?Sized>(
        &mut self,
        exchange: &E,
        symbol: &str,
        interval: &str,
    ) -> Result<Vec<Candle>, ConnectivityError> {
        self.fetch_at(exchange, symbol, interval, Instant::now()).await
    }

    pub async fn fetch_at<E: ExchangeClient + ?Sized>(
        &mut self,
        exchange: &E,
        symbol: &str,
        interval: &str,
        now: Instant,
    ) -> Result<Vec<Candle>, ConnectivityError> {
        if let Some(candles) = self.cache.get(symbol, interval, now) {
            tracing::debug!(symbol, interval, "Serving candles from cache");
            return Ok(candles.to_vec());
        }

        let mut candles = exchange.fetch_candles(symbol, interval, self.limit).await?;
        normalize_window(&mut candles, self.limit);

        self.cache.insert(symbol, interval, candles.clone(), now);
        Ok(candles)
    }

    /// Closing prices, oldest first
    pub fn closes(candles: &[Candle]) -> Vec<f64> {
        candles.iter().filter_map(|c| c.close.to_f64()).collect()
    }
}

/// Order oldest to newest and keep at most the `limit` newest candles
fn normalize_window(candles: &mut Vec<Candle>, limit: usize) {
    candles.sort_by_key(|c| c.open_time);
    candles.dedup_by_key(|c| c.open_time);

    if candles.len() > limit {
        candles.drain(..candles.len() - limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Balances, LotConstraint, OrderRecord, OrderRequest};
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn create_test_candle(minute: i64, close: i64) -> Candle {
        let open_time = Utc.timestamp_opt(1_700_000_000, 0).unwrap() + ChronoDuration::minutes(minute);
        Candle {
            open_time,
            open: Decimal::from(close),
            high: Decimal::from(close),
            low: Decimal::from(close),
            close: Decimal::from(close),
            close_time: open_time + ChronoDuration::seconds(59),
        }
    }

    /// Serves a fixed window and counts kline requests
    struct CountingExchange {
        candles: Vec<Candle>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ExchangeClient for CountingExchange {
        async fn fetch_candles(
            &self,
            _symbol: &str,
            _interval: &str,
            _limit: usize,
        ) -> Result<Vec<Candle>, ConnectivityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.candles.clone())
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
            _: &str,
            _: &OrderRequest,
        ) -> Result<OrderRecord, ConnectivityError> {
            unimplemented!()
        }
    }

    #[test]
    fn test_cache_expiry() {
        let mut cache = CandleCache::new(Duration::from_secs(60));
        let now = Instant::now();
        cache.insert("BTCUSDT", "15m", vec![create_test_candle(0, 100)], now);

        assert!(cache.get("BTCUSDT", "15m", now).is_some());
        assert!(cache.get("BTCUSDT", "15m", now + Duration::from_secs(59)).is_some());
        assert!(cache.get("BTCUSDT", "15m", now + Duration::from_secs(60)).is_none());
    }

    #[test]
    fn test_cache_keyed_by_symbol_and_interval() {
        let mut cache = CandleCache::new(Duration::from_secs(60));
        let now = Instant::now();
        cache.insert("BTCUSDT", "15m", vec![create_test_candle(0, 100)], now);
        cache.insert("BTCUSDT", "1h", vec![create_test_candle(0, 200)], now);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("BTCUSDT", "1h", now).unwrap()[0].close, Decimal::from(200));
        assert!(cache.get("ETHUSDT", "15m", now).is_none());

        cache.invalidate("BTCUSDT", "15m");
        assert!(cache.get("BTCUSDT", "15m", now).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_normalize_window_orders_and_bounds() {
        let mut candles = vec![
            create_test_candle(2, 102),
            create_test_candle(0, 100),
            create_test_candle(3, 103),
            create_test_candle(1, 101),
            create_test_candle(1, 101),
        ];

        normalize_window(&mut candles, 3);

        let closes = CandleStore::closes(&candles);
        assert_eq!(closes, vec![101.0, 102.0, 103.0]);
    }

    #[tokio::test]
    async fn test_store_serves_from_cache_within_ttl() {
        let exchange = CountingExchange {
            candles: (0..5).map(|i| create_test_candle(i, 100 + i)).collect(),
            calls: AtomicUsize::new(0),
        };
        let mut store = CandleStore::new(100, Duration::from_secs(60));
        let now = Instant::now();

        let first = store.fetch_at(&exchange, "BTCUSDT", "15m", now).await.unwrap();
        let second = store
            .fetch_at(&exchange, "BTCUSDT", "15m", now + Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(exchange.calls.load(Ordering::SeqCst), 1);

        store
            .fetch_at(&exchange, "BTCUSDT", "15m", now + Duration::from_secs(61))
            .await
            .unwrap();
        assert_eq!(exchange.calls.load(Ordering::SeqCst), 2);
    }
}
