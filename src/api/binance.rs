use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::{Quota, RateLimiter};
use hmac::{Hmac, Mac};
use reqwest::{Client, Method};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::Sha256;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use super::ExchangeClient;
use crate::config::BotConfig;
use crate::error::ConnectivityError;
use crate::models::{Balances, Candle, LotConstraint, OrderRecord, OrderRequest};

// Binance Spot REST API
// Docs: https://developers.binance.com/docs/binance-spot-api-docs/rest-api
pub const BINANCE_API_BASE: &str = "https://api.binance.com";
pub const BINANCE_TESTNET_API_BASE: &str = "https://testnet.binance.vision";

const REQUEST_TIMEOUT_SECS: u64 = 30;
const RECV_WINDOW_MS: u64 = 5000;
const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 500;
// Well under the 6000 request-weight per minute budget
const REQUESTS_PER_MINUTE: NonZeroU32 = match NonZeroU32::new(600) {
    Some(n) => n,
    None => panic!("rate limit must be non-zero"),
};

type HmacSha256 = Hmac<Sha256>;

type BinanceRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Binance spot REST client
///
/// Cloneable; all clones share the same rate limiter. Idempotent GETs are
/// retried with exponential backoff on throttling, server errors and
/// transport failures. Order submission is never retried.
#[derive(Clone)]
pub struct BinanceClient {
    client: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    rate_limiter: Arc<BinanceRateLimiter>,
    initial_backoff: Duration,
}

/// Error body returned by Binance on rejected requests
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    code: i64,
    msg: String,
}

#[derive(Debug, Deserialize)]
struct TickerPriceResponse {
    price: String,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    balances: Vec<AssetBalance>,
}

#[derive(Debug, Deserialize)]
struct AssetBalance {
    asset: String,
    free: String,
}

#[derive(Debug, Deserialize)]
struct ExchangeInfoResponse {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
struct SymbolInfo {
    symbol: String,
    filters: Vec<SymbolFilter>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolFilter {
    filter_type: String,
    #[serde(default)]
    step_size: Option<String>,
    #[serde(default)]
    min_qty: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewOrderResponse {
    symbol: String,
    order_id: u64,
    client_order_id: String,
    #[serde(default)]
    transact_time: Option<i64>,
    #[serde(default)]
    executed_qty: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl BinanceClient {
    /// Create a client against `base_url` (production or testnet)
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, ConnectivityError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ConnectivityError::transport("client", e))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            rate_limiter: Arc::new(RateLimiter::direct(Quota::per_minute(REQUESTS_PER_MINUTE))),
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        })
    }

    /// Create a client for the environment selected in the bot configuration
    pub fn from_config(config: &BotConfig) -> Result<Self, ConnectivityError> {
        let base_url = if config.testnet {
            BINANCE_TESTNET_API_BASE
        } else {
            BINANCE_API_BASE
        };
        Self::new(config.api_key.clone(), config.api_secret.clone(), base_url)
    }

    /// Override the first retry delay (doubles on every attempt)
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Append `recvWindow`, `timestamp` and the HMAC-SHA256 `signature`
    fn sign_query(&self, params: &[(&str, String)]) -> Result<String, ConnectivityError> {
        let mut params = params.to_vec();
        params.push(("recvWindow", RECV_WINDOW_MS.to_string()));
        params.push(("timestamp", Utc::now().timestamp_millis().to_string()));

        let query = serde_urlencoded::to_string(&params)
            .map_err(|e| ConnectivityError::decode("signing", e))?;

        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| ConnectivityError::transport("signing", e))?;
        mac.update(query.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(format!("{}&signature={}", query, signature))
    }

    /// Send one request without retries
    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        params: &[(&str, String)],
        signed: bool,
    ) -> Result<T, ConnectivityError> {
        self.rate_limiter.until_ready().await;

        let query = if signed {
            self.sign_query(params)?
        } else {
            serde_urlencoded::to_string(params).map_err(|e| ConnectivityError::decode(endpoint, e))?
        };
        let url = if query.is_empty() {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}{}?{}", self.base_url, endpoint, query)
        };

        let mut request = self.client.request(method, &url);
        if signed {
            request = request.header("X-MBX-APIKEY", &self.api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ConnectivityError::transport(endpoint, e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ConnectivityError::transport(endpoint, e))?;

        if !status.is_success() {
            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(err) => format!("{} (code {})", err.msg, err.code),
                Err(_) => body,
            };
            return Err(ConnectivityError::Rejected {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| ConnectivityError::decode(endpoint, e))
    }

    /// GET with retry and exponential backoff
    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        signed: bool,
    ) -> Result<T, ConnectivityError> {
        let mut attempt = 1;

        loop {
            match self.send(Method::GET, endpoint, params, signed).await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(endpoint, attempt, "Request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && attempt < MAX_RETRIES => {
                    let backoff = self.initial_backoff * 2_u32.pow(attempt - 1);
                    tracing::warn!(
                        "Attempt {}/{} for {} failed: {}. Retrying in {}ms...",
                        attempt,
                        MAX_RETRIES,
                        endpoint,
                        e,
                        backoff.as_millis()
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn parse_decimal(endpoint: &str, field: &str, value: &str) -> Result<Decimal, ConnectivityError> {
    Decimal::from_str(value)
        .map_err(|e| ConnectivityError::decode(endpoint, format!("invalid {} '{}': {}", field, value, e)))
}

fn parse_millis(endpoint: &str, value: i64) -> Result<DateTime<Utc>, ConnectivityError> {
    DateTime::from_timestamp_millis(value)
        .ok_or_else(|| ConnectivityError::decode(endpoint, format!("invalid timestamp {}", value)))
}

/// Kline rows are positional arrays:
/// `[open_time, open, high, low, close, volume, close_time, ...]`
fn parse_kline(endpoint: &str, row: &[serde_json::Value]) -> Result<Candle, ConnectivityError> {
    let int_at = |i: usize| {
        row.get(i)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| ConnectivityError::decode(endpoint, format!("kline field {} is not an integer", i)))
    };
    let decimal_at = |i: usize, name: &str| {
        let raw = row
            .get(i)
            .and_then(|v| v.as_str())
            .ok_or_else(|| ConnectivityError::decode(endpoint, format!("kline field {} is not a string", i)))?;
        parse_decimal(endpoint, name, raw)
    };

    Ok(Candle {
        open_time: parse_millis(endpoint, int_at(0)?)?,
        open: decimal_at(1, "open")?,
        high: decimal_at(2, "high")?,
        low: decimal_at(3, "low")?,
        close: decimal_at(4, "close")?,
        close_time: parse_millis(endpoint, int_at(6)?)?,
    })
}

#[async_trait]
impl ExchangeClient for BinanceClient {
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, ConnectivityError> {
        const ENDPOINT: &str = "/api/v3/klines";

        let params = [
            ("symbol", symbol.to_string()),
            ("interval", interval.to_string()),
            ("limit", limit.to_string()),
        ];
        let rows: Vec<Vec<serde_json::Value>> = self.get(ENDPOINT, &params, false).await?;

        let candles = rows
            .iter()
            .map(|row| parse_kline(ENDPOINT, row))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(symbol, interval, count = candles.len(), "Fetched klines");
        Ok(candles)
    }

    async fn get_balances(
        &self,
        base_asset: &str,
        quote_asset: &str,
    ) -> Result<Balances, ConnectivityError> {
        const ENDPOINT: &str = "/api/v3/account";

        let account: AccountResponse = self.get(ENDPOINT, &[], true).await?;

        let free = |asset: &str| -> Result<Decimal, ConnectivityError> {
            match account.balances.iter().find(|b| b.asset == asset) {
                Some(balance) => parse_decimal(ENDPOINT, "free", &balance.free),
                None => Ok(Decimal::ZERO),
            }
        };

        Ok(Balances {
            quote_free: free(quote_asset)?,
            base_free: free(base_asset)?,
        })
    }

    async fn get_price(&self, symbol: &str) -> Result<Decimal, ConnectivityError> {
        const ENDPOINT: &str = "/api/v3/ticker/price";

        let ticker: TickerPriceResponse = self
            .get(ENDPOINT, &[("symbol", symbol.to_string())], false)
            .await?;

        parse_decimal(ENDPOINT, "price", &ticker.price)
    }

    async fn get_lot_constraint(&self, symbol: &str) -> Result<LotConstraint, ConnectivityError> {
        const ENDPOINT: &str = "/api/v3/exchangeInfo";

        let info: ExchangeInfoResponse = self
            .get(ENDPOINT, &[("symbol", symbol.to_string())], false)
            .await?;

        let lot_size = info
            .symbols
            .iter()
            .find(|s| s.symbol == symbol)
            .and_then(|s| s.filters.iter().find(|f| f.filter_type == "LOT_SIZE"))
            .ok_or_else(|| ConnectivityError::decode(ENDPOINT, format!("no LOT_SIZE filter for {}", symbol)))?;

        let step_size = lot_size
            .step_size
            .as_deref()
            .ok_or_else(|| ConnectivityError::decode(ENDPOINT, "LOT_SIZE filter without stepSize"))?;
        let min_qty = lot_size.min_qty.as_deref().unwrap_or("0");

        let constraint = LotConstraint {
            step_size: parse_decimal(ENDPOINT, "stepSize", step_size)?.normalize(),
            min_qty: parse_decimal(ENDPOINT, "minQty", min_qty)?.normalize(),
        };

        tracing::info!(
            symbol,
            step_size = %constraint.step_size,
            min_qty = %constraint.min_qty,
            "Loaded lot size filter"
        );
        Ok(constraint)
    }

    async fn submit_order(
        &self,
        symbol: &str,
        request: &OrderRequest,
    ) -> Result<OrderRecord, ConnectivityError> {
        const ENDPOINT: &str = "/api/v3/order";

        let params = [
            ("symbol", symbol.to_string()),
            ("side", request.side.as_str().to_string()),
            ("type", "MARKET".to_string()),
            ("quantity", request.quantity.normalize().to_string()),
            ("newClientOrderId", request.client_order_id.clone()),
        ];

        tracing::info!(
            symbol,
            side = %request.side,
            quantity = %request.quantity,
            client_order_id = %request.client_order_id,
            "Sending MARKET order"
        );

        let response: NewOrderResponse = self.send(Method::POST, ENDPOINT, &params, true).await?;

        let executed_qty = match response.executed_qty.as_deref() {
            Some(qty) => parse_decimal(ENDPOINT, "executedQty", qty)?,
            None => Decimal::ZERO,
        };
        let transact_time = match response.transact_time {
            Some(ms) => Some(parse_millis(ENDPOINT, ms)?),
            None => None,
        };

        Ok(OrderRecord {
            order_id: response.order_id.to_string(),
            client_order_id: response.client_order_id,
            symbol: response.symbol,
            side: request.side,
            status: response.status.unwrap_or_else(|| "ACK".to_string()),
            executed_qty,
            transact_time,
        })
    }
}
