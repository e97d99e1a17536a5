use config::{Config, Environment, File};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::BotError;
use crate::execution::SizingParams;
use crate::strategy::signals::SignalConfig;

/// Default config file looked up in the working directory (any extension
/// supported by the `config` crate)
const DEFAULT_CONFIG_FILE: &str = "rsibot";
const ENV_PREFIX: &str = "RSIBOT";

/// Static bot configuration, read once at startup
///
/// Sources, later ones winning: built-in defaults, the config file,
/// `RSIBOT_*` environment variables, then `BINANCE_API_KEY` /
/// `BINANCE_API_SECRET` for credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    /// Kline interval, e.g. "15m"
    pub interval: String,
    pub candle_limit: usize,
    pub rsi_period: usize,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub risk_fraction: Decimal,
    pub min_qty: Decimal,
    pub min_notional_on_sell: bool,
    /// Buy once when holding less than `min_qty` of the base asset
    pub bootstrap_buy: bool,
    pub cache_ttl_secs: u64,
    pub refresh_interval_secs: u64,
    pub recent_log_len: usize,
    /// Paper trading unless explicitly enabled
    pub live_trading: bool,
    pub testnet: bool,
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default, skip_serializing)]
    pub api_secret: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            base_asset: "BTC".to_string(),
            quote_asset: "USDT".to_string(),
            interval: "15m".to_string(),
            candle_limit: 100,
            rsi_period: 14,
            rsi_oversold: 40.0,
            rsi_overbought: 60.0,
            risk_fraction: Decimal::new(5, 2),  // 5% per trade
            min_qty: Decimal::new(1, 4),        // 0.0001 BTC
            min_notional_on_sell: false,
            bootstrap_buy: false,
            cache_ttl_secs: 60,
            refresh_interval_secs: 60,
            recent_log_len: 10,
            live_trading: false,
            testnet: true,
            api_key: String::new(),
            api_secret: String::new(),
        }
    }
}

impl BotConfig {
    /// Load and validate configuration
    ///
    /// # Arguments
    /// * `path` - Explicit config file (must exist). Without it an optional
    ///   `rsibot.{toml,yaml,json}` in the working directory is used.
    pub fn load(path: Option<&Path>) -> Result<Self, BotError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config = Config::builder()
            .add_source(Config::try_from(&BotConfig::default())?)
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .set_override_option("api_key", std::env::var("BINANCE_API_KEY").ok())?
            .set_override_option("api_secret", std::env::var("BINANCE_API_SECRET").ok())?
            .build()?;

        let bot_config: BotConfig = config.try_deserialize()?;
        bot_config.validate()?;
        Ok(bot_config)
    }

    pub fn validate(&self) -> Result<(), BotError> {
        self.signal_config().validate()?;

        if self.symbol.is_empty() || self.base_asset.is_empty() || self.quote_asset.is_empty() {
            return Err(BotError::InvalidConfig(
                "symbol, base_asset and quote_asset must be set".to_string(),
            ));
        }
        if self.risk_fraction <= Decimal::ZERO || self.risk_fraction > Decimal::ONE {
            return Err(BotError::InvalidConfig(format!(
                "risk_fraction must be in (0, 1], got {}",
                self.risk_fraction
            )));
        }
        if self.min_qty <= Decimal::ZERO {
            return Err(BotError::InvalidConfig(format!(
                "min_qty must be positive, got {}",
                self.min_qty
            )));
        }
        if self.candle_limit < self.rsi_period + 1 {
            return Err(BotError::InvalidConfig(format!(
                "candle_limit {} cannot produce two RSI({}) values",
                self.candle_limit, self.rsi_period
            )));
        }
        if self.refresh_interval_secs == 0 {
            return Err(BotError::InvalidConfig(
                "refresh_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn signal_config(&self) -> SignalConfig {
        SignalConfig {
            rsi_period: self.rsi_period,
            rsi_oversold: self.rsi_oversold,
            rsi_overbought: self.rsi_overbought,
        }
    }

    pub fn sizing_params(&self) -> SizingParams {
        SizingParams {
            risk_fraction: self.risk_fraction,
            min_qty: self.min_qty,
            min_notional_on_sell: self.min_notional_on_sell,
        }
    }
}
