use anyhow::Context;
use clap::Parser;
use rsibot::api::BinanceClient;
use rsibot::config::BotConfig;
use rsibot::execution::{CycleReport, TradingEngine};
use rsibot::models::OrderResult;
use std::path::PathBuf;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// RSI crossover spot trading bot
#[derive(Parser, Debug)]
#[command(name = "rsibot", version, about)]
struct Cli {
    /// Config file (toml, yaml or json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run a single evaluation cycle and exit
    #[arg(long)]
    once: bool,

    /// Submit real orders instead of paper trading
    #[arg(long)]
    live: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();

    let mut config = BotConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if cli.live {
        config.live_trading = true;
    }

    tracing::info!(
        "🚀 rsibot starting: {} {} RSI({}) {}/{} [{}{}]",
        config.symbol,
        config.interval,
        config.rsi_period,
        config.rsi_oversold,
        config.rsi_overbought,
        if config.live_trading { "live" } else { "paper" },
        if config.testnet { ", testnet" } else { "" }
    );

    let client = BinanceClient::from_config(&config).context("failed to create exchange client")?;
    let refresh = Duration::from_secs(config.refresh_interval_secs);
    let mut engine = TradingEngine::new(config, client).context("invalid configuration")?;

    if cli.once {
        run_once(&mut engine).await;
        return Ok(());
    }

    let mut ticker = interval(refresh);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => run_once(&mut engine).await,
            _ = &mut shutdown => {
                tracing::info!("⚠️  Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    if let Some(roi) = engine.ledger().roi() {
        tracing::info!("Session ROI: {:.2}%", roi);
    }
    tracing::info!("👋 rsibot stopped");
    Ok(())
}

fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("rsibot=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Run one cycle; failures are logged and the next tick tries again
async fn run_once(engine: &mut TradingEngine<BinanceClient>) {
    match engine.run_cycle().await {
        Ok(report) => render(&report),
        Err(e) if e.is_warming_up() => tracing::info!("⏳ Warming up: {}", e),
        Err(e) => tracing::error!("❌ Cycle aborted: {}", e),
    }
}

fn render(report: &CycleReport) {
    tracing::info!(
        "📊 {} price {} | RSI {:.2} | {}",
        report.timestamp.format("%Y-%m-%d %H:%M:%S"),
        report.price,
        report.oscillator_last_value,
        report.signal
    );
    tracing::info!(
        "💰 Balances: {} quote, {} base",
        report.balances.quote_free,
        report.balances.base_free
    );
    match &report.order {
        Some(OrderResult::Success(record)) => tracing::info!(
            "✓ {} order {} ({}) qty {}",
            record.side,
            record.order_id,
            record.status,
            record.executed_qty
        ),
        Some(OrderResult::Failure { reason }) => tracing::warn!("✗ Order failed: {}", reason),
        None => {}
    }
    tracing::info!("➡️  {}", report.action_result);

    match report.roi {
        Some(roi) => tracing::info!("📈 ROI: {:.2}%", roi),
        None => tracing::info!("📈 ROI: n/a"),
    }

    for entry in &report.recent_log_entries {
        tracing::info!("  {}", entry);
    }
}
