//! Arbitrage scanner daemon
//!
//! Long-running process that scans prediction-market platform pairs on a
//! cadence and posts profitable cross-platform opportunities to a
//! webhook. SIGINT/SIGTERM trigger a graceful shutdown: the in-flight
//! scan finishes, the alert batch stops, and the queue and cache close.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use scanner_kalshi::KalshiClient;
use scanner_manifold::ManifoldClient;
use scanner_polymarket::PolymarketClient;
use scanner_services::{
    AlertConfig, AlertDispatcher, Cache, Calculator, MarketFetcher, Matcher, ScanOrchestrator,
    ScanQueue, Scheduler, SchedulerConfig,
};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_var(name).and_then(|v| v.parse().ok())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file; absence is fine
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: failed to load .env: {}", e);
        }
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,scanner_daemon=debug")),
        )
        .init();

    info!("Starting arbitrage scanner");

    // Platform clients, with optional base-URL overrides for staging
    let mut polymarket = PolymarketClient::new();
    if let Some(base) = env_var("POLYMARKET_API_BASE") {
        polymarket = polymarket.with_base_url(base);
    }
    let mut kalshi = KalshiClient::new();
    if let Some(base) = env_var("KALSHI_API_BASE") {
        kalshi = kalshi.with_base_url(base);
    }
    let mut manifold = ManifoldClient::new();
    if let Some(base) = env_var("MANIFOLD_API_BASE") {
        manifold = manifold.with_base_url(base);
    }
    let fetcher = MarketFetcher::new(polymarket, kalshi, manifold);

    let cache = Arc::new(Cache::new());
    let queue = Arc::new(ScanQueue::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Alerting: disabled with a warning when no webhook is configured
    let webhook_url = env_var("SCANNER_WEBHOOK_URL");
    if webhook_url.is_none() {
        info!("No SCANNER_WEBHOOK_URL set; opportunities will only be logged and cached");
    }
    let alert_config = AlertConfig {
        enabled: webhook_url.is_some(),
        webhook_url,
        min_profit_percent: env_parse::<Decimal>("SCANNER_MIN_PROFIT_PERCENT")
            .unwrap_or(AlertConfig::default().min_profit_percent),
        min_profit_amount: env_parse::<Decimal>("SCANNER_MIN_PROFIT_AMOUNT")
            .unwrap_or(AlertConfig::default().min_profit_amount),
        cooldown_minutes: env_parse("SCANNER_ALERT_COOLDOWN_MINUTES")
            .unwrap_or(AlertConfig::default().cooldown_minutes),
        ..AlertConfig::default()
    };
    let dispatcher = AlertDispatcher::new(alert_config, Arc::clone(&cache));

    let orchestrator = Arc::new(ScanOrchestrator::new(
        fetcher,
        Arc::clone(&cache),
        Matcher::default(),
        Calculator::default(),
        dispatcher,
        shutdown_rx.clone(),
    ));

    let scheduler_config = SchedulerConfig {
        scan_interval: env_parse("SCANNER_SCAN_INTERVAL_SECS")
            .map(Duration::from_secs)
            .unwrap_or(SchedulerConfig::default().scan_interval),
        market_limit: env_parse("SCANNER_MARKET_LIMIT")
            .unwrap_or(SchedulerConfig::default().market_limit),
        ..SchedulerConfig::default()
    };
    let scheduler = Scheduler::new(
        Arc::clone(&queue),
        Arc::clone(&cache),
        orchestrator,
        scheduler_config,
    );
    let scheduler_handle = tokio::spawn(scheduler.run(shutdown_rx));

    wait_for_shutdown_signal().await;
    info!("Shutdown signal received");
    let _ = shutdown_tx.send(true);

    scheduler_handle.await?;
    info!("Scanner stopped cleanly");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
