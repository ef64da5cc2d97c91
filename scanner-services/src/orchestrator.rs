//! Scan orchestrator
//!
//! Runs one cross-platform scan end to end: cache-backed market fetches
//! in parallel, matching, arbitrage pricing, result caching, and alert
//! dispatch. Step order within a scan is strict; only the two fetches
//! overlap.

use crate::alerts::AlertDispatcher;
use crate::cache::{keys, Cache};
use crate::calculator::Calculator;
use crate::fetcher::MarketFetcher;
use crate::matcher::Matcher;
use crate::queue::ScanJob;
use chrono::{DateTime, Utc};
use scanner_core::{ArbitrageOpportunity, Platform, ScanResult, StandardMarket};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, info, instrument};

/// Outcome of one scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSummary {
    pub timestamp: DateTime<Utc>,
    pub opportunities: Vec<ArbitrageOpportunity>,
    pub markets_scanned: HashMap<Platform, usize>,
    pub matches_found: usize,
    pub duration_ms: u64,
}

/// Composes adapters, matcher, calculator, cache, and alerting for one
/// `(platform A, platform B)` scan at a time.
pub struct ScanOrchestrator {
    fetcher: MarketFetcher,
    cache: Arc<Cache>,
    matcher: Matcher,
    calculator: Calculator,
    dispatcher: AlertDispatcher,
    shutdown: watch::Receiver<bool>,
}

impl ScanOrchestrator {
    pub fn new(
        fetcher: MarketFetcher,
        cache: Arc<Cache>,
        matcher: Matcher,
        calculator: Calculator,
        dispatcher: AlertDispatcher,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            fetcher,
            cache,
            matcher,
            calculator,
            dispatcher,
            shutdown,
        }
    }

    /// Run one scan. `progress` is invoked at the fixed checkpoints
    /// (10 fetch begun, 40 fetch done, 70 matched, 90 priced, 100 done).
    #[instrument(skip(self, progress), fields(pair = %job.pair_key()))]
    pub async fn run_scan(
        &self,
        job: &ScanJob,
        progress: impl Fn(u8),
    ) -> ScanResult<ScanSummary> {
        let started = Instant::now();
        progress(10);

        let (markets_a, markets_b) = tokio::join!(
            self.markets_for(job.platform_a, job.limit),
            self.markets_for(job.platform_b, job.limit)
        );
        let markets_a = markets_a?;
        let markets_b = markets_b?;
        progress(40);

        let matches = self.matcher.find_matches(&markets_a, &markets_b);
        progress(70);

        let opportunities = self.calculator.find_arbitrage(&matches);
        progress(90);

        let timestamp = Utc::now();
        self.cache.set(
            &keys::opportunities_latest(),
            &opportunities,
            keys::OPPORTUNITIES_TTL,
        );
        self.cache.set(
            &keys::scan_results(timestamp.timestamp_millis()),
            &opportunities,
            keys::SCAN_RESULTS_TTL,
        );

        let alertable: Vec<ArbitrageOpportunity> = opportunities
            .iter()
            .filter(|opportunity| self.dispatcher.meets_threshold(opportunity))
            .cloned()
            .collect();
        if !alertable.is_empty() {
            debug!("{} opportunities clear the alert threshold", alertable.len());
            self.dispatcher.send_many(&alertable, &self.shutdown).await;
        }
        progress(100);

        let summary = ScanSummary {
            timestamp,
            markets_scanned: HashMap::from([
                (job.platform_a, markets_a.len()),
                (job.platform_b, markets_b.len()),
            ]),
            matches_found: matches.len(),
            opportunities,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            "Scan {}: {} + {} markets, {} matches, {} opportunities ({} ms)",
            job.pair_key(),
            summary.markets_scanned[&job.platform_a],
            summary.markets_scanned[&job.platform_b],
            summary.matches_found,
            summary.opportunities.len(),
            summary.duration_ms
        );
        Ok(summary)
    }

    /// Cache-read-through market snapshot for one platform.
    async fn markets_for(
        &self,
        platform: Platform,
        limit: usize,
    ) -> ScanResult<Vec<StandardMarket>> {
        let key = keys::markets(platform);
        if let Some(markets) = self.cache.get::<Vec<StandardMarket>>(&key) {
            debug!("Using cached snapshot for {}", key);
            return Ok(markets);
        }

        let markets = self.fetcher.fetch_markets(platform, limit).await?;
        self.cache.set(&key, &markets, keys::MARKETS_TTL);
        Ok(markets)
    }
}
