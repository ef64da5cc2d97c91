//! Scan scheduler
//!
//! Enrolls the recurring scan pairs, runs the worker, and periodically
//! logs queue and cache stats. On shutdown it lets the in-flight job
//! finish, then drains and closes the queue and cache.

use crate::cache::Cache;
use crate::orchestrator::ScanOrchestrator;
use crate::queue::{ScanJob, ScanQueue, ScanWorker, WorkerConfig};
use scanner_core::Platform;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

/// Scheduler cadence and scan-pair settings.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How often each recurring pair is scanned
    pub scan_interval: Duration,
    /// How often queue/cache stats are logged
    pub stats_interval: Duration,
    /// Markets fetched per platform per scan
    pub market_limit: usize,
    /// The platform pairs scanned on the cadence
    pub pairs: Vec<(Platform, Platform)>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(60),
            stats_interval: Duration::from_secs(30),
            market_limit: 100,
            pairs: vec![
                (Platform::Polymarket, Platform::Manifold),
                (Platform::Kalshi, Platform::Polymarket),
                (Platform::Kalshi, Platform::Manifold),
            ],
        }
    }
}

/// Long-running scan coordinator.
pub struct Scheduler {
    queue: Arc<ScanQueue>,
    cache: Arc<Cache>,
    orchestrator: Arc<ScanOrchestrator>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(
        queue: Arc<ScanQueue>,
        cache: Arc<Cache>,
        orchestrator: Arc<ScanOrchestrator>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            queue,
            cache,
            orchestrator,
            config,
        }
    }

    /// Run until `shutdown` flips to true, then close everything down
    /// gracefully.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Scheduler starting: {} pairs every {:?}",
            self.config.pairs.len(),
            self.config.scan_interval
        );

        for (platform_a, platform_b) in &self.config.pairs {
            self.queue.enqueue_recurring(
                ScanJob::new(*platform_a, *platform_b, self.config.market_limit),
                self.config.scan_interval,
            );
        }

        let worker = ScanWorker::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.orchestrator),
            WorkerConfig::default(),
        );
        let worker_handle = tokio::spawn(worker.run(shutdown.clone()));

        let mut stats_tick = tokio::time::interval(self.config.stats_interval);
        stats_tick.tick().await; // immediate first tick is noise
        loop {
            tokio::select! {
                _ = stats_tick.tick() => {
                    let queue_stats = self.queue.stats();
                    let cache_stats = self.cache.stats();
                    info!(
                        "Stats: jobs [{}], cache [{} keys, {}]",
                        queue_stats, cache_stats.keys, cache_stats.memory_human
                    );
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Scheduler shutting down");
        // Stop handing out new work; the worker finishes its in-flight
        // job and exits on the shutdown signal it already holds.
        self.queue.close();
        let _ = worker_handle.await;
        self.cache.close();
        info!("Scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{AlertConfig, AlertDispatcher};
    use crate::calculator::Calculator;
    use crate::fetcher::MarketFetcher;
    use crate::matcher::Matcher;
    use crate::cache::keys;
    use rust_decimal_macros::dec;
    use scanner_core::{Outcome, StandardMarket};
    use scanner_kalshi::KalshiClient;
    use scanner_manifold::ManifoldClient;
    use scanner_polymarket::PolymarketClient;

    fn market(platform: Platform, id: &str) -> StandardMarket {
        StandardMarket {
            id: id.to_string(),
            platform,
            title: "US recession in 2025?".to_string(),
            url: format!("https://example.com/{id}"),
            outcomes: vec![
                Outcome::new("Yes", dec!(0.45)),
                Outcome::new("No", dec!(0.55)),
            ],
            end_date: None,
            liquidity: None,
            category: None,
        }
    }

    #[tokio::test]
    async fn test_scheduler_runs_scans_and_shuts_down() {
        let cache = Arc::new(Cache::new());
        // Seed every platform snapshot so scans never touch the network.
        for platform in Platform::ALL {
            cache.set(
                &keys::markets(*platform),
                &vec![market(*platform, &format!("{}-1", platform.short_name()))],
                Duration::from_secs(300),
            );
        }

        let fetcher = MarketFetcher::new(
            PolymarketClient::new().with_base_url("http://127.0.0.1:1"),
            KalshiClient::new().with_base_url("http://127.0.0.1:1"),
            ManifoldClient::new().with_base_url("http://127.0.0.1:1"),
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let orchestrator = Arc::new(ScanOrchestrator::new(
            fetcher,
            Arc::clone(&cache),
            Matcher::default(),
            Calculator::default(),
            AlertDispatcher::new(
                AlertConfig {
                    enabled: false,
                    ..AlertConfig::default()
                },
                Arc::clone(&cache),
            ),
            shutdown_rx.clone(),
        ));

        let queue = Arc::new(ScanQueue::new());
        let scheduler = Scheduler::new(
            Arc::clone(&queue),
            Arc::clone(&cache),
            orchestrator,
            SchedulerConfig {
                scan_interval: Duration::from_secs(60),
                stats_interval: Duration::from_secs(30),
                market_limit: 10,
                ..SchedulerConfig::default()
            },
        );

        let handle = tokio::spawn(scheduler.run(shutdown_rx));

        // Give the immediate firings time to process, then stop.
        tokio::time::sleep(Duration::from_millis(300)).await;
        let completed_before = queue.stats().completed;
        assert!(completed_before >= 1, "no scan completed before shutdown");

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
    }
}
