//! Market fetcher: one entry point over the platform adapters
//!
//! Dispatches on [`Platform`] to the concrete clients so the orchestrator
//! never names a platform crate directly.

use scanner_core::{Platform, ScanResult, StandardMarket};
use scanner_kalshi::KalshiClient;
use scanner_manifold::ManifoldClient;
use scanner_polymarket::PolymarketClient;
use std::sync::Arc;
use tracing::instrument;

/// Aggregates the per-platform adapters behind a single fetch surface.
pub struct MarketFetcher {
    polymarket: Arc<PolymarketClient>,
    kalshi: Arc<KalshiClient>,
    manifold: Arc<ManifoldClient>,
}

impl MarketFetcher {
    pub fn new(
        polymarket: PolymarketClient,
        kalshi: KalshiClient,
        manifold: ManifoldClient,
    ) -> Self {
        Self {
            polymarket: Arc::new(polymarket),
            kalshi: Arc::new(kalshi),
            manifold: Arc::new(manifold),
        }
    }

    /// Fetch up to `limit` normalized markets from one platform.
    #[instrument(skip(self))]
    pub async fn fetch_markets(
        &self,
        platform: Platform,
        limit: usize,
    ) -> ScanResult<Vec<StandardMarket>> {
        match platform {
            Platform::Polymarket => self.polymarket.fetch_markets(limit).await,
            Platform::Kalshi => self.kalshi.fetch_markets(limit).await,
            Platform::Manifold => self.manifold.fetch_markets(limit).await,
        }
    }

    /// Fetch a single market by its platform-unique id. `None` iff the
    /// platform answered 404.
    #[instrument(skip(self))]
    pub async fn fetch_market_by_id(
        &self,
        platform: Platform,
        id: &str,
    ) -> ScanResult<Option<StandardMarket>> {
        match platform {
            Platform::Polymarket => self.polymarket.fetch_market_by_id(id).await,
            Platform::Kalshi => self.kalshi.fetch_market_by_id(id).await,
            Platform::Manifold => self.manifold.fetch_market_by_id(id).await,
        }
    }
}

impl Clone for MarketFetcher {
    fn clone(&self) -> Self {
        Self {
            polymarket: Arc::clone(&self.polymarket),
            kalshi: Arc::clone(&self.kalshi),
            manifold: Arc::clone(&self.manifold),
        }
    }
}

impl std::fmt::Debug for MarketFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketFetcher").finish()
    }
}
