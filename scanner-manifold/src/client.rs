//! Manifold API client
//!
//! Fetches markets from the Manifold API, rate-limited and retried per
//! the platform pacing rules. The list endpoint cannot filter server-side
//! on market mechanism, so the client over-fetches and trims after the
//! binary filter.

use crate::types::ManifoldMarket;
use reqwest::Client;
use scanner_core::{
    retry, PlatformLimiter, Platform, RetryConfig, ScanError, ScanResult, StandardMarket,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Base URL for the Manifold API
const MANIFOLD_API_BASE: &str = "https://api.manifold.markets";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const PLATFORM: Platform = Platform::Manifold;

/// Manifold market-data client
#[derive(Clone)]
pub struct ManifoldClient {
    client: Client,
    base_url: String,
    limiter: Arc<PlatformLimiter>,
    retry_config: RetryConfig,
}

impl ManifoldClient {
    /// Create a new client against the production API
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: MANIFOLD_API_BASE.to_string(),
            limiter: Arc::new(PlatformLimiter::for_platform(PLATFORM)),
            retry_config: RetryConfig::default(),
        }
    }

    /// Override the base URL (used for tests and alternate deployments)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch up to `limit` unresolved binary markets, normalized.
    #[instrument(skip(self))]
    pub async fn fetch_markets(&self, limit: usize) -> ScanResult<Vec<StandardMarket>> {
        retry(&self.retry_config, ScanError::retryable, || {
            self.fetch_markets_once(limit)
        })
        .await
    }

    /// Fetch a single market by id. Returns `None` iff the API answers 404.
    #[instrument(skip(self))]
    pub async fn fetch_market_by_id(&self, id: &str) -> ScanResult<Option<StandardMarket>> {
        retry(&self.retry_config, ScanError::retryable, || {
            self.fetch_market_by_id_once(id)
        })
        .await
    }

    async fn fetch_markets_once(&self, limit: usize) -> ScanResult<Vec<StandardMarket>> {
        // Over-fetch: the binary filter below discards multi-choice and
        // resolved markets.
        let url = format!("{}/v0/markets?limit={}", self.base_url, limit * 2);
        debug!("Fetching Manifold markets from: {}", url);

        let payload = self.get_json(&url).await?;
        let raw: Vec<ManifoldMarket> = serde_json::from_value(payload.clone()).map_err(|e| {
            ScanError::validation(PLATFORM, format!("unexpected markets response shape: {e}"), payload)
        })?;

        let mut markets = Vec::new();
        for market in raw
            .into_iter()
            .filter(ManifoldMarket::is_tradeable_binary)
            .take(limit)
        {
            let standard = market.to_standard_market().map_err(|detail| {
                let payload = serde_json::to_value(&market).unwrap_or(serde_json::Value::Null);
                ScanError::validation(PLATFORM, detail, payload)
            })?;
            markets.push(standard);
        }

        debug!("Normalized {} Manifold markets", markets.len());
        Ok(markets)
    }

    async fn fetch_market_by_id_once(&self, id: &str) -> ScanResult<Option<StandardMarket>> {
        let url = format!("{}/v0/market/{}", self.base_url, id);
        debug!("Fetching Manifold market: {}", id);

        let payload = match self.get_json_opt(&url).await? {
            Some(payload) => payload,
            None => return Ok(None),
        };

        let raw: ManifoldMarket = serde_json::from_value(payload.clone()).map_err(|e| {
            ScanError::validation(PLATFORM, format!("unexpected market response shape: {e}"), payload)
        })?;

        if !raw.is_tradeable_binary() {
            let payload = serde_json::to_value(&raw).unwrap_or(serde_json::Value::Null);
            return Err(ScanError::validation(
                PLATFORM,
                "market is not an unresolved binary market",
                payload,
            ));
        }

        let standard = raw.to_standard_market().map_err(|detail| {
            let payload = serde_json::to_value(&raw).unwrap_or(serde_json::Value::Null);
            ScanError::validation(PLATFORM, detail, payload)
        })?;
        Ok(Some(standard))
    }

    async fn get_json(&self, url: &str) -> ScanResult<serde_json::Value> {
        match self.get_json_inner(url, false).await? {
            Some(value) => Ok(value),
            None => Err(ScanError::http_status(PLATFORM, 404, "not found")),
        }
    }

    async fn get_json_opt(&self, url: &str) -> ScanResult<Option<serde_json::Value>> {
        self.get_json_inner(url, true).await
    }

    async fn get_json_inner(
        &self,
        url: &str,
        tolerate_not_found: bool,
    ) -> ScanResult<Option<serde_json::Value>> {
        let response = self
            .limiter
            .schedule(self.client.get(url).send())
            .await
            .map_err(|e| ScanError::classify(e, PLATFORM))?;

        let status = response.status();
        if tolerate_not_found && status.as_u16() == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok());
            let body = response.text().await.unwrap_or_default();
            return Err(ScanError::from_status(
                PLATFORM,
                status.as_u16(),
                body,
                retry_after,
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ScanError::classify(e, PLATFORM))?;
        let payload = serde_json::from_str(&body).map_err(|e| {
            ScanError::validation(
                PLATFORM,
                format!("response body is not JSON: {e}"),
                serde_json::Value::String(body),
            )
        })?;
        Ok(Some(payload))
    }
}

impl Default for ManifoldClient {
    fn default() -> Self {
        Self::new()
    }
}
