//! Alert dispatcher
//!
//! Posts qualifying opportunities to a Discord-compatible webhook.
//! Per-pair cooldown markers live in the cache so a pair alerts at most
//! once per window; delivery failures are logged and never reach the
//! scan result.

use crate::cache::{keys, Cache};
use chrono::Utc;
use reqwest::Client;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use scanner_core::ArbitrageOpportunity;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Embed accent color (green, matching profitable state)
const EMBED_COLOR: u32 = 0x22c55e;

/// Alerting thresholds and delivery settings.
#[derive(Debug, Clone)]
pub struct AlertConfig {
    pub enabled: bool,
    pub webhook_url: Option<String>,
    /// Minimum ROI percentage
    pub min_profit_percent: Decimal,
    /// Minimum dollar profit on a 100-contract position
    pub min_profit_amount: Decimal,
    pub cooldown_minutes: u64,
    /// Spacing between webhook posts; 2 s keeps a batch under the
    /// 30-per-minute webhook cap
    pub pacing: Duration,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            webhook_url: None,
            min_profit_percent: dec!(5),
            min_profit_amount: dec!(10),
            cooldown_minutes: 10,
            pacing: Duration::from_millis(2000),
        }
    }
}

/// Threshold-filtered, deduplicated, paced webhook dispatcher.
pub struct AlertDispatcher {
    client: Client,
    config: AlertConfig,
    cache: Arc<Cache>,
}

impl AlertDispatcher {
    pub fn new(config: AlertConfig, cache: Arc<Cache>) -> Self {
        if config.enabled && config.webhook_url.is_none() {
            warn!("Alerting enabled but no webhook URL configured; alerts will be dropped");
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            config,
            cache,
        }
    }

    /// Whether an opportunity clears both alert thresholds.
    pub fn meets_threshold(&self, opportunity: &ArbitrageOpportunity) -> bool {
        opportunity.roi >= self.config.min_profit_percent
            && opportunity.profit_per_hundred() >= self.config.min_profit_amount
    }

    /// Post one opportunity, unless disabled, unconfigured, or inside the
    /// pair's cooldown window.
    pub async fn send(&self, opportunity: &ArbitrageOpportunity) {
        if !self.config.enabled {
            return;
        }
        let Some(webhook_url) = &self.config.webhook_url else {
            debug!("Alert skipped: no webhook URL configured");
            return;
        };

        let cooldown_key =
            keys::alert_sent(&opportunity.market_a.id, &opportunity.market_b.id);
        if self.cache.exists(&cooldown_key) {
            debug!(
                "Alert suppressed by cooldown for pair {}",
                opportunity.pair_fingerprint()
            );
            return;
        }

        let body = build_webhook_body(opportunity);
        match self.client.post(webhook_url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {
                info!(
                    "Alert posted for pair {} (margin {}, roi {}%)",
                    opportunity.pair_fingerprint(),
                    opportunity.profit_margin,
                    opportunity.roi.round_dp(2)
                );
                self.cache.set(
                    &cooldown_key,
                    &true,
                    Duration::from_secs(self.config.cooldown_minutes * 60),
                );
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                warn!("Webhook answered {}: {}", status, body);
            }
            Err(e) => {
                warn!("Webhook post failed: {}", e);
            }
        }
    }

    /// Post a batch sequentially with inter-message pacing. Stops within
    /// one pacing gap once `shutdown` flips.
    pub async fn send_many(
        &self,
        opportunities: &[ArbitrageOpportunity],
        shutdown: &watch::Receiver<bool>,
    ) {
        for (index, opportunity) in opportunities.iter().enumerate() {
            if *shutdown.borrow() {
                debug!(
                    "Alert batch cancelled with {} messages remaining",
                    opportunities.len() - index
                );
                return;
            }

            self.send(opportunity).await;

            if index + 1 < opportunities.len() {
                let mut shutdown = shutdown.clone();
                tokio::select! {
                    _ = tokio::time::sleep(self.config.pacing) => {}
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            debug!(
                                "Alert batch cancelled with {} messages remaining",
                                opportunities.len() - index - 1
                            );
                            return;
                        }
                    }
                }
            }
        }
    }
}

/// Build the webhook payload: one rich embed per opportunity.
fn build_webhook_body(opportunity: &ArbitrageOpportunity) -> serde_json::Value {
    let market_a = &opportunity.market_a;
    let market_b = &opportunity.market_b;

    let end_date = market_a
        .end_date
        .or(market_b.end_date)
        .map(|d| d.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "unknown".to_string());

    serde_json::json!({
        "username": "Arbitrage Scanner",
        "embeds": [{
            "title": format!("Arbitrage: {}", market_a.title),
            "description": format!(
                "Expected profit **${}** per 100 contracts (**{}%** ROI)",
                opportunity.profit_per_hundred().round_dp(2),
                opportunity.roi.round_dp(2)
            ),
            "color": EMBED_COLOR,
            "fields": [
                {
                    "name": format!("{} ({})", market_a.platform, market_a.platform.short_name()),
                    "value": format!(
                        "Buy **{}** @ {}\n[{}]({})",
                        opportunity.outcome_a.name,
                        opportunity.outcome_a.price,
                        market_a.title,
                        market_a.url
                    ),
                    "inline": true
                },
                {
                    "name": format!("{} ({})", market_b.platform, market_b.platform.short_name()),
                    "value": format!(
                        "Buy **{}** @ {}\n[{}]({})",
                        opportunity.outcome_b.name,
                        opportunity.outcome_b.price,
                        market_b.title,
                        market_b.url
                    ),
                    "inline": true
                },
                {
                    "name": "Costs",
                    "value": format!(
                        "total {} + fees {} = net {}",
                        opportunity.total_cost,
                        opportunity.total_fees,
                        opportunity.net_cost
                    ),
                    "inline": false
                },
                {
                    "name": "Market closes",
                    "value": end_date,
                    "inline": false
                }
            ],
            "footer": { "text": "prices move; verify before acting" },
            "timestamp": Utc::now().to_rfc3339()
        }]
    })
}
