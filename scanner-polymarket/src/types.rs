//! Polymarket API response types
//!
//! These types mirror the Polymarket Gamma API responses and are
//! converted to scanner-core types before leaving the adapter.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use scanner_core::{Outcome, Platform, StandardMarket};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A Polymarket market from the Gamma API
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GammaMarket {
    /// Unique identifier
    pub id: String,

    /// Market question
    pub question: String,

    /// URL slug
    #[serde(default)]
    pub slug: Option<String>,

    /// End date
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,

    /// Category
    #[serde(default)]
    pub category: Option<String>,

    /// Total liquidity, as a decimal string
    #[serde(default)]
    pub liquidity: Option<String>,

    /// Outcome names as a JSON-encoded string array,
    /// e.g. "[\"Yes\", \"No\"]"
    #[serde(default)]
    pub outcomes: Option<String>,

    /// Outcome prices as a JSON-encoded string array,
    /// e.g. "[\"0.45\", \"0.55\"]"
    #[serde(default)]
    pub outcome_prices: Option<String>,

    /// Whether the market is active
    #[serde(default)]
    pub active: Option<bool>,

    /// Whether the market is closed
    #[serde(default)]
    pub closed: Option<bool>,
}

impl GammaMarket {
    /// Parse the outcome name array. The API double-encodes it as a JSON
    /// string.
    fn parse_outcome_names(&self) -> Result<Vec<String>, String> {
        let raw = self
            .outcomes
            .as_ref()
            .ok_or_else(|| "missing outcomes field".to_string())?;
        serde_json::from_str::<Vec<String>>(raw)
            .map_err(|e| format!("outcomes is not a JSON string array: {e}"))
    }

    /// Parse outcome prices. Most responses are string arrays
    /// ("[\"0.45\", \"0.55\"]"); older ones use number arrays.
    fn parse_outcome_prices(&self) -> Result<Vec<Decimal>, String> {
        let raw = self
            .outcome_prices
            .as_ref()
            .ok_or_else(|| "missing outcomePrices field".to_string())?;

        if let Ok(prices) = serde_json::from_str::<Vec<String>>(raw) {
            return prices
                .iter()
                .map(|p| {
                    Decimal::from_str(p).map_err(|e| format!("bad price '{p}': {e}"))
                })
                .collect();
        }

        if let Ok(prices) = serde_json::from_str::<Vec<f64>>(raw) {
            return prices
                .iter()
                .map(|p| {
                    Decimal::from_str(&p.to_string())
                        .map_err(|e| format!("bad price '{p}': {e}"))
                })
                .collect();
        }

        Err(format!("outcomePrices is not a JSON array: {raw}"))
    }

    /// Convert to a validated [`StandardMarket`].
    pub fn to_standard_market(&self) -> Result<StandardMarket, String> {
        let names = self.parse_outcome_names()?;
        let prices = self.parse_outcome_prices()?;

        if names.len() != prices.len() {
            return Err(format!(
                "{} outcome names but {} prices",
                names.len(),
                prices.len()
            ));
        }

        let outcomes: Vec<Outcome> = names
            .into_iter()
            .zip(prices)
            .map(|(name, price)| Outcome::new(name, price))
            .collect();

        let url = match &self.slug {
            Some(slug) => format!("https://polymarket.com/event/{slug}"),
            None => format!("https://polymarket.com/market/{}", self.id),
        };

        let liquidity = match &self.liquidity {
            Some(raw) => {
                Some(Decimal::from_str(raw).map_err(|e| format!("bad liquidity '{raw}': {e}"))?)
            }
            None => None,
        };

        let market = StandardMarket {
            id: self.id.clone(),
            platform: Platform::Polymarket,
            title: self.question.clone(),
            url,
            outcomes,
            end_date: self.end_date,
            liquidity,
            category: self.category.clone(),
        };
        market.validate()?;
        Ok(market)
    }
}
