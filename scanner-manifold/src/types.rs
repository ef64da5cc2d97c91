//! Manifold API response types
//!
//! These types mirror the Manifold `/v0/markets` lite-market responses
//! and are converted to scanner-core types before leaving the adapter.
//! Manifold quotes a single YES probability; the NO price is its
//! complement.

use chrono::DateTime;
use rust_decimal::Decimal;
use scanner_core::{Outcome, Platform, StandardMarket};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A Manifold market from the API
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifoldMarket {
    /// Unique identifier
    pub id: String,

    /// Market question
    pub question: String,

    /// Canonical market URL
    pub url: String,

    /// Market mechanism; only "BINARY" markets are kept
    #[serde(default)]
    pub outcome_type: Option<String>,

    /// Current YES probability (0.0 - 1.0)
    #[serde(default)]
    pub probability: Option<f64>,

    /// Whether the market has resolved
    #[serde(default)]
    pub is_resolved: bool,

    /// When the market closes, epoch milliseconds
    #[serde(default)]
    pub close_time: Option<i64>,

    /// Pool liquidity
    #[serde(default)]
    pub total_liquidity: Option<f64>,
}

impl ManifoldMarket {
    /// Whether this market fits the binary pipeline: binary mechanism,
    /// unresolved, with a defined probability.
    pub fn is_tradeable_binary(&self) -> bool {
        self.outcome_type.as_deref() == Some("BINARY")
            && !self.is_resolved
            && self.probability.is_some()
    }

    /// Convert to a validated [`StandardMarket`].
    ///
    /// The float probability crosses into fixed-point here and is never
    /// used as a float again.
    pub fn to_standard_market(&self) -> Result<StandardMarket, String> {
        let probability = self
            .probability
            .ok_or_else(|| "missing probability".to_string())?;
        let yes = Decimal::from_str(&probability.to_string())
            .map_err(|_| format!("probability {probability} is not a finite number"))?;
        let no = Decimal::ONE - yes;

        let end_date = match self.close_time {
            Some(ms) => Some(
                DateTime::from_timestamp_millis(ms)
                    .ok_or_else(|| format!("closeTime {ms} out of range"))?,
            ),
            None => None,
        };

        let liquidity = match self.total_liquidity {
            Some(raw) => Some(
                Decimal::from_str(&raw.to_string())
                    .map_err(|_| format!("liquidity {raw} is not a finite number"))?,
            ),
            None => None,
        };

        let market = StandardMarket {
            id: self.id.clone(),
            platform: Platform::Manifold,
            title: self.question.clone(),
            url: self.url.clone(),
            outcomes: vec![Outcome::new("Yes", yes), Outcome::new("No", no)],
            end_date,
            liquidity,
            category: None,
        };
        market.validate()?;
        Ok(market)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn manifold_market(probability: Option<f64>) -> ManifoldMarket {
        ManifoldMarket {
            id: "man-1".to_string(),
            question: "US recession 2025".to_string(),
            url: "https://manifold.markets/x/us-recession-2025".to_string(),
            outcome_type: Some("BINARY".to_string()),
            probability,
            is_resolved: false,
            close_time: Some(1_767_225_600_000),
            total_liquidity: Some(430.0),
        }
    }

    #[test]
    fn test_transform_complements_probability() {
        let market = manifold_market(Some(0.62)).to_standard_market().unwrap();
        assert_eq!(market.outcomes[0].name, "Yes");
        assert_eq!(market.outcomes[0].price, dec!(0.62));
        assert_eq!(market.outcomes[1].name, "No");
        assert_eq!(market.outcomes[1].price, dec!(0.38));
        assert!(market.end_date.is_some());
    }

    #[test]
    fn test_binary_filter() {
        assert!(manifold_market(Some(0.5)).is_tradeable_binary());

        let mut resolved = manifold_market(Some(0.5));
        resolved.is_resolved = true;
        assert!(!resolved.is_tradeable_binary());

        let mut multi = manifold_market(Some(0.5));
        multi.outcome_type = Some("MULTIPLE_CHOICE".to_string());
        assert!(!multi.is_tradeable_binary());

        assert!(!manifold_market(None).is_tradeable_binary());
    }

    #[test]
    fn test_rejects_non_finite_probability() {
        assert!(manifold_market(Some(f64::NAN)).to_standard_market().is_err());
    }

    #[test]
    fn test_rejects_out_of_range_probability() {
        assert!(manifold_market(Some(1.2)).to_standard_market().is_err());
    }
}
