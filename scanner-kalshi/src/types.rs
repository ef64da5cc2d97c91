//! Kalshi API response types
//!
//! These types mirror the Kalshi trade API responses and are converted
//! to scanner-core types before leaving the adapter. Kalshi quotes
//! prices and liquidity in integer cents.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use scanner_core::{Outcome, Platform, StandardMarket};
use serde::{Deserialize, Serialize};

/// Response from GET /markets
#[derive(Debug, Clone, Deserialize)]
pub struct MarketsResponse {
    pub markets: Vec<KalshiMarket>,
    #[serde(default)]
    pub cursor: Option<String>,
}

/// Response from GET /markets/{ticker}
#[derive(Debug, Clone, Deserialize)]
pub struct MarketResponse {
    pub market: KalshiMarket,
}

/// A Kalshi market from the API
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KalshiMarket {
    /// Market ticker (unique identifier)
    pub ticker: String,

    /// Event ticker this market belongs to
    #[serde(default)]
    pub event_ticker: Option<String>,

    /// Market title
    pub title: String,

    /// Market type; the scanner only keeps "binary"
    #[serde(default)]
    pub market_type: Option<String>,

    /// Market status. Both "open" and "active" appear in the wild for
    /// tradeable markets, so this is informational only.
    #[serde(default)]
    pub status: Option<String>,

    /// Current YES ask in cents (1-99)
    #[serde(default)]
    pub yes_ask: Option<i64>,

    /// Current NO ask in cents
    #[serde(default)]
    pub no_ask: Option<i64>,

    /// Available liquidity in cents
    #[serde(default)]
    pub liquidity: Option<i64>,

    /// When the market closes
    #[serde(default)]
    pub close_time: Option<DateTime<Utc>>,

    /// Category
    #[serde(default)]
    pub category: Option<String>,
}

impl KalshiMarket {
    /// Convert cents to decimal dollars (0.00 - 1.00 for prices)
    pub fn cents_to_decimal(cents: i64) -> Decimal {
        Decimal::from(cents) / Decimal::from(100)
    }

    /// Extract series ticker from event_ticker by stripping the numeric
    /// suffix, e.g. "KXELONMARS-99" -> "KXELONMARS"
    fn extract_series_ticker(event_ticker: &str) -> &str {
        if let Some(pos) = event_ticker.rfind('-') {
            let suffix = &event_ticker[pos + 1..];
            if suffix.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                return &event_ticker[..pos];
            }
        }
        event_ticker
    }

    /// Whether this market fits the binary pipeline: type "binary" with
    /// both ask sides quoted.
    pub fn is_tradeable_binary(&self) -> bool {
        self.market_type.as_deref() == Some("binary")
            && self.yes_ask.is_some()
            && self.no_ask.is_some()
    }

    /// Convert to a validated [`StandardMarket`].
    ///
    /// Callers filter with [`is_tradeable_binary`](Self::is_tradeable_binary)
    /// first; a market failing that filter here is a schema violation.
    pub fn to_standard_market(&self) -> Result<StandardMarket, String> {
        let yes_ask = self.yes_ask.ok_or_else(|| "missing yes_ask".to_string())?;
        let no_ask = self.no_ask.ok_or_else(|| "missing no_ask".to_string())?;

        // URL format: https://kalshi.com/markets/{series_ticker}
        let series_ticker = self
            .event_ticker
            .as_ref()
            .map(|et| Self::extract_series_ticker(et))
            .unwrap_or(&self.ticker);
        let url = format!("https://kalshi.com/markets/{}", series_ticker.to_lowercase());

        let market = StandardMarket {
            id: self.ticker.clone(),
            platform: Platform::Kalshi,
            title: self.title.clone(),
            url,
            outcomes: vec![
                Outcome::new("Yes", Self::cents_to_decimal(yes_ask)),
                Outcome::new("No", Self::cents_to_decimal(no_ask)),
            ],
            end_date: self.close_time,
            liquidity: self.liquidity.map(Self::cents_to_decimal),
            category: self.category.clone(),
        };
        market.validate()?;
        Ok(market)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn kalshi_market() -> KalshiMarket {
        KalshiMarket {
            ticker: "KXRECESSION-25".to_string(),
            event_ticker: Some("KXRECESSION-25".to_string()),
            title: "US recession 2025".to_string(),
            market_type: Some("binary".to_string()),
            status: Some("open".to_string()),
            yes_ask: Some(51),
            no_ask: Some(48),
            liquidity: Some(98_000),
            close_time: None,
            category: Some("Economics".to_string()),
        }
    }

    #[test]
    fn test_cents_conversion() {
        assert_eq!(KalshiMarket::cents_to_decimal(51), dec!(0.51));
        assert_eq!(KalshiMarket::cents_to_decimal(100), Decimal::ONE);
        assert_eq!(KalshiMarket::cents_to_decimal(0), Decimal::ZERO);
    }

    #[test]
    fn test_transform() {
        let market = kalshi_market().to_standard_market().unwrap();
        assert_eq!(market.id, "KXRECESSION-25");
        assert_eq!(market.outcomes[0].price, dec!(0.51));
        assert_eq!(market.outcomes[1].price, dec!(0.48));
        assert_eq!(market.liquidity, Some(dec!(980)));
        assert_eq!(market.url, "https://kalshi.com/markets/kxrecession");
    }

    #[test]
    fn test_binary_filter() {
        assert!(kalshi_market().is_tradeable_binary());

        let mut scalar = kalshi_market();
        scalar.market_type = Some("scalar".to_string());
        assert!(!scalar.is_tradeable_binary());

        let mut no_asks = kalshi_market();
        no_asks.no_ask = None;
        assert!(!no_asks.is_tradeable_binary());
    }

    #[test]
    fn test_status_never_filters() {
        // Both "open" and "active" circulate; neither blocks ingestion.
        for status in ["open", "active", "weird"] {
            let mut market = kalshi_market();
            market.status = Some(status.to_string());
            assert!(market.is_tradeable_binary());
        }
    }

    #[test]
    fn test_out_of_range_cents_rejected() {
        let mut market = kalshi_market();
        market.yes_ask = Some(150);
        assert!(market.to_standard_market().is_err());
    }
}
