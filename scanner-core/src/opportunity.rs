//! Arbitrage opportunity type
//!
//! One realised buy-direction across a matched pair: buy one outcome on
//! each platform such that exactly one of the two pays out $1.

use crate::market::{Outcome, StandardMarket};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A priced buy-direction across two matched markets.
///
/// All money-valued fields are fixed-point decimals; the markets and the
/// chosen outcomes are held by value since both are read-only after
/// capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbitrageOpportunity {
    pub market_a: StandardMarket,
    pub market_b: StandardMarket,

    /// The outcome bought on platform A
    pub outcome_a: Outcome,
    /// The outcome bought on platform B
    pub outcome_b: Outcome,

    /// priceA + priceB
    pub total_cost: Decimal,

    /// priceA x platform A fee rate
    pub fees_a: Decimal,
    /// priceB x platform B fee rate
    pub fees_b: Decimal,
    pub total_fees: Decimal,

    /// total_cost + total_fees
    pub net_cost: Decimal,

    /// 1 - net_cost
    pub profit_margin: Decimal,

    /// profit_margin / net_cost as a percentage; zero when not profitable
    pub roi: Decimal,

    pub is_profitable: bool,

    /// Wall-clock capture time
    pub timestamp: DateTime<Utc>,
}

impl ArbitrageOpportunity {
    /// Deterministic identifier for alert deduplication.
    pub fn pair_fingerprint(&self) -> String {
        format!("{}:{}", self.market_a.id, self.market_b.id)
    }

    /// Expected profit in dollars on a 100-contract position.
    pub fn profit_per_hundred(&self) -> Decimal {
        self.profit_margin * Decimal::ONE_HUNDRED
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Platform;
    use rust_decimal_macros::dec;

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

    #[test]
    fn test_pair_fingerprint() {
        let opp = ArbitrageOpportunity {
            market_a: market(Platform::Polymarket, "a1"),
            market_b: market(Platform::Manifold, "b2"),
            outcome_a: Outcome::new("Yes", dec!(0.45)),
            outcome_b: Outcome::new("No", dec!(0.38)),
            total_cost: dec!(0.83),
            fees_a: dec!(0.009),
            fees_b: Decimal::ZERO,
            total_fees: dec!(0.009),
            net_cost: dec!(0.839),
            profit_margin: dec!(0.161),
            roi: dec!(19.19),
            is_profitable: true,
            timestamp: Utc::now(),
        };
        assert_eq!(opp.pair_fingerprint(), "a1:b2");
        assert_eq!(opp.profit_per_hundred(), dec!(16.100));
    }
}
