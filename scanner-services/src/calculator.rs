//! Fee-aware arbitrage calculator
//!
//! For each matched binary pair, prices both buy-direction strategies
//! (A-outcome-0 + B-outcome-1, and A-outcome-1 + B-outcome-0). Exactly
//! one leg pays out $1 whichever way the event resolves, so any strategy
//! whose fee-adjusted cost stays under $1 locks in the difference.
//! All arithmetic is fixed-point decimal.

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use scanner_core::{ArbitrageOpportunity, MarketMatch, Platform};
use std::collections::HashMap;
use tracing::debug;

/// Per-platform taker fee rates, applied multiplicatively to the price
/// paid on that platform.
#[derive(Debug, Clone)]
pub struct FeeSchedule {
    rates: HashMap<Platform, Decimal>,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        let mut rates = HashMap::new();
        rates.insert(Platform::Polymarket, dec!(0.02));
        rates.insert(Platform::Kalshi, dec!(0.07));
        rates.insert(Platform::Manifold, Decimal::ZERO);
        Self { rates }
    }
}

impl FeeSchedule {
    /// Fee rate for `platform`; unknown platforms are treated as free.
    pub fn rate(&self, platform: Platform) -> Decimal {
        self.rates.get(&platform).copied().unwrap_or(Decimal::ZERO)
    }
}

/// Opportunity acceptance thresholds.
#[derive(Debug, Clone)]
pub struct ArbitrageConfig {
    /// Minimum ROI percentage for an opportunity to be reported
    pub min_roi: Decimal,
    /// Minimum per-market liquidity, applied only when a market reports one
    pub min_liquidity: Decimal,
}

impl Default for ArbitrageConfig {
    fn default() -> Self {
        Self {
            min_roi: dec!(0.01),
            min_liquidity: dec!(100),
        }
    }
}

/// Fixed-precision arbitrage calculator.
#[derive(Debug, Default)]
pub struct Calculator {
    fees: FeeSchedule,
    config: ArbitrageConfig,
}

impl Calculator {
    pub fn new(fees: FeeSchedule, config: ArbitrageConfig) -> Self {
        Self { fees, config }
    }

    /// Evaluate both buy directions for every match and return the
    /// profitable opportunities.
    pub fn find_arbitrage(&self, matches: &[MarketMatch]) -> Vec<ArbitrageOpportunity> {
        let mut opportunities = Vec::new();

        for market_match in matches {
            if !market_match.market_a.is_binary() || !market_match.market_b.is_binary() {
                continue;
            }
            if !self.has_sufficient_liquidity(market_match) {
                continue;
            }

            for (index_a, index_b) in [(0usize, 1usize), (1, 0)] {
                if let Some(opportunity) = self.evaluate(market_match, index_a, index_b) {
                    opportunities.push(opportunity);
                }
            }
        }

        debug!(
            "Found {} profitable opportunities across {} matches",
            opportunities.len(),
            matches.len()
        );
        opportunities
    }

    /// Price one buy direction. Returns `None` unless the strategy is
    /// profitable above the configured ROI floor.
    fn evaluate(
        &self,
        market_match: &MarketMatch,
        index_a: usize,
        index_b: usize,
    ) -> Option<ArbitrageOpportunity> {
        let market_a = &market_match.market_a;
        let market_b = &market_match.market_b;
        let outcome_a = market_a.outcome(index_a)?;
        let outcome_b = market_b.outcome(index_b)?;

        let total_cost = outcome_a.price + outcome_b.price;
        if total_cost >= Decimal::ONE {
            return None;
        }

        let fees_a = outcome_a.price * self.fees.rate(market_a.platform);
        let fees_b = outcome_b.price * self.fees.rate(market_b.platform);
        let total_fees = fees_a + fees_b;
        let net_cost = total_cost + total_fees;
        let profit_margin = Decimal::ONE - net_cost;
        let is_profitable = profit_margin > Decimal::ZERO;

        if !is_profitable {
            return None;
        }

        let roi = profit_margin / net_cost * Decimal::ONE_HUNDRED;
        if roi < self.config.min_roi {
            return None;
        }

        Some(ArbitrageOpportunity {
            market_a: market_a.clone(),
            market_b: market_b.clone(),
            outcome_a: outcome_a.clone(),
            outcome_b: outcome_b.clone(),
            total_cost,
            fees_a,
            fees_b,
            total_fees,
            net_cost,
            profit_margin,
            roi,
            is_profitable,
            timestamp: Utc::now(),
        })
    }

    /// Markets that report liquidity must clear the floor; markets that
    /// don't report it are not rejected.
    fn has_sufficient_liquidity(&self, market_match: &MarketMatch) -> bool {
        [&market_match.market_a, &market_match.market_b]
            .iter()
            .all(|market| match market.liquidity {
                Some(liquidity) => liquidity >= self.config.min_liquidity,
                None => true,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanner_core::{MatchedBy, Outcome, StandardMarket};

    fn market(platform: Platform, id: &str, yes: Decimal, no: Decimal) -> StandardMarket {
        StandardMarket {
            id: id.to_string(),
            platform,
            title: "US recession in 2025?".to_string(),
            url: format!("https://example.com/{id}"),
            outcomes: vec![Outcome::new("Yes", yes), Outcome::new("No", no)],
            end_date: None,
            liquidity: None,
            category: None,
        }
    }

    fn matched(a: StandardMarket, b: StandardMarket) -> MarketMatch {
        MarketMatch {
            market_a: a,
            market_b: b,
            score: 90,
            matched_by: MatchedBy::Fuzzy,
        }
    }

    #[test]
    fn test_clear_arbitrage_pm_man() {
        // PM Yes 0.45 + MAN No 0.38: cost 0.83, PM fee 2% on 0.45.
        let calculator = Calculator::default();
        let pair = matched(
            market(Platform::Polymarket, "pm", dec!(0.45), dec!(0.55)),
            market(Platform::Manifold, "man", dec!(0.60), dec!(0.38)),
        );

        let opportunities = calculator.find_arbitrage(&[pair]);
        assert_eq!(opportunities.len(), 1);

        let opp = &opportunities[0];
        assert_eq!(opp.outcome_a.name, "Yes");
        assert_eq!(opp.outcome_b.name, "No");
        assert_eq!(opp.total_cost, dec!(0.83));
        assert_eq!(opp.fees_a, dec!(0.0090));
        assert_eq!(opp.fees_b, Decimal::ZERO);
        assert_eq!(opp.net_cost, dec!(0.8390));
        assert_eq!(opp.profit_margin, dec!(0.1610));
        assert!(opp.is_profitable);
        // 0.1610 / 0.8390 = 19.19%
        assert_eq!(opp.roi.round_dp(2), dec!(19.19));
    }

    #[test]
    fn test_fees_erase_the_gap() {
        // PM x KAL: both raw costs are under $1 but Kalshi's 7% pushes
        // them over.
        let calculator = Calculator::default();
        let pair = matched(
            market(Platform::Polymarket, "pm", dec!(0.50), dec!(0.49)),
            market(Platform::Kalshi, "kal", dec!(0.51), dec!(0.48)),
        );

        assert!(calculator.find_arbitrage(&[pair]).is_empty());
    }

    #[test]
    fn test_high_roi_strategy() {
        let calculator = Calculator::default();
        let pair = matched(
            market(Platform::Polymarket, "pm", dec!(0.35), dec!(0.65)),
            market(Platform::Manifold, "man", dec!(0.70), dec!(0.28)),
        );

        let opportunities = calculator.find_arbitrage(&[pair]);
        assert_eq!(opportunities.len(), 1);

        let opp = &opportunities[0];
        assert_eq!(opp.total_cost, dec!(0.63));
        assert_eq!(opp.net_cost, dec!(0.6370));
        assert_eq!(opp.profit_margin, dec!(0.3630));
        assert_eq!(opp.roi.round_dp(2), dec!(56.99));
    }

    #[test]
    fn test_total_cost_of_exactly_one_short_circuits() {
        let calculator = Calculator::default();
        // Manifold only: no fees, so only the raw cost gate applies.
        let pair = matched(
            market(Platform::Manifold, "m1", dec!(0.40), dec!(0.60)),
            market(Platform::Manifold, "m2", dec!(0.40), dec!(0.60)),
        );

        // Both directions cost exactly 1.00.
        assert!(calculator.find_arbitrage(&[pair]).is_empty());
    }

    #[test]
    fn test_both_directions_can_profit() {
        let calculator = Calculator::default();
        // Fee-free pair priced so both directions stay under $1.
        let pair = matched(
            market(Platform::Manifold, "m1", dec!(0.40), dec!(0.45)),
            market(Platform::Manifold, "m2", dec!(0.45), dec!(0.40)),
        );

        let opportunities = calculator.find_arbitrage(&[pair]);
        assert_eq!(opportunities.len(), 2);
        assert!(opportunities.iter().all(|o| o.is_profitable));
    }

    #[test]
    fn test_liquidity_floor_applies_only_when_reported() {
        let calculator = Calculator::default();

        let mut thin = market(Platform::Polymarket, "pm", dec!(0.45), dec!(0.55));
        thin.liquidity = Some(dec!(50));
        let pair = matched(
            thin,
            market(Platform::Manifold, "man", dec!(0.60), dec!(0.38)),
        );
        assert!(calculator.find_arbitrage(&[pair]).is_empty());

        let unreported = matched(
            market(Platform::Polymarket, "pm", dec!(0.45), dec!(0.55)),
            market(Platform::Manifold, "man", dec!(0.60), dec!(0.38)),
        );
        assert_eq!(calculator.find_arbitrage(&[unreported]).len(), 1);
    }

    #[test]
    fn test_profitability_flag_matches_margin() {
        let calculator = Calculator::default();
        let pair = matched(
            market(Platform::Polymarket, "pm", dec!(0.45), dec!(0.55)),
            market(Platform::Manifold, "man", dec!(0.60), dec!(0.38)),
        );

        for opp in calculator.find_arbitrage(&[pair]) {
            assert_eq!(opp.is_profitable, opp.profit_margin > Decimal::ZERO);
            assert!(opp.net_cost > Decimal::ZERO);
            let expected_roi = opp.profit_margin / opp.net_cost * Decimal::ONE_HUNDRED;
            assert_eq!(opp.roi, expected_roi);
        }
    }
}
