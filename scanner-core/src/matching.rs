//! Cross-platform market match types

use crate::market::StandardMarket;
use serde::{Deserialize, Serialize};

/// How a match between two markets was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchedBy {
    /// Titles were identical after normalization
    Exact,
    /// Fuzzy title similarity above the configured threshold
    Fuzzy,
    /// Hand-curated pairing
    Manual,
}

/// A candidate pairing of the same real-world event on two platforms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketMatch {
    pub market_a: StandardMarket,
    pub market_b: StandardMarket,

    /// Confidence in [60, 100]; higher is more confident
    pub score: u8,

    pub matched_by: MatchedBy,
}

impl MarketMatch {
    /// Matches are only meaningful across distinct platforms.
    pub fn is_cross_platform(&self) -> bool {
        self.market_a.platform != self.market_b.platform
    }
}
