//! Normalized market data structures
//!
//! Every platform adapter converts its raw API payloads into
//! [`StandardMarket`] so that the matcher and calculator never see
//! platform-specific shapes.

use crate::platform::Platform;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One side of a binary market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Outcome label (e.g. "Yes", "No")
    pub name: String,

    /// Price in [0, 1], fixed-point decimal
    pub price: Decimal,
}

impl Outcome {
    pub fn new(name: impl Into<String>, price: Decimal) -> Self {
        Self {
            name: name.into(),
            price,
        }
    }
}

/// A binary prediction market, normalized across platforms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardMarket {
    /// Platform-unique identifier
    pub id: String,

    /// Which platform this market is from
    pub platform: Platform,

    /// Human-readable title/question
    pub title: String,

    /// URL to the market on the platform's website
    pub url: String,

    /// Exactly two outcomes, in platform order (Yes first by convention)
    pub outcomes: Vec<Outcome>,

    /// When the market closes for trading
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,

    /// Available liquidity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liquidity: Option<Decimal>,

    /// Platform-supplied category tag (e.g. "Politics", "Crypto")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl StandardMarket {
    /// Check the invariants every adapter must uphold: exactly two
    /// outcomes, each price in [0, 1], non-empty id and title.
    ///
    /// Returns a description of the first violated invariant.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("market id is empty".to_string());
        }
        if self.title.is_empty() {
            return Err("market title is empty".to_string());
        }
        if self.outcomes.len() != 2 {
            return Err(format!(
                "expected exactly 2 outcomes, got {}",
                self.outcomes.len()
            ));
        }
        for outcome in &self.outcomes {
            if outcome.price < Decimal::ZERO || outcome.price > Decimal::ONE {
                return Err(format!(
                    "outcome '{}' price {} outside [0, 1]",
                    outcome.name, outcome.price
                ));
            }
        }
        Ok(())
    }

    /// The outcome at `index` (0 or 1). Valid markets always have both.
    pub fn outcome(&self, index: usize) -> Option<&Outcome> {
        self.outcomes.get(index)
    }

    /// Whether this market has the binary shape the pipeline requires.
    pub fn is_binary(&self) -> bool {
        self.outcomes.len() == 2
    }
}
