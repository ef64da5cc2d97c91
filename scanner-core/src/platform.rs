//! Platform definitions for prediction markets

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prediction market platforms the scanner knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Polymarket - Crypto-based prediction market
    Polymarket,
    /// Kalshi - US regulated prediction market
    Kalshi,
    /// Manifold - Play-money prediction market
    Manifold,
}

impl Platform {
    /// All supported platforms (useful for iteration).
    pub const ALL: &'static [Platform] =
        &[Platform::Polymarket, Platform::Kalshi, Platform::Manifold];

    /// Get a short identifier for the platform (used in cache keys and logs)
    pub fn short_name(&self) -> &'static str {
        match self {
            Platform::Polymarket => "PM",
            Platform::Kalshi => "KAL",
            Platform::Manifold => "MAN",
        }
    }

    /// Get the full display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Polymarket => "Polymarket",
            Platform::Kalshi => "Kalshi",
            Platform::Manifold => "Manifold",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "polymarket" | "poly" | "pm" => Ok(Platform::Polymarket),
            "kalshi" | "kal" => Ok(Platform::Kalshi),
            "manifold" | "man" => Ok(Platform::Manifold),
            _ => Err(format!("Unknown platform: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_names_are_distinct() {
        let names: std::collections::HashSet<_> =
            Platform::ALL.iter().map(|p| p.short_name()).collect();
        assert_eq!(names.len(), Platform::ALL.len());
    }

    #[test]
    fn test_from_str() {
        assert_eq!("polymarket".parse::<Platform>().unwrap(), Platform::Polymarket);
        assert_eq!("KAL".parse::<Platform>().unwrap(), Platform::Kalshi);
        assert_eq!("man".parse::<Platform>().unwrap(), Platform::Manifold);
        assert!("betfair".parse::<Platform>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Platform::Kalshi).unwrap();
        assert_eq!(json, "\"kalshi\"");
        let parsed: Platform = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Platform::Kalshi);
    }
}
