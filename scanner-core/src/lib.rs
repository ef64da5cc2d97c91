//! Core types for the cross-platform arbitrage scanner
//!
//! This crate provides the shared domain model (platforms, normalized
//! markets, matches, opportunities), the error taxonomy, and the two
//! low-level drivers every adapter builds on: per-platform rate limiting
//! and typed-error retry.

pub mod error;
pub mod market;
pub mod matching;
pub mod opportunity;
pub mod platform;
pub mod rate_limit;
pub mod retry;

pub use error::{ErrorKind, ScanError, ScanResult};
pub use market::{Outcome, StandardMarket};
pub use matching::{MarketMatch, MatchedBy};
pub use opportunity::ArbitrageOpportunity;
pub use platform::Platform;
pub use rate_limit::{LimiterStats, PlatformLimiter, RateLimitConfig, ReservoirConfig};
pub use retry::{retry, RetryConfig};
