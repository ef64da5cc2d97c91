//! Kalshi platform adapter
//!
//! Fetches markets from the Kalshi trade API and normalizes them into
//! scanner-core's [`StandardMarket`](scanner_core::StandardMarket).
//! Kalshi quotes in integer cents; the adapter converts to fixed-point
//! decimals and keeps only quoted binary markets.

pub mod client;
pub mod types;

pub use client::KalshiClient;
pub use types::{KalshiMarket, MarketResponse, MarketsResponse};
