//! Polymarket platform adapter
//!
//! Fetches markets from the Polymarket Gamma API and normalizes them
//! into scanner-core's [`StandardMarket`](scanner_core::StandardMarket).

pub mod client;
pub mod types;

pub use client::PolymarketClient;
pub use types::GammaMarket;
