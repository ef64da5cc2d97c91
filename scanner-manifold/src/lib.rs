//! Manifold platform adapter
//!
//! Fetches markets from the Manifold API and normalizes them into
//! scanner-core's [`StandardMarket`](scanner_core::StandardMarket).
//! Manifold quotes a single YES probability per binary market; the NO
//! price is derived as its complement.

pub mod client;
pub mod types;

pub use client::ManifoldClient;
pub use types::ManifoldMarket;
