//! Pipeline services for the arbitrage scanner
//!
//! This crate provides the service layer that turns per-platform market
//! snapshots into reported opportunities: caching, matching, arbitrage
//! pricing, job scheduling, and alert dispatch.

pub mod alerts;
pub mod cache;
pub mod calculator;
pub mod fetcher;
pub mod matcher;
pub mod orchestrator;
pub mod queue;
pub mod scheduler;

pub use alerts::{AlertConfig, AlertDispatcher};
pub use cache::{keys, Cache, CacheStats};
pub use calculator::{ArbitrageConfig, Calculator, FeeSchedule};
pub use fetcher::MarketFetcher;
pub use matcher::{Matcher, MatcherConfig};
pub use orchestrator::{ScanOrchestrator, ScanSummary};
pub use queue::{
    JobHandle, QueueStats, ScanJob, ScanQueue, ScanWorker, WorkerConfig, WorkerEvent,
};
pub use scheduler::{Scheduler, SchedulerConfig};
