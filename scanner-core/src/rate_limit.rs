//! Per-platform request pacing
//!
//! Combines three admission controls per platform: a concurrency cap, a
//! token-bucket reservoir for burst control, and a minimum inter-request
//! interval so calls are SPACED OUT rather than fired in bursts that
//! trigger server-side limits.
//!
//! ## Key Design: Reservation-Based Scheduling
//!
//! When multiple tasks call `schedule()` concurrently, each task reserves
//! a future interval slot BEFORE releasing the lock. This prevents the
//! race where several tasks observe the same timestamp and all decide to
//! wait the same amount of time, and it keeps waiters FIFO.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::platform::Platform;

/// Token-bucket reservoir: bursts up to `capacity`, refilled by
/// `refill_amount` every `refill_interval`.
#[derive(Debug, Clone, Copy)]
pub struct ReservoirConfig {
    pub capacity: u32,
    pub refill_amount: u32,
    pub refill_interval: Duration,
}

/// Admission settings for one platform.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_concurrent: usize,
    pub min_interval: Duration,
    pub reservoir: ReservoirConfig,
}

impl RateLimitConfig {
    /// Reference pacing for each supported platform.
    pub fn for_platform(platform: Platform) -> Self {
        let (max_concurrent, min_interval_ms, capacity) = match platform {
            Platform::Polymarket => (5, 100, 50),
            Platform::Manifold => (3, 200, 25),
            Platform::Kalshi => (2, 500, 10),
        };
        Self {
            max_concurrent,
            min_interval: Duration::from_millis(min_interval_ms),
            reservoir: ReservoirConfig {
                capacity,
                refill_amount: capacity,
                refill_interval: Duration::from_secs(5),
            },
        }
    }
}

#[derive(Debug)]
struct Reservoir {
    available: u32,
    last_refill: Instant,
}

/// Rate limiter guarding one platform's HTTP calls.
#[derive(Debug)]
pub struct PlatformLimiter {
    platform: Platform,
    config: RateLimitConfig,
    /// Concurrency cap; tokio semaphores admit waiters FIFO
    slots: Semaphore,
    /// Token bucket, refilled lazily from elapsed time
    reservoir: Mutex<Reservoir>,
    /// The next available interval slot, in ms since `epoch`
    next_available_ms: Mutex<u64>,
    epoch: Instant,
    total_requests: AtomicU64,
    queued_requests: AtomicU64,
    depleted_waits: AtomicU64,
}

impl PlatformLimiter {
    pub fn new(platform: Platform, config: RateLimitConfig) -> Self {
        Self {
            platform,
            config,
            slots: Semaphore::new(config.max_concurrent),
            reservoir: Mutex::new(Reservoir {
                available: config.reservoir.capacity,
                last_refill: Instant::now(),
            }),
            next_available_ms: Mutex::new(0),
            epoch: Instant::now(),
            total_requests: AtomicU64::new(0),
            queued_requests: AtomicU64::new(0),
            depleted_waits: AtomicU64::new(0),
        }
    }

    /// Limiter with the reference configuration for `platform`.
    pub fn for_platform(platform: Platform) -> Self {
        Self::new(platform, RateLimitConfig::for_platform(platform))
    }

    /// Run `fut` once a concurrency slot, a reservoir token, and an
    /// interval slot are all available. The concurrency slot is held for
    /// the duration of `fut`.
    pub async fn schedule<T, F>(&self, fut: F) -> T
    where
        F: Future<Output = T>,
    {
        let request_num = self.total_requests.fetch_add(1, Ordering::Relaxed) + 1;

        // Never closed, so acquire can only fail if the semaphore is
        // dropped out from under us.
        let _permit = self
            .slots
            .acquire()
            .await
            .expect("rate limiter semaphore closed");

        self.take_token(request_num).await;
        self.wait_interval_slot(request_num).await;

        fut.await
    }

    /// Take one reservoir token, sleeping until the next refill when the
    /// bucket is empty.
    async fn take_token(&self, request_num: u64) {
        loop {
            let wait = {
                let mut reservoir = self.reservoir.lock().await;
                self.refill(&mut reservoir);

                if reservoir.available > 0 {
                    reservoir.available -= 1;
                    return;
                }

                let elapsed = reservoir.last_refill.elapsed();
                self.config
                    .reservoir
                    .refill_interval
                    .saturating_sub(elapsed)
            };

            self.depleted_waits.fetch_add(1, Ordering::Relaxed);
            warn!(
                platform = %self.platform,
                request = request_num,
                wait_ms = wait.as_millis() as u64,
                "rate limiter reservoir depleted"
            );
            tokio::time::sleep(wait).await;
        }
    }

    fn refill(&self, reservoir: &mut Reservoir) {
        let interval = self.config.reservoir.refill_interval;
        let elapsed = reservoir.last_refill.elapsed();
        if elapsed < interval {
            return;
        }

        let intervals = (elapsed.as_millis() / interval.as_millis()) as u32;
        let refilled = intervals.saturating_mul(self.config.reservoir.refill_amount);
        reservoir.available =
            (reservoir.available + refilled).min(self.config.reservoir.capacity);
        reservoir.last_refill += interval * intervals;
    }

    /// Reserve the next interval slot and sleep until it arrives.
    async fn wait_interval_slot(&self, request_num: u64) {
        let now_ms = self.instant_to_ms(Instant::now());
        let interval_ms = self.config.min_interval.as_millis() as u64;

        let wait_until = {
            let mut next_available = self.next_available_ms.lock().await;

            if now_ms >= *next_available {
                *next_available = now_ms + interval_ms;
                None
            } else {
                let our_slot = *next_available;
                *next_available = our_slot + interval_ms;
                self.queued_requests.fetch_add(1, Ordering::Relaxed);
                debug!(
                    platform = %self.platform,
                    request = request_num,
                    wait_ms = our_slot - now_ms,
                    "rate limiter queued"
                );
                Some(self.ms_to_instant(our_slot))
            }
            // Lock released here; we sleep outside it.
        };

        if let Some(target) = wait_until {
            let wait = target.saturating_duration_since(Instant::now());
            if !wait.is_zero() {
                tokio::time::sleep(wait).await;
            }
        }
    }

    fn instant_to_ms(&self, instant: Instant) -> u64 {
        instant.duration_since(self.epoch).as_millis() as u64
    }

    fn ms_to_instant(&self, ms: u64) -> Instant {
        self.epoch + Duration::from_millis(ms)
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Observability counters.
    pub fn stats(&self) -> LimiterStats {
        LimiterStats {
            platform: self.platform,
            total_requests: self.total_requests.load(Ordering::Relaxed),
            queued_requests: self.queued_requests.load(Ordering::Relaxed),
            depleted_waits: self.depleted_waits.load(Ordering::Relaxed),
        }
    }
}

/// Counters exposed by [`PlatformLimiter::stats`].
#[derive(Debug, Clone)]
pub struct LimiterStats {
    pub platform: Platform,
    pub total_requests: u64,
    pub queued_requests: u64,
    pub depleted_waits: u64,
}
