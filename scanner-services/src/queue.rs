//! Scan job queue and worker
//!
//! The queue holds one-shot and recurring [`ScanJob`]s; the worker
//! processes them one at a time by delegating to the orchestrator.
//! Failed jobs are re-queued with exponential backoff up to the attempt
//! cap, then recorded in the failed set. Completed and failed records are
//! retained with bounded count and age.

use crate::orchestrator::{ScanOrchestrator, ScanSummary};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use scanner_core::Platform;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, Notify};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Completed-job retention bounds
const COMPLETED_RETENTION_COUNT: usize = 100;
const COMPLETED_RETENTION_HOURS: i64 = 24;
/// Failed-job retention bound
const FAILED_RETENTION_COUNT: usize = 50;

/// One cross-platform scan request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanJob {
    pub platform_a: Platform,
    pub platform_b: Platform,
    pub limit: usize,
}

impl ScanJob {
    pub fn new(platform_a: Platform, platform_b: Platform, limit: usize) -> Self {
        Self {
            platform_a,
            platform_b,
            limit,
        }
    }

    /// Recurring enrolments are keyed by the platform pair.
    pub fn pair_key(&self) -> String {
        format!(
            "{}:{}",
            self.platform_a.short_name(),
            self.platform_b.short_name()
        )
    }
}

/// Handle returned from [`ScanQueue::enqueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobHandle {
    pub id: Uuid,
}

/// A job pulled from the queue, carrying its retry attempt counter.
#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub id: Uuid,
    pub job: ScanJob,
    /// Zero-based count of already-failed attempts
    pub attempt: u32,
}

#[derive(Debug)]
struct DelayedJob {
    ready_at: Instant,
    queued: QueuedJob,
}

#[derive(Debug)]
struct RecurringEntry {
    job: ScanJob,
    every: Duration,
    next_due: Instant,
}

#[derive(Debug)]
struct CompletedRecord {
    #[allow(dead_code)]
    id: Uuid,
    finished_at: DateTime<Utc>,
}

#[derive(Debug)]
struct FailedRecord {
    #[allow(dead_code)]
    id: Uuid,
    #[allow(dead_code)]
    reason: String,
}

#[derive(Debug, Default)]
struct QueueInner {
    waiting: VecDeque<QueuedJob>,
    delayed: Vec<DelayedJob>,
    recurring: HashMap<String, RecurringEntry>,
    active: Option<(Uuid, u8)>,
    completed: VecDeque<CompletedRecord>,
    failed: VecDeque<FailedRecord>,
}

/// Counts exposed by [`ScanQueue::stats`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueStats {
    pub waiting: usize,
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
    pub delayed: usize,
}

impl std::fmt::Display for QueueStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "waiting={} active={} completed={} failed={} delayed={}",
            self.waiting, self.active, self.completed, self.failed, self.delayed
        )
    }
}

/// In-process scan job queue.
///
/// Recurring enrolments fire on their cadence until the queue closes;
/// each firing becomes an ordinary waiting job with a fresh id.
#[derive(Debug, Default)]
pub struct ScanQueue {
    inner: Mutex<QueueInner>,
    notify: Notify,
    closed: AtomicBool,
}

impl ScanQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a one-shot job.
    pub fn enqueue(&self, job: ScanJob) -> JobHandle {
        let id = Uuid::new_v4();
        if self.closed.load(Ordering::SeqCst) {
            warn!("Queue closed; dropping job {} ({})", id, job.pair_key());
            return JobHandle { id };
        }

        self.inner.lock().waiting.push_back(QueuedJob {
            id,
            job,
            attempt: 0,
        });
        self.notify.notify_waiters();
        JobHandle { id }
    }

    /// Enroll a recurring job, replacing any existing enrolment for the
    /// same platform pair. The first firing is immediate.
    pub fn enqueue_recurring(&self, job: ScanJob, every: Duration) {
        if self.closed.load(Ordering::SeqCst) {
            warn!("Queue closed; ignoring recurring enrolment {}", job.pair_key());
            return;
        }

        let key = job.pair_key();
        let replaced = self
            .inner
            .lock()
            .recurring
            .insert(
                key.clone(),
                RecurringEntry {
                    job,
                    every,
                    next_due: Instant::now(),
                },
            )
            .is_some();
        info!(
            "Recurring scan {} every {:?}{}",
            key,
            every,
            if replaced { " (replaced)" } else { "" }
        );
        self.notify.notify_waiters();
    }

    /// Wait for the next runnable job. Returns `None` once the queue is
    /// closed.
    pub async fn next_job(&self) -> Option<QueuedJob> {
        loop {
            if self.closed.load(Ordering::SeqCst) {
                return None;
            }

            // Register for wakeups before inspecting the queue, so an
            // enqueue landing between the inspection and the await below
            // is not lost.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let (job, nearest_due) = {
                let mut inner = self.inner.lock();
                Self::promote_due(&mut inner);
                match inner.waiting.pop_front() {
                    Some(queued) => {
                        inner.active = Some((queued.id, 0));
                        (Some(queued), None)
                    }
                    None => (None, Self::nearest_due(&inner)),
                }
            };

            if let Some(job) = job {
                return Some(job);
            }

            match nearest_due {
                Some(due) => {
                    tokio::select! {
                        _ = notified.as_mut() => {}
                        _ = tokio::time::sleep_until(due) => {}
                    }
                }
                None => notified.await,
            }
        }
    }

    /// Move due delayed jobs and due recurring firings into the waiting
    /// list.
    fn promote_due(inner: &mut QueueInner) {
        let now = Instant::now();

        let mut index = 0;
        while index < inner.delayed.len() {
            if inner.delayed[index].ready_at <= now {
                let delayed = inner.delayed.swap_remove(index);
                inner.waiting.push_back(delayed.queued);
            } else {
                index += 1;
            }
        }

        for entry in inner.recurring.values_mut() {
            if entry.next_due <= now {
                inner.waiting.push_back(QueuedJob {
                    id: Uuid::new_v4(),
                    job: entry.job.clone(),
                    attempt: 0,
                });
                // Skip missed firings rather than bursting to catch up.
                while entry.next_due <= now {
                    entry.next_due += entry.every;
                }
            }
        }
    }

    fn nearest_due(inner: &QueueInner) -> Option<Instant> {
        let delayed = inner.delayed.iter().map(|d| d.ready_at).min();
        let recurring = inner.recurring.values().map(|r| r.next_due).min();
        match (delayed, recurring) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Record a progress checkpoint for the active job.
    pub fn report_progress(&self, id: Uuid, percent: u8) {
        let mut inner = self.inner.lock();
        if let Some((active_id, progress)) = inner.active.as_mut() {
            if *active_id == id {
                *progress = percent;
            }
        }
    }

    /// Progress of the active job, if one is running.
    pub fn active_progress(&self) -> Option<(Uuid, u8)> {
        self.inner.lock().active
    }

    /// Mark the active job completed.
    pub fn finish_success(&self, id: Uuid) {
        let mut inner = self.inner.lock();
        inner.active = None;
        inner.completed.push_back(CompletedRecord {
            id,
            finished_at: Utc::now(),
        });

        let horizon = Utc::now() - chrono::Duration::hours(COMPLETED_RETENTION_HOURS);
        inner
            .completed
            .retain(|record| record.finished_at > horizon);
        while inner.completed.len() > COMPLETED_RETENTION_COUNT {
            inner.completed.pop_front();
        }
        self.notify.notify_waiters();
    }

    /// Mark the active job permanently failed.
    pub fn finish_failure(&self, id: Uuid, reason: String) {
        let mut inner = self.inner.lock();
        inner.active = None;
        inner.failed.push_back(FailedRecord { id, reason });
        while inner.failed.len() > FAILED_RETENTION_COUNT {
            inner.failed.pop_front();
        }
        self.notify.notify_waiters();
    }

    /// Re-queue the active job for another attempt after `delay`.
    pub fn retry_later(&self, queued: QueuedJob, delay: Duration) {
        let mut inner = self.inner.lock();
        inner.active = None;
        inner.delayed.push(DelayedJob {
            ready_at: Instant::now() + delay,
            queued,
        });
        self.notify.notify_waiters();
    }

    pub fn stats(&self) -> QueueStats {
        let inner = self.inner.lock();
        QueueStats {
            waiting: inner.waiting.len(),
            active: usize::from(inner.active.is_some()),
            completed: inner.completed.len(),
            failed: inner.failed.len(),
            delayed: inner.delayed.len(),
        }
    }

    /// Wait until nothing is waiting, delayed, or running.
    pub async fn drain(&self) {
        loop {
            {
                let inner = self.inner.lock();
                if inner.waiting.is_empty() && inner.delayed.is_empty() && inner.active.is_none()
                {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    /// Stop accepting and handing out work. Recurring enrolments are
    /// dropped; waiting jobs stay queued but are never dispatched.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.inner.lock().recurring.clear();
        self.notify.notify_waiters();
        debug!("Queue closed");
    }
}

/// Worker lifecycle events.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Completed { id: Uuid, summary: ScanSummary },
    Failed { id: Uuid, reason: String },
}

/// Worker retry policy.
#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    pub max_attempts: u32,
    pub backoff_initial: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_initial: Duration::from_millis(2000),
        }
    }
}

/// Single-concurrency scan worker.
pub struct ScanWorker {
    queue: Arc<ScanQueue>,
    orchestrator: Arc<ScanOrchestrator>,
    config: WorkerConfig,
    events: broadcast::Sender<WorkerEvent>,
}

impl ScanWorker {
    pub fn new(
        queue: Arc<ScanQueue>,
        orchestrator: Arc<ScanOrchestrator>,
        config: WorkerConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            queue,
            orchestrator,
            config,
            events,
        }
    }

    /// Subscribe to completion/failure events.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkerEvent> {
        self.events.subscribe()
    }

    /// Process jobs until the queue closes or shutdown flips. An
    /// in-flight job always runs to completion.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("Scan worker started");
        loop {
            let queued = tokio::select! {
                queued = self.queue.next_job() => queued,
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            };

            let Some(queued) = queued else { break };
            self.process(queued).await;

            if *shutdown.borrow() {
                break;
            }
        }
        info!("Scan worker stopped");
    }

    async fn process(&self, queued: QueuedJob) {
        let id = queued.id;
        let pair = queued.job.pair_key();
        debug!("Processing job {} ({}), attempt {}", id, pair, queued.attempt + 1);

        let queue = Arc::clone(&self.queue);
        let result = self
            .orchestrator
            .run_scan(&queued.job, move |percent| {
                queue.report_progress(id, percent)
            })
            .await;

        match result {
            Ok(summary) => {
                info!(
                    "Job {} ({}) completed: {} opportunities in {} ms",
                    id,
                    pair,
                    summary.opportunities.len(),
                    summary.duration_ms
                );
                self.queue.finish_success(id);
                let _ = self.events.send(WorkerEvent::Completed { id, summary });
            }
            Err(error) => {
                // Full kind (with any offending payload) for diagnosis
                debug!("Job {} error detail: {:?}", id, error);
                let attempt = queued.attempt + 1;
                if attempt < self.config.max_attempts {
                    let delay = self.config.backoff_initial
                        * 2u32.saturating_pow(attempt.saturating_sub(1));
                    warn!(
                        "Job {} ({}) attempt {} failed: {}; retrying in {:?}",
                        id, pair, attempt, error, delay
                    );
                    self.queue.retry_later(
                        QueuedJob {
                            id,
                            job: queued.job,
                            attempt,
                        },
                        delay,
                    );
                } else {
                    warn!(
                        "Job {} ({}) failed after {} attempts: {}",
                        id, pair, attempt, error
                    );
                    self.queue.finish_failure(id, error.to_string());
                    let _ = self.events.send(WorkerEvent::Failed {
                        id,
                        reason: error.to_string(),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(a: Platform, b: Platform) -> ScanJob {
        ScanJob::new(a, b, 50)
    }

    #[test]
    fn test_pair_key() {
        assert_eq!(job(Platform::Polymarket, Platform::Manifold).pair_key(), "PM:MAN");
        assert_eq!(job(Platform::Kalshi, Platform::Polymarket).pair_key(), "KAL:PM");
    }

    #[tokio::test]
    async fn test_enqueue_and_next_job() {
        let queue = ScanQueue::new();
        let handle = queue.enqueue(job(Platform::Polymarket, Platform::Manifold));

        let queued = queue.next_job().await.unwrap();
        assert_eq!(queued.id, handle.id);
        assert_eq!(queued.attempt, 0);
        assert_eq!(queue.stats().active, 1);

        queue.finish_success(queued.id);
        let stats = queue.stats();
        assert_eq!(stats.active, 0);
        assert_eq!(stats.completed, 1);
    }

    #[tokio::test]
    async fn test_recurring_enrolment_replaces_pair() {
        let queue = ScanQueue::new();
        queue.enqueue_recurring(job(Platform::Polymarket, Platform::Manifold), Duration::from_secs(60));
        queue.enqueue_recurring(job(Platform::Polymarket, Platform::Manifold), Duration::from_secs(30));

        // One immediate firing despite two enrolments for the same pair.
        let first = queue.next_job().await.unwrap();
        queue.finish_success(first.id);

        let stats = queue.stats();
        assert_eq!(stats.waiting, 0);
        assert_eq!(stats.completed, 1);
    }

    #[tokio::test]
    async fn test_recurring_fires_again_after_interval() {
        let queue = ScanQueue::new();
        queue.enqueue_recurring(
            job(Platform::Kalshi, Platform::Polymarket),
            Duration::from_millis(30),
        );

        let first = queue.next_job().await.unwrap();
        queue.finish_success(first.id);

        let second = queue.next_job().await.unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(second.job.pair_key(), "KAL:PM");
        queue.finish_success(second.id);
    }

    #[tokio::test]
    async fn test_retry_later_delays_redelivery() {
        let queue = ScanQueue::new();
        queue.enqueue(job(Platform::Polymarket, Platform::Kalshi));

        let queued = queue.next_job().await.unwrap();
        queue.retry_later(
            QueuedJob {
                id: queued.id,
                job: queued.job.clone(),
                attempt: 1,
            },
            Duration::from_millis(40),
        );
        assert_eq!(queue.stats().delayed, 1);

        let start = Instant::now();
        let retried = queue.next_job().await.unwrap();
        assert_eq!(retried.id, queued.id);
        assert_eq!(retried.attempt, 1);
        assert!(start.elapsed() >= Duration::from_millis(35));
    }

    #[tokio::test]
    async fn test_close_stops_dispatch() {
        let queue = ScanQueue::new();
        queue.enqueue(job(Platform::Polymarket, Platform::Manifold));
        queue.close();

        assert!(queue.next_job().await.is_none());
    }

    #[tokio::test]
    async fn test_failed_retention_cap() {
        let queue = ScanQueue::new();
        for _ in 0..(FAILED_RETENTION_COUNT + 10) {
            let handle = queue.enqueue(job(Platform::Polymarket, Platform::Manifold));
            let queued = queue.next_job().await.unwrap();
            assert_eq!(queued.id, handle.id);
            queue.finish_failure(queued.id, "boom".to_string());
        }
        assert_eq!(queue.stats().failed, FAILED_RETENTION_COUNT);
    }

    #[tokio::test]
    async fn test_progress_reporting() {
        let queue = ScanQueue::new();
        queue.enqueue(job(Platform::Polymarket, Platform::Manifold));
        let queued = queue.next_job().await.unwrap();

        for checkpoint in [10u8, 40, 70, 90, 100] {
            queue.report_progress(queued.id, checkpoint);
            assert_eq!(queue.active_progress(), Some((queued.id, checkpoint)));
        }
        queue.finish_success(queued.id);
        assert_eq!(queue.active_progress(), None);
    }
}
