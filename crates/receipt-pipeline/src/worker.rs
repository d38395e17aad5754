//! # Receipt Workers
//!
//! Background tasks that move entries from the work queue into the store.
//!
//! ## Worker Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         ReceiptWorker::run                              │
//! │                                                                         │
//! │  while no shutdown {                                                   │
//! │    queue.try_dequeue(poll_interval)                                    │
//! │                                                                         │
//! │    Some(entry) ──► store.put(id, receipt)                              │
//! │                      ├── ok ───────────────────────► Stored            │
//! │                      └── err, retry with backoff                       │
//! │                            up to max_put_attempts                      │
//! │                            ├── shutdown ───────────► requeued          │
//! │                            ├── dead letter ────────► dead_letter       │
//! │                            └── otherwise ──────────► Lost (logged)     │
//! │    None ──► poll again                                                 │
//! │                                                                         │
//! │    Err(QueueUnavailable) ──► sleep(backoff) or shutdown                │
//! │  }                                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A pop is never cancelled mid-flight: shutdown is only observed between
//! bounded polls and during sleeps.
//!
//! ## Pool
//! [`WorkerPool`] runs `worker.count` workers over the same backends. The
//! queue hands each entry to exactly one of them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use receipt_core::{QueueEntry, SubmissionState};
use receipt_store::{ReceiptStore, StoreError, WorkQueue};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::backends::Backends;
use crate::config::WorkerSettings;
use crate::error::{PipelineError, PipelineResult};

// =============================================================================
// Statistics
// =============================================================================

/// Counters for one worker, shared with its handle.
#[derive(Debug, Default)]
pub struct WorkerStats {
    stored: AtomicU64,
    lost: AtomicU64,
    dead_lettered: AtomicU64,
}

impl WorkerStats {
    pub fn stored(&self) -> u64 {
        self.stored.load(Ordering::Relaxed)
    }

    pub fn lost(&self) -> u64 {
        self.lost.load(Ordering::Relaxed)
    }

    pub fn dead_lettered(&self) -> u64 {
        self.dead_lettered.load(Ordering::Relaxed)
    }
}

// =============================================================================
// Receipt Worker
// =============================================================================

/// Moves entries from the work queue into the receipt store.
pub struct ReceiptWorker {
    /// Index within the pool, for logs.
    index: usize,

    queue: Arc<dyn WorkQueue>,
    store: Arc<dyn ReceiptStore>,
    dead_letter: Option<Arc<dyn WorkQueue>>,

    settings: WorkerSettings,
    stats: Arc<WorkerStats>,

    /// Shutdown receiver.
    shutdown_rx: mpsc::Receiver<()>,

    /// Set once shutdown has been observed.
    stopping: bool,
}

/// Handle for controlling a running worker.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    /// Shutdown sender.
    shutdown_tx: mpsc::Sender<()>,

    stats: Arc<WorkerStats>,
}

impl WorkerHandle {
    /// Triggers graceful shutdown. An entry in hand is stored, or put back on
    /// the queue if its store retries are still pending.
    pub async fn shutdown(&self) -> PipelineResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| PipelineError::ChannelError("Shutdown channel closed".into()))
    }

    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }
}

impl ReceiptWorker {
    /// Creates a worker over `backends` and returns its handle.
    pub fn new(index: usize, backends: &Backends, settings: WorkerSettings) -> (Self, WorkerHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let stats = Arc::new(WorkerStats::default());

        let worker = ReceiptWorker {
            index,
            queue: backends.queue.clone(),
            store: backends.store.clone(),
            dead_letter: backends.dead_letter.clone(),
            settings,
            stats: stats.clone(),
            shutdown_rx,
            stopping: false,
        };

        let handle = WorkerHandle { shutdown_tx, stats };

        (worker, handle)
    }

    /// Runs the worker loop until shutdown is requested.
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        info!(worker = self.index, queue = %self.queue.name(), "Receipt worker starting");

        let mut backoff = self.create_backoff();
        let poll = self.settings.poll_interval();

        while !self.shutdown_requested() {
            match self.queue.try_dequeue(poll).await {
                Ok(polled) => {
                    backoff.reset();
                    if let Some(entry) = polled {
                        let id = entry.id;
                        let state = self.process(entry).await;
                        debug!(worker = self.index, id = %id, state = %state, "Entry processed");
                    }
                }
                Err(StoreError::Serialization(e)) => {
                    error!(worker = self.index, error = %e, "Dropping undecodable queue entry");
                }
                Err(e) => {
                    let delay = backoff.next_backoff().unwrap_or(self.settings.max_backoff());
                    warn!(
                        worker = self.index,
                        ?e,
                        delay_ms = delay.as_millis() as u64,
                        "Queue unavailable, backing off"
                    );
                    self.pause(delay).await;
                }
            }
        }

        info!(
            worker = self.index,
            stored = self.stats.stored(),
            lost = self.stats.lost(),
            dead_lettered = self.stats.dead_lettered(),
            "Receipt worker stopped"
        );
    }

    /// Polls the shutdown channel without waiting. A dropped handle counts
    /// as shutdown.
    fn shutdown_requested(&mut self) -> bool {
        if !self.stopping {
            self.stopping = match self.shutdown_rx.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => true,
                Err(TryRecvError::Empty) => false,
            };
            if self.stopping {
                info!(worker = self.index, "Receipt worker shutting down");
            }
        }
        self.stopping
    }

    /// Sleeps for `delay`. Returns `false` if shutdown arrived first.
    async fn pause(&mut self, delay: Duration) -> bool {
        if self.stopping {
            return false;
        }

        tokio::select! {
            biased;
            _ = self.shutdown_rx.recv() => {
                info!(worker = self.index, "Receipt worker shutting down");
                self.stopping = true;
                false
            }
            _ = tokio::time::sleep(delay) => true,
        }
    }

    /// Stores one entry, retrying transient failures.
    async fn process(&mut self, entry: QueueEntry) -> SubmissionState {
        let mut backoff = self.create_backoff();
        let mut attempt = 1;

        loop {
            match self.store.put(entry.id, &entry.receipt).await {
                Ok(()) => {
                    self.stats.stored.fetch_add(1, Ordering::Relaxed);
                    info!(
                        worker = self.index,
                        id = %entry.id,
                        state = %SubmissionState::Stored,
                        "Receipt stored"
                    );
                    return SubmissionState::Stored;
                }
                Err(e) if e.is_retryable() && attempt < self.settings.max_put_attempts => {
                    let delay = backoff.next_backoff().unwrap_or(self.settings.max_backoff());
                    warn!(
                        worker = self.index,
                        id = %entry.id,
                        attempt,
                        ?e,
                        "Failed to store receipt, retrying"
                    );
                    if !self.pause(delay).await {
                        return self.requeue(entry).await;
                    }
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        worker = self.index,
                        id = %entry.id,
                        attempts = attempt,
                        ?e,
                        "Giving up on storing receipt"
                    );
                    return self.give_up(entry).await;
                }
            }
        }
    }

    /// Returns an entry to the work queue after shutdown cut its retries short.
    async fn requeue(&self, entry: QueueEntry) -> SubmissionState {
        let id = entry.id;

        match self.queue.enqueue(entry.clone()).await {
            Ok(()) => {
                info!(
                    worker = self.index,
                    id = %id,
                    state = %SubmissionState::Queued,
                    "Receipt requeued on shutdown"
                );
                SubmissionState::Queued
            }
            Err(e) => {
                error!(worker = self.index, id = %id, ?e, "Requeue on shutdown failed");
                self.give_up(entry).await
            }
        }
    }

    /// Routes an entry that could not be stored.
    async fn give_up(&self, entry: QueueEntry) -> SubmissionState {
        let id = entry.id;

        if let Some(dead_letter) = &self.dead_letter {
            match dead_letter.enqueue(entry).await {
                Ok(()) => {
                    self.stats.dead_lettered.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        worker = self.index,
                        id = %id,
                        queue = %dead_letter.name(),
                        "Receipt moved to dead-letter queue"
                    );
                    return SubmissionState::Lost;
                }
                Err(e) => {
                    error!(worker = self.index, id = %id, ?e, "Dead-letter enqueue failed");
                }
            }
        }

        self.stats.lost.fetch_add(1, Ordering::Relaxed);
        error!(
            worker = self.index,
            id = %id,
            state = %SubmissionState::Lost,
            "Receipt lost"
        );
        SubmissionState::Lost
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.settings.initial_backoff(),
            initial_interval: self.settings.initial_backoff(),
            max_interval: self.settings.max_backoff(),
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

// =============================================================================
// Worker Pool
// =============================================================================

/// A set of spawned workers sharing one queue and one store.
#[derive(Debug)]
pub struct WorkerPool {
    handles: Vec<WorkerHandle>,
    tasks: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `settings.count` workers on the current tokio runtime.
    pub fn spawn(backends: &Backends, settings: &WorkerSettings) -> Self {
        let mut handles = Vec::with_capacity(settings.count);
        let mut tasks = Vec::with_capacity(settings.count);

        for index in 0..settings.count {
            let (worker, handle) = ReceiptWorker::new(index, backends, settings.clone());
            tasks.push(tokio::spawn(worker.run()));
            handles.push(handle);
        }

        info!(workers = settings.count, "Worker pool started");
        WorkerPool { handles, tasks }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn stored(&self) -> u64 {
        self.handles.iter().map(|h| h.stats().stored()).sum()
    }

    pub fn lost(&self) -> u64 {
        self.handles.iter().map(|h| h.stats().lost()).sum()
    }

    pub fn dead_lettered(&self) -> u64 {
        self.handles.iter().map(|h| h.stats().dead_lettered()).sum()
    }

    /// Signals every worker and waits for all of them to stop.
    pub async fn shutdown(self) {
        for handle in &self.handles {
            if let Err(e) = handle.shutdown().await {
                debug!(?e, "Worker already stopped");
            }
        }

        for task in self.tasks {
            if let Err(e) = task.await {
                error!(?e, "Worker task panicked");
            }
        }

        info!("Worker pool stopped");
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    use async_trait::async_trait;
    use receipt_core::{Receipt, ReceiptId};
    use receipt_store::{MemoryQueue, MemoryStore, StoreResult};

    use crate::config::PipelineConfig;

    fn receipt() -> Receipt {
        serde_json::from_str(
            r#"{
                "retailer": "Walgreens",
                "purchaseDate": "2022-01-02",
                "purchaseTime": "08:13",
                "total": "2.65",
                "items": [
                    {"shortDescription": "Pepsi - 12-oz", "price": "1.25"},
                    {"shortDescription": "Dasani", "price": "1.40"}
                ]
            }"#,
        )
        .unwrap()
    }

    fn fast_settings() -> WorkerSettings {
        WorkerSettings {
            count: 1,
            initial_backoff_ms: 1,
            max_backoff_secs: 1,
            max_put_attempts: 3,
            poll_interval_ms: 10,
        }
    }

    /// Slow enough that a test finishes long before a backoff sleep does.
    fn slow_backoff_settings() -> WorkerSettings {
        WorkerSettings {
            initial_backoff_ms: 30_000,
            max_backoff_secs: 60,
            max_put_attempts: 5,
            ..fast_settings()
        }
    }

    /// Store that fails the first `failures` puts, then delegates.
    #[derive(Debug)]
    struct FlakyStore {
        failures: u32,
        calls: AtomicU32,
        inner: MemoryStore,
    }

    impl FlakyStore {
        fn new(failures: u32) -> Self {
            FlakyStore {
                failures,
                calls: AtomicU32::new(0),
                inner: MemoryStore::new("flaky"),
            }
        }
    }

    #[async_trait]
    impl ReceiptStore for FlakyStore {
        async fn put(&self, id: ReceiptId, receipt: &Receipt) -> StoreResult<()> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(StoreError::store("connection reset"));
            }
            self.inner.put(id, receipt).await
        }

        async fn get(&self, id: &ReceiptId) -> StoreResult<Receipt> {
            self.inner.get(id).await
        }
    }

    /// Queue whose first `failures` polls fail, then delegates.
    #[derive(Debug)]
    struct FailingQueue {
        failures: u32,
        calls: AtomicU32,
        inner: MemoryQueue,
    }

    impl FailingQueue {
        fn new(failures: u32) -> Self {
            FailingQueue {
                failures,
                calls: AtomicU32::new(0),
                inner: MemoryQueue::new("failing"),
            }
        }

        fn check(&self) -> StoreResult<()> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(StoreError::queue("connection refused"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl WorkQueue for FailingQueue {
        fn name(&self) -> &str {
            self.inner.name()
        }

        async fn enqueue(&self, entry: QueueEntry) -> StoreResult<()> {
            self.inner.enqueue(entry).await
        }

        async fn dequeue(&self) -> StoreResult<QueueEntry> {
            self.check()?;
            self.inner.dequeue().await
        }

        async fn try_dequeue(&self, wait: Duration) -> StoreResult<Option<QueueEntry>> {
            self.check()?;
            self.inner.try_dequeue(wait).await
        }
    }

    fn backends_with(store: Arc<dyn ReceiptStore>, dead_letter: bool) -> Backends {
        Backends {
            queue: Arc::new(MemoryQueue::new("test_queue")),
            store,
            dead_letter: dead_letter
                .then(|| Arc::new(MemoryQueue::new("test_dead")) as Arc<dyn WorkQueue>),
        }
    }

    async fn wait_for(pred: impl Fn() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !pred() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_worker_stores_dequeued_entries() {
        let store = Arc::new(MemoryStore::new("test_receipts"));
        let backends = backends_with(store.clone(), false);
        let (worker, handle) = ReceiptWorker::new(0, &backends, fast_settings());
        let task = tokio::spawn(worker.run());

        let id = ReceiptId::new();
        backends.queue.enqueue(QueueEntry::new(id, receipt())).await.unwrap();

        wait_for(|| handle.stats().stored() == 1).await;
        assert_eq!(store.get(&id).await.unwrap(), receipt());

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_while_idle() {
        let backends = Backends::in_memory(&PipelineConfig::default());
        let (worker, handle) = ReceiptWorker::new(0, &backends, fast_settings());
        let task = tokio::spawn(worker.run());

        handle.shutdown().await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(handle.stats().stored(), 0);
    }

    #[tokio::test]
    async fn test_transient_put_failures_are_retried() {
        let store = Arc::new(FlakyStore::new(2));
        let backends = backends_with(store.clone(), false);
        let (worker, handle) = ReceiptWorker::new(0, &backends, fast_settings());
        let task = tokio::spawn(worker.run());

        let id = ReceiptId::new();
        backends.queue.enqueue(QueueEntry::new(id, receipt())).await.unwrap();

        wait_for(|| handle.stats().stored() == 1).await;
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
        assert_eq!(handle.stats().lost(), 0);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_exhausted_retries_go_to_dead_letter() {
        let store = Arc::new(FlakyStore::new(u32::MAX));
        let backends = backends_with(store.clone(), true);
        let (worker, handle) = ReceiptWorker::new(0, &backends, fast_settings());
        let task = tokio::spawn(worker.run());

        let id = ReceiptId::new();
        backends.queue.enqueue(QueueEntry::new(id, receipt())).await.unwrap();

        wait_for(|| handle.stats().dead_lettered() == 1).await;
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
        assert_eq!(handle.stats().lost(), 0);

        let dead = backends.dead_letter.as_ref().unwrap().dequeue().await.unwrap();
        assert_eq!(dead.id, id);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_exhausted_retries_without_dead_letter_are_lost() {
        let backends = backends_with(Arc::new(FlakyStore::new(u32::MAX)), false);
        let (worker, handle) = ReceiptWorker::new(0, &backends, fast_settings());
        let task = tokio::spawn(worker.run());

        backends
            .queue
            .enqueue(QueueEntry::new(ReceiptId::new(), receipt()))
            .await
            .unwrap();

        wait_for(|| handle.stats().lost() == 1).await;
        assert_eq!(handle.stats().stored(), 0);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_pool_stores_every_entry_once() {
        let mut config = PipelineConfig::default();
        config.worker = WorkerSettings {
            count: 4,
            ..fast_settings()
        };
        let backends = Backends::in_memory(&config);
        let pool = WorkerPool::spawn(&backends, &config.worker);
        assert_eq!(pool.len(), 4);

        let mut ids = Vec::new();
        for _ in 0..40 {
            let id = ReceiptId::new();
            ids.push(id);
            backends.queue.enqueue(QueueEntry::new(id, receipt())).await.unwrap();
        }

        wait_for(|| pool.stored() == 40).await;
        for id in &ids {
            assert!(backends.store.get(id).await.is_ok());
        }
        assert_eq!(pool.lost(), 0);

        pool.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_outage_backs_off_then_recovers() {
        let queue = Arc::new(FailingQueue::new(4));
        let store = Arc::new(MemoryStore::new("test_receipts"));
        let backends = Backends {
            queue: queue.clone(),
            store: store.clone(),
            dead_letter: None,
        };
        let settings = WorkerSettings {
            initial_backoff_ms: 50,
            max_backoff_secs: 1,
            ..fast_settings()
        };

        let id = ReceiptId::new();
        queue.enqueue(QueueEntry::new(id, receipt())).await.unwrap();

        let (worker, handle) = ReceiptWorker::new(0, &backends, settings);
        let task = tokio::spawn(worker.run());

        wait_for(|| handle.stats().stored() == 1).await;
        assert!(queue.calls.load(Ordering::SeqCst) > 4);
        assert_eq!(store.get(&id).await.unwrap(), receipt());

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_queue_backoff() {
        let queue = Arc::new(FailingQueue::new(u32::MAX));
        let backends = Backends {
            queue: queue.clone(),
            store: Arc::new(MemoryStore::new("test_receipts")),
            dead_letter: None,
        };
        let (worker, handle) = ReceiptWorker::new(0, &backends, slow_backoff_settings());
        let task = tokio::spawn(worker.run());

        wait_for(|| queue.calls.load(Ordering::SeqCst) >= 1).await;
        handle.shutdown().await.unwrap();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(queue.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_during_put_retries_requeues_entry() {
        let store = Arc::new(FlakyStore::new(u32::MAX));
        let backends = backends_with(store.clone(), true);
        let (worker, handle) = ReceiptWorker::new(0, &backends, slow_backoff_settings());
        let task = tokio::spawn(worker.run());

        let id = ReceiptId::new();
        backends.queue.enqueue(QueueEntry::new(id, receipt())).await.unwrap();

        wait_for(|| store.calls.load(Ordering::SeqCst) >= 1).await;
        handle.shutdown().await.unwrap();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();

        let requeued = backends
            .queue
            .try_dequeue(Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(requeued.map(|e| e.id), Some(id));
        assert_eq!(handle.stats().lost(), 0);
        assert_eq!(handle.stats().dead_lettered(), 0);
    }

    #[test]
    fn test_backoff_follows_settings() {
        let backends = backends_with(Arc::new(MemoryStore::new("x")), false);
        let settings = WorkerSettings {
            initial_backoff_ms: 250,
            max_backoff_secs: 10,
            ..WorkerSettings::default()
        };
        let (worker, _handle) = ReceiptWorker::new(0, &backends, settings);

        let mut backoff = worker.create_backoff();
        assert_eq!(backoff.initial_interval, Duration::from_millis(250));
        assert_eq!(backoff.max_interval, Duration::from_secs(10));
        assert_eq!(backoff.max_elapsed_time, None);

        // Randomization is +/-50% around the current interval.
        let first = backoff.next_backoff().unwrap();
        assert!(first <= Duration::from_millis(375), "first delay {first:?}");
    }

    #[test]
    fn test_first_backoff_uses_small_initial_interval() {
        let backends = backends_with(Arc::new(MemoryStore::new("x")), false);
        let settings = WorkerSettings {
            initial_backoff_ms: 1,
            ..WorkerSettings::default()
        };
        let (worker, _handle) = ReceiptWorker::new(0, &backends, settings);

        let mut backoff = worker.create_backoff();
        let first = backoff.next_backoff().unwrap();
        let second = backoff.next_backoff().unwrap();
        assert!(first <= Duration::from_micros(1_500), "first delay {first:?}");
        assert!(second <= Duration::from_millis(3), "second delay {second:?}");
    }
}
