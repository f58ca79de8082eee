//! Bounded Async Queue
//!
//! ## Overview
//!
//! Multi-producer / multi-consumer FIFO with a fixed capacity. It is the
//! only state shared between pipeline stages and carries backpressure
//! upstream:
//!
//! ```text
//! producer ──write──► [ ■ ■ ■ ■ □ □ ] ──recv/read──► consumer
//!    ▲  suspends while full      suspends while empty  │
//!    └──────────── resumes on space / close ───────────┘
//! ```
//!
//! ## Semantics
//!
//! - `write` suspends while the queue is full and fails with
//!   `ClosedQueueError` once the queue is closed
//! - `recv` suspends while the queue is empty and returns `None` once the
//!   queue is closed *and* drained
//! - `read` returns a fresh `Stream` over `recv`; every consumer can take
//!   its own
//! - FIFO order holds within one queue; items are never duplicated
//!
//! ## Wake-ups
//!
//! Waiters register with a `Notify` before inspecting the state, so a wake
//! sent between the check and the `.await` is never lost. `close()` wakes
//! every waiter on both sides.
//!
//! ## Registry
//!
//! `QueueRegistry` hands out one shared instance per name, creating it on
//! first lookup.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::Stream;
use serde::Serialize;
use tokio::sync::Notify;

use crate::errors::ClosedQueueError;

/// Queue statistics
///
/// Updated with relaxed atomics; a snapshot is consistent per counter only.
#[derive(Debug, Default)]
pub struct QueueStats {
    written: AtomicU64,
    read: AtomicU64,
    waited: AtomicU64,
    high_water: AtomicU64,
}

/// Point-in-time copy of `QueueStats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStatsSnapshot {
    /// Items accepted by `write`
    pub written: u64,
    /// Items handed out by `recv`
    pub read: u64,
    /// Writes that found the queue full and had to wait
    pub waited: u64,
    /// Largest depth observed
    pub high_water: u64,
}

impl QueueStats {
    fn record_write(&self, depth: usize, waited: bool) {
        self.written.fetch_add(1, Ordering::Relaxed);
        if waited {
            self.waited.fetch_add(1, Ordering::Relaxed);
        }
        self.high_water.fetch_max(depth as u64, Ordering::Relaxed);
    }

    fn record_read(&self) {
        self.read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> QueueStatsSnapshot {
        QueueStatsSnapshot {
            written: self.written.load(Ordering::Relaxed),
            read: self.read.load(Ordering::Relaxed),
            waited: self.waited.load(Ordering::Relaxed),
            high_water: self.high_water.load(Ordering::Relaxed),
        }
    }
}

struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Fixed-capacity async FIFO
pub struct BoundedQueue<T> {
    name: String,
    capacity: usize,
    state: Mutex<QueueState<T>>,
    not_empty: Notify,
    not_full: Notify,
    stats: QueueStats,
}

impl<T> BoundedQueue<T> {
    /// Create a queue; capacity is at least 1
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            name: name.into(),
            capacity,
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            not_empty: Notify::new(),
            not_full: Notify::new(),
            stats: QueueStats::default(),
        }
    }

    /// Append an item, waiting while the queue is full
    pub async fn write(&self, item: T) -> Result<(), ClosedQueueError> {
        let mut waited = false;

        loop {
            let notified = self.not_full.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if state.closed {
                    return Err(ClosedQueueError::new(self.name.as_str()));
                }
                if state.items.len() < self.capacity {
                    state.items.push_back(item);
                    let depth = state.items.len();
                    drop(state);

                    self.stats.record_write(depth, waited);
                    self.not_empty.notify_one();
                    return Ok(());
                }
            }

            if !waited {
                log::trace!("queue {}: full at {}, writer waiting", self.name, self.capacity);
            }
            waited = true;
            notified.await;
        }
    }

    /// Append an item without waiting; hands the item back if full or closed
    pub fn try_write(&self, item: T) -> Result<(), T> {
        let mut state = self.lock();
        if state.closed || state.items.len() >= self.capacity {
            return Err(item);
        }
        state.items.push_back(item);
        let depth = state.items.len();
        drop(state);

        self.stats.record_write(depth, false);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Take the oldest item, waiting while the queue is empty
    ///
    /// Returns `None` once the queue is closed and drained.
    pub async fn recv(&self) -> Option<T> {
        loop {
            let notified = self.not_empty.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if let Some(item) = state.items.pop_front() {
                    drop(state);

                    self.stats.record_read();
                    self.not_full.notify_one();
                    return Some(item);
                }
                if state.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Stop accepting writes; buffered items stay readable
    pub fn close(&self) {
        let mut state = self.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        drop(state);

        log::debug!("queue {}: closed", self.name);
        self.not_empty.notify_waiters();
        self.not_full.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Items currently buffered
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stats(&self) -> QueueStatsSnapshot {
        self.stats.snapshot()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T: Send + 'static> BoundedQueue<T> {
    /// Lazy stream of items for one consumer; ends when closed and drained
    pub fn read(self: &Arc<Self>) -> impl Stream<Item = T> + Send + 'static {
        futures::stream::unfold(Arc::clone(self), |queue| async move {
            let item = queue.recv().await?;
            Some((item, queue))
        })
    }
}

/// Named queues, one shared instance per name
pub struct QueueRegistry<T> {
    default_capacity: usize,
    queues: Mutex<HashMap<String, Arc<BoundedQueue<T>>>>,
}

impl<T> QueueRegistry<T> {
    pub fn new(default_capacity: usize) -> Self {
        Self {
            default_capacity,
            queues: Mutex::new(HashMap::new()),
        }
    }

    /// Queue for `name`, created with the default capacity on first lookup
    pub fn get(&self, name: &str) -> Arc<BoundedQueue<T>> {
        self.get_with_capacity(name, self.default_capacity)
    }

    /// Queue for `name`; `capacity` only applies if the queue is created now
    pub fn get_with_capacity(&self, name: &str, capacity: usize) -> Arc<BoundedQueue<T>> {
        let mut queues = self.lock();
        let queue = queues
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(BoundedQueue::new(name, capacity)));
        Arc::clone(queue)
    }

    /// Names of the created queues, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Close every queue created so far
    pub fn close_all(&self) {
        for queue in self.lock().values() {
            queue.close();
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<BoundedQueue<T>>>> {
        self.queues.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn fifo_order() {
        let queue = BoundedQueue::new("q", 8);
        for i in 0..5 {
            queue.write(i).await.unwrap();
        }
        for i in 0..5 {
            assert_eq!(queue.recv().await, Some(i));
        }
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn write_after_close_fails() {
        let queue = BoundedQueue::new("ingest", 2);
        queue.write(1).await.unwrap();
        queue.close();

        assert_eq!(queue.write(2).await, Err(ClosedQueueError::new("ingest")));
        assert_eq!(queue.try_write(3), Err(3));
        assert_eq!(queue.recv().await, Some(1));
        assert_eq!(queue.recv().await, None);
    }

    #[tokio::test]
    async fn close_wakes_waiting_reader() {
        let queue: Arc<BoundedQueue<u32>> = Arc::new(BoundedQueue::new("q", 1));
        let reader = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.recv().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.close();

        let result = timeout(Duration::from_secs(1), reader).await.unwrap().unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn close_wakes_blocked_writer() {
        let queue = Arc::new(BoundedQueue::new("q", 1));
        queue.write(1).await.unwrap();

        let writer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.write(2).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.close();

        let result = timeout(Duration::from_secs(1), writer).await.unwrap().unwrap();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn stream_drains_then_ends() {
        let queue = Arc::new(BoundedQueue::new("q", 4));
        queue.write("a").await.unwrap();
        queue.write("b").await.unwrap();
        queue.close();

        let items: Vec<&str> = queue.read().collect().await;
        assert_eq!(items, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn stats_track_flow() {
        let queue = BoundedQueue::new("q", 3);
        for i in 0..3 {
            queue.write(i).await.unwrap();
        }
        queue.recv().await;

        let stats = queue.stats();
        assert_eq!(stats.written, 3);
        assert_eq!(stats.read, 1);
        assert_eq!(stats.high_water, 3);
        assert_eq!(stats.waited, 0);
    }

    #[test]
    fn registry_reuses_instances() {
        let registry: QueueRegistry<u8> = QueueRegistry::new(10);
        let a = registry.get("ingest");
        let b = registry.get("ingest");
        let c = registry.get_with_capacity("processed", 2);

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.capacity(), 10);
        assert_eq!(c.capacity(), 2);
        assert_eq!(registry.get_with_capacity("processed", 99).capacity(), 2);
        assert_eq!(registry.names(), vec!["ingest".to_string(), "processed".to_string()]);

        registry.close_all();
        assert!(a.is_closed());
        assert!(c.is_closed());
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let queue: BoundedQueue<u8> = BoundedQueue::new("q", 0);
        assert_eq!(queue.capacity(), 1);
    }
}
