//! Bounded drop-oldest sample queue
//!
//! 基于 crossbeam `ArrayQueue` 的无锁定长队列。满时 `force_push`
//! 原子地淘汰最旧样本再插入最新样本，producer 永不阻塞、永不失败。

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::queue::ArrayQueue;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

use crate::BrokerError;

/// Result of handing a sample to a queue or broker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushOutcome {
    /// Stored, nothing evicted
    Stored,
    /// Stored, the oldest queued sample was evicted to make room
    Dropped,
    /// Not stored: no session is attached (or the channel is unavailable)
    Discarded,
}

/// Validated queue capacity of a streaming session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QueueSize(u32);

impl QueueSize {
    /// 请求未指定时的容量
    pub const DEFAULT: QueueSize = QueueSize(100);
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 100_000;

    /// Validate a requested capacity
    ///
    /// # Errors
    /// `InvalidQueueSize` when `requested` is outside `[1, 100000]`
    pub fn new(requested: u32) -> Result<Self, BrokerError> {
        if (Self::MIN..=Self::MAX).contains(&requested) {
            Ok(Self(requested))
        } else {
            Err(BrokerError::InvalidQueueSize { requested })
        }
    }

    /// Capacity from an optional request parameter; absent ⇒ default
    pub fn from_request(requested: Option<u32>) -> Result<Self, BrokerError> {
        requested.map_or(Ok(Self::DEFAULT), Self::new)
    }

    /// Like [`QueueSize::from_request`] with a caller supplied default
    pub fn from_request_or(requested: Option<u32>, default: QueueSize) -> Result<Self, BrokerError> {
        requested.map_or(Ok(default), Self::new)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for QueueSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for QueueSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed-capacity FIFO with drop-oldest overflow
///
/// Single producer / single consumer per instance: the broker hands one
/// instance to exactly one session and pushes from the producer side only.
pub struct BoundedSampleQueue<S> {
    buffer: ArrayQueue<S>,
    notify: Notify,
    pushed: AtomicU64,
    dropped: AtomicU64,
}

impl<S> BoundedSampleQueue<S> {
    /// Create an empty queue
    pub fn new(capacity: QueueSize) -> Self {
        Self {
            buffer: ArrayQueue::new(capacity.get() as usize),
            notify: Notify::new(),
            pushed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Append a sample, evicting the oldest one when full
    ///
    /// Never blocks. Wakes a consumer waiting in [`Self::notified`].
    pub fn push(&self, sample: S) -> PushOutcome {
        let evicted = self.buffer.force_push(sample);
        self.pushed.fetch_add(1, Ordering::Relaxed);
        // notify_one 在无等待者时保存一个 permit，不会丢失唤醒
        self.notify.notify_one();

        if evicted.is_some() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            PushOutcome::Dropped
        } else {
            PushOutcome::Stored
        }
    }

    /// Oldest sample, or `None` when empty
    pub fn pop_front(&self) -> Option<S> {
        self.buffer.pop()
    }

    /// Wait until a push happens
    ///
    /// Returns immediately if a push occurred since the last wait.
    pub async fn notified(&self) {
        self.notify.notified().await;
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.buffer.is_full()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Samples pushed over the queue's lifetime
    pub fn pushed_count(&self) -> u64 {
        self.pushed.load(Ordering::Relaxed)
    }

    /// Samples evicted by overflow over the queue's lifetime
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl<S> fmt::Debug for BoundedSampleQueue<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedSampleQueue")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("pushed", &self.pushed_count())
            .field("dropped", &self.dropped_count())
            .finish()
    }
}
