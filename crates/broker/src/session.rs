//! Stream session guard
//!
//! 每个通道一个 guard：记录是否被占用、占用者 token 以及该 session 的队列。
//! attach 是一次写锁内的 check-and-set；producer 的 push 只拿读锁。

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use contracts::ChannelKind;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::queue::{BoundedSampleQueue, PushOutcome, QueueSize};
use crate::BrokerError;

/// Identity token of one attached consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(u64);

impl SessionId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Occupant<S> {
    id: SessionId,
    queue: Arc<BoundedSampleQueue<S>>,
}

/// At-most-one-consumer guard of a streaming channel
///
/// Idle ⇄ Active. A second activation while Active is rejected, never queued.
pub struct SessionGuard<S> {
    channel: ChannelKind,
    active: RwLock<Option<Occupant<S>>>,
    next_id: AtomicU64,
}

impl<S> SessionGuard<S> {
    pub fn new(channel: ChannelKind) -> Self {
        Self {
            channel,
            active: RwLock::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Idle → Active with a fresh queue of `size`
    ///
    /// # Errors
    /// `AlreadyStreaming` if a session is active; the active session is untouched.
    pub fn try_activate(
        &self,
        size: QueueSize,
    ) -> Result<(SessionId, Arc<BoundedSampleQueue<S>>), BrokerError> {
        // 先读锁快速拒绝，避免为注定失败的请求分配队列
        if let Some(session) = self.active.read().as_ref() {
            return Err(self.busy(session.id));
        }

        let queue = Arc::new(BoundedSampleQueue::new(size));

        let mut active = self.active.write();
        if let Some(session) = active.as_ref() {
            return Err(self.busy(session.id));
        }
        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        *active = Some(Occupant {
            id,
            queue: queue.clone(),
        });
        Ok((id, queue))
    }

    /// Active → Idle, only if `id` is the active session
    ///
    /// Returns whether this call released the session. Idempotent: a stale or
    /// repeated release never tears down a newer session.
    pub fn release(&self, id: SessionId) -> bool {
        let mut active = self.active.write();
        match active.as_ref() {
            Some(session) if session.id == id => {
                *active = None;
                true
            }
            _ => false,
        }
    }

    /// Push into the active session's queue, `Discarded` when Idle
    pub fn push(&self, sample: S) -> PushOutcome {
        match self.active.read().as_ref() {
            Some(session) => session.queue.push(sample),
            None => PushOutcome::Discarded,
        }
    }

    /// Samples waiting in the active session's queue, 0 when Idle
    ///
    /// 队列本身只交给 `try_activate` 的调用者 (唯一 consumer)。
    pub fn queued(&self) -> usize {
        self.active.read().as_ref().map_or(0, |s| s.queue.len())
    }

    pub fn active_session(&self) -> Option<SessionId> {
        self.active.read().as_ref().map(|s| s.id)
    }

    pub fn is_active(&self) -> bool {
        self.active.read().is_some()
    }

    fn busy(&self, active: SessionId) -> BrokerError {
        BrokerError::AlreadyStreaming {
            channel: self.channel,
            active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    fn guard() -> SessionGuard<u32> {
        SessionGuard::new(ChannelKind::Imu)
    }

    #[test]
    fn test_activate_release_cycle() {
        let g = guard();
        assert!(!g.is_active());

        let (id, queue) = g.try_activate(QueueSize::new(5).unwrap()).unwrap();
        assert!(g.is_active());
        assert_eq!(g.active_session(), Some(id));
        assert_eq!(queue.capacity(), 5);

        assert!(g.release(id));
        assert!(!g.is_active());
        assert_eq!(g.queued(), 0);
    }

    #[test]
    fn test_queued_tracks_active_queue() {
        let g = guard();
        assert_eq!(g.queued(), 0);

        let (id, queue) = g.try_activate(QueueSize::new(3).unwrap()).unwrap();
        g.push(1);
        g.push(2);
        assert_eq!(g.queued(), 2);
        assert_eq!(queue.pop_front(), Some(1));
        assert_eq!(g.queued(), 1);

        g.release(id);
        assert_eq!(g.queued(), 0);
    }

    #[test]
    fn test_second_activation_rejected() {
        let g = guard();
        let (first, queue) = g.try_activate(QueueSize::DEFAULT).unwrap();
        queue.push(7);

        let err = g.try_activate(QueueSize::new(3).unwrap()).unwrap_err();
        assert_eq!(
            err,
            BrokerError::AlreadyStreaming {
                channel: ChannelKind::Imu,
                active: first
            }
        );
        // first session's queue is untouched
        assert_eq!(g.active_session(), Some(first));
        assert_eq!(queue.capacity(), 100);
        assert_eq!(queue.pop_front(), Some(7));
    }

    #[test]
    fn test_release_is_idempotent_and_token_checked() {
        let g = guard();
        let (old, _) = g.try_activate(QueueSize::DEFAULT).unwrap();
        assert!(g.release(old));
        assert!(!g.release(old));

        let (new, _) = g.try_activate(QueueSize::DEFAULT).unwrap();
        assert_ne!(old, new);
        // stale token must not free the newer session
        assert!(!g.release(old));
        assert_eq!(g.active_session(), Some(new));
    }

    #[test]
    fn test_push_routes_to_active_queue_only() {
        let g = guard();
        assert_eq!(g.push(1), PushOutcome::Discarded);

        let (id, queue) = g.try_activate(QueueSize::new(2).unwrap()).unwrap();
        assert_eq!(g.push(2), PushOutcome::Stored);
        assert_eq!(queue.pop_front(), Some(2));

        g.release(id);
        assert_eq!(g.push(3), PushOutcome::Discarded);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_concurrent_activation_single_winner() {
        const THREADS: usize = 16;
        let g = Arc::new(guard());
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let g = g.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    g.try_activate(QueueSize::DEFAULT).map(|(id, _)| id)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1);
        assert_eq!(g.active_session(), Some(*winners[0]));
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, BrokerError::AlreadyStreaming { .. })));
    }
}
