//! Sensor broker - per-channel façade over session guard + queue / unary slot

use std::fmt;
use std::sync::Arc;

use contracts::{ChannelKind, ChannelMode, Sample};
use tracing::{debug, info, instrument};

use crate::metrics::{BrokerMetrics, BrokerMetricsSnapshot};
use crate::queue::{BoundedSampleQueue, PushOutcome, QueueSize};
use crate::session::{SessionGuard, SessionId};
use crate::unary::UnarySlot;
use crate::BrokerError;

/// One channel's broker
///
/// Availability is fixed at construction: a broker built without an adapter
/// rejects every attach/read with `Unavailable`. Mode follows `S::KIND`.
pub struct SensorBroker<S: Sample> {
    available: bool,
    guard: SessionGuard<S>,
    slot: Option<UnarySlot<S>>,
    metrics: BrokerMetrics,
}

impl<S: Sample> SensorBroker<S> {
    /// Create a broker
    ///
    /// # Arguments
    /// * `available` - whether an adapter was registered for `S::KIND`
    pub fn new(available: bool) -> Self {
        let slot = match S::KIND.mode() {
            ChannelMode::Unary => Some(UnarySlot::new()),
            ChannelMode::Streaming => None,
        };
        Self {
            available,
            guard: SessionGuard::new(S::KIND),
            slot,
            metrics: BrokerMetrics::new(),
        }
    }

    pub fn kind(&self) -> ChannelKind {
        S::KIND
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Whether a streaming session is currently attached
    pub fn is_streaming(&self) -> bool {
        self.guard.is_active()
    }

    /// Start a streaming session with a fresh queue of `size`
    ///
    /// The returned [`Subscription`] releases the channel when dropped.
    ///
    /// # Errors
    /// - `Unavailable`: no adapter registered
    /// - `NotStreamable`: unary channel
    /// - `AlreadyStreaming`: another session is active
    #[instrument(name = "broker_attach", skip(self, size), fields(channel = %S::KIND, capacity = %size))]
    pub fn attach(self: &Arc<Self>, size: QueueSize) -> Result<Subscription<S>, BrokerError> {
        let result = self.try_attach(size);
        match &result {
            Ok(sub) => {
                self.metrics.record_session_started();
                info!(session_id = %sub.session_id(), "stream session attached");
            }
            Err(e) => {
                self.metrics.record_session_rejected();
                debug!(error = %e, "stream session rejected");
            }
        }
        result
    }

    fn try_attach(self: &Arc<Self>, size: QueueSize) -> Result<Subscription<S>, BrokerError> {
        if !self.available {
            return Err(BrokerError::Unavailable { channel: S::KIND });
        }
        if self.slot.is_some() {
            return Err(BrokerError::NotStreamable { channel: S::KIND });
        }
        let (id, queue) = self.guard.try_activate(size)?;
        Ok(Subscription {
            broker: self.clone(),
            queue,
            id,
            released: false,
        })
    }

    /// Producer entry point
    ///
    /// Streaming: into the active session's queue, `Discarded` when none.
    /// Unary: overwrite the latest-value slot. Never blocks, never fails.
    pub fn push(&self, sample: S) -> PushOutcome {
        let outcome = if !self.available {
            PushOutcome::Discarded
        } else if let Some(slot) = &self.slot {
            slot.write(sample);
            PushOutcome::Stored
        } else {
            self.guard.push(sample)
        };
        self.metrics.record_push(outcome);
        outcome
    }

    /// End session `id`; idempotent
    pub fn detach(&self, id: SessionId) -> bool {
        let released = self.guard.release(id);
        if released {
            self.metrics.record_session_ended();
            info!(channel = %S::KIND, session_id = %id, "stream session detached");
        }
        released
    }

    /// Latest retained sample of a unary channel
    ///
    /// `Ok(None)` when the adapter exists but has not produced yet.
    ///
    /// # Errors
    /// - `Unavailable`: no adapter registered
    /// - `NotUnary`: streaming channel
    pub fn read(&self) -> Result<Option<S>, BrokerError> {
        if !self.available {
            return Err(BrokerError::Unavailable { channel: S::KIND });
        }
        match &self.slot {
            Some(slot) => Ok(slot.read()),
            None => Err(BrokerError::NotUnary { channel: S::KIND }),
        }
    }

    /// Active session id, if any
    pub fn active_session(&self) -> Option<SessionId> {
        self.guard.active_session()
    }

    /// Depth of the active session's queue (0 when idle)
    pub fn queue_depth(&self) -> usize {
        self.guard.queued()
    }

    pub fn metrics(&self) -> BrokerMetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl<S: Sample> fmt::Debug for SensorBroker<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensorBroker")
            .field("kind", &S::KIND)
            .field("available", &self.available)
            .field("active_session", &self.active_session())
            .finish()
    }
}

/// Consumer handle of one streaming session
///
/// The only way to pop from the session's queue. Dropping it detaches the
/// session, so release happens on every exit path of the consumer.
pub struct Subscription<S: Sample> {
    broker: Arc<SensorBroker<S>>,
    queue: Arc<BoundedSampleQueue<S>>,
    id: SessionId,
    released: bool,
}

impl<S: Sample> Subscription<S> {
    pub fn session_id(&self) -> SessionId {
        self.id
    }

    pub fn kind(&self) -> ChannelKind {
        S::KIND
    }

    /// Oldest queued sample, `None` when empty
    pub fn pop(&mut self) -> Option<S> {
        self.queue.pop_front()
    }

    /// Wait until the producer pushes
    pub async fn notified(&self) {
        self.queue.notified().await;
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Samples evicted by overflow during this session
    pub fn dropped(&self) -> u64 {
        self.queue.dropped_count()
    }

    /// Samples pushed during this session
    pub fn pushed(&self) -> u64 {
        self.queue.pushed_count()
    }

    /// Explicitly end the session; later calls and the drop are no-ops
    pub fn detach(&mut self) -> bool {
        self.release()
    }

    fn release(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.released = true;
        self.broker.detach(self.id)
    }
}

impl<S: Sample> Drop for Subscription<S> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<S: Sample> fmt::Debug for Subscription<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("kind", &S::KIND)
            .field("session_id", &self.id)
            .field("queue", &self.queue)
            .finish()
    }
}
