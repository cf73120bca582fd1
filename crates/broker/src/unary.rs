//! Latest-value slot for unary channels

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

/// Single most-recently-written sample
///
/// Overwritten on every write, read without consumption.
pub struct UnarySlot<S> {
    latest: RwLock<Option<S>>,
    writes: AtomicU64,
}

impl<S: Clone> UnarySlot<S> {
    pub fn new() -> Self {
        Self {
            latest: RwLock::new(None),
            writes: AtomicU64::new(0),
        }
    }

    /// Replace the retained sample
    pub fn write(&self, sample: S) {
        *self.latest.write() = Some(sample);
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy of the retained sample, `None` before the first write
    pub fn read(&self) -> Option<S> {
        self.latest.read().clone()
    }

    /// Number of writes so far
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }
}

impl<S: Clone> Default for UnarySlot<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_slot() {
        let slot: UnarySlot<f32> = UnarySlot::new();
        assert_eq!(slot.read(), None);
        assert_eq!(slot.write_count(), 0);
    }

    #[test]
    fn test_overwrite_and_non_consuming_read() {
        let slot = UnarySlot::new();
        slot.write(1.0f32);
        slot.write(2.5f32);
        assert_eq!(slot.read(), Some(2.5));
        assert_eq!(slot.read(), Some(2.5));
        assert_eq!(slot.write_count(), 2);
    }
}
