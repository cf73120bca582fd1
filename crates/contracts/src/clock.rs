//! Monotonic sample clock

use std::sync::OnceLock;
use std::time::Instant;

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Microseconds elapsed since the process clock epoch.
///
/// The epoch is fixed on first call, so values are monotonic and comparable
/// across every adapter thread in the process.
pub fn now_us() -> u64 {
    let epoch = EPOCH.get_or_init(Instant::now);
    epoch.elapsed().as_micros() as u64
}
