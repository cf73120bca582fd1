//! SampleSource trait - hardware adapter abstraction
//!
//! Defines the single capability the broker needs from a device driver:
//! "give me the next sample, or nothing if none is ready".
//! Simulated and real adapters implement the same trait.

use crate::{ChannelKind, SensorSample};

/// Poll-based sample source
///
/// Owned and driven by exactly one producer thread, hence `&mut self` and
/// only `Send`.
///
/// Push-based devices (driver callbacks) do not need this trait: they hand
/// samples to the channel registry directly from their callback.
///
/// # Example
///
/// ```ignore
/// let mut source: Box<dyn SampleSource> = create_source(&adapter_config)?;
/// loop {
///     match source.poll_sample() {
///         Some(sample) => registry.push(sample),
///         None => std::thread::sleep(backoff),
///     }
/// }
/// ```
pub trait SampleSource: Send {
    /// Adapter name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Channel this source produces for
    fn kind(&self) -> ChannelKind;

    /// Next sample, or `None` if nothing is ready this cycle
    ///
    /// `None` is not an error: the producer keeps polling.
    fn poll_sample(&mut self) -> Option<SensorSample>;
}
