//! Execution environment capability

use core::sync::atomic::AtomicBool;

/// Threading, timing and interrupt services consumed by the engine
///
/// One host instance serves every producer and the pump. All methods must be
/// callable concurrently from any registered thread; [`Host::sleep_millis`]
/// and [`Host::start_refresh_timer`] are never called from interrupt context.
///
/// Millisecond timestamps may wrap; the engine only renders them.
pub trait Host {
    /// A value unique among live threads, stable for a thread's lifetime.
    /// The value `0` is never returned for a thread that may log.
    fn current_thread_id(&self) -> u32;

    /// True when the caller runs in interrupt context.
    ///
    /// Submissions made in interrupt context are tagged with the shared
    /// interrupt producer id and never block.
    fn is_interrupt_context(&self) -> bool;

    /// Monotonic uptime in milliseconds, truncated to 32 bits.
    fn now_millis(&self) -> u32;

    /// Suspends the calling thread for at least `millis` milliseconds.
    fn sleep_millis(&self, millis: u32);

    /// Arms the one-shot refresh timer.
    ///
    /// On expiry the host stores `true` into `flag`, possibly from a timer
    /// interrupt. Re-arming while the previous shot is pending restarts the
    /// period; at most one shot is outstanding.
    fn start_refresh_timer(&self, flag: &'static AtomicBool);
}
