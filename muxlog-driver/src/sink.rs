//! Byte sink capability

use core::sync::atomic::AtomicBool;

/// Consumer of completed transmit buffers
///
/// The engine alternates between two accumulator buffers, so a sink sees at
/// most one outstanding transmission at a time.
pub trait Sink {
    /// Starts sending `buffer` and returns without waiting for completion.
    ///
    /// The implementation must store `false` into `in_flight` with release
    /// ordering once the bytes are durably handed to the hardware (or
    /// equivalent); the store may happen from interrupt context. A sink that
    /// transmits synchronously clears the flag before returning.
    ///
    /// The engine does not read or write `buffer` while the flag is set, and
    /// keeps the underlying memory alive as long as the pump runs. A sink
    /// that never clears the flag stalls the pump; recovery is a sink-level
    /// concern.
    fn transmit(&self, buffer: &[u8], in_flight: &'static AtomicBool);
}
