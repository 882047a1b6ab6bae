//! Bounded multi-producer submission channel

use core::sync::atomic::{AtomicBool, Ordering};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use muxlog_driver::Host;

use crate::chunk::Chunk;

/// Delay between attempts when a blocking submission finds the channel full
const ENQUEUE_POLL_MILLIS: u32 = 1;

/// FIFO of whole chunks shared by every producer and drained by the pump
///
/// Per-producer order is preserved; the global order is whatever the channel
/// sees. A chunk is enqueued whole or lost whole, and every loss is recorded
/// in the truncation marker that the next emitted header reports.
pub(crate) struct SubmissionQueue<M: RawMutex, const K: usize, const Q: usize> {
    channel: Channel<M, Chunk<K>, Q>,
    truncated: AtomicBool,
}

impl<M: RawMutex, const K: usize, const Q: usize> SubmissionQueue<M, K, Q> {
    pub fn new() -> Self {
        Self {
            channel: Channel::new(),
            truncated: AtomicBool::new(false),
        }
    }

    /// Enqueues one chunk from any context, including interrupts.
    ///
    /// Interrupt-context submissions are a single bounded attempt regardless
    /// of the blocking flag. Blocking submissions retry with short sleeps
    /// until space appears.
    pub fn push<H: Host>(&self, host: &H, chunk: Chunk<K>, blocking: bool) {
        if !blocking || host.is_interrupt_context() {
            if self.channel.try_send(chunk).is_err() {
                self.mark_truncated();
            }
            return;
        }

        let mut chunk = chunk;
        loop {
            match self.channel.try_send(chunk) {
                Ok(()) => return,
                Err(TrySendError::Full(rejected)) => {
                    chunk = rejected;
                    host.sleep_millis(ENQUEUE_POLL_MILLIS);
                }
            }
        }
    }

    /// Removes the oldest chunk, waiting up to `pause_millis` for an arrival.
    pub fn pop<H: Host>(&self, host: &H, pause_millis: u32) -> Option<Chunk<K>> {
        if let Ok(chunk) = self.channel.try_receive() {
            return Some(chunk);
        }
        host.sleep_millis(pause_millis);
        self.channel.try_receive().ok()
    }

    pub fn mark_truncated(&self) {
        self.truncated.store(true, Ordering::Relaxed);
    }

    /// Returns and clears the loss marker.
    pub fn take_truncated(&self) -> bool {
        self.truncated.swap(false, Ordering::Relaxed)
    }
}
