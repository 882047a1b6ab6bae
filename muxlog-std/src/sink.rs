//! Synchronous sink over `io::Write`

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use muxlog::Sink;

/// [`Sink`](muxlog::Sink) writing each transmit buffer to a wrapped writer
///
/// Transmission is synchronous: the buffer is written and flushed before the
/// in-flight flag clears. A write error leaves the flag set, stalling the
/// pump; recovery is not attempted here.
pub struct WriteSink<W: Write> {
    writer: Mutex<W>,
}

impl<W: Write> WriteSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Runs `f` on the wrapped writer, e.g. to inspect a captured buffer.
    pub fn with<T>(&self, f: impl FnOnce(&mut W) -> T) -> T {
        f(&mut self.writer.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl<W: Write> Sink for WriteSink<W> {
    fn transmit(&self, buffer: &[u8], in_flight: &'static AtomicBool) {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        match writer.write_all(buffer).and_then(|()| writer.flush()) {
            Ok(()) => in_flight.store(false, Ordering::Release),
            Err(error) => {
                log::error!("log sink write failed, pump will stall: {error}");
            }
        }
    }
}
