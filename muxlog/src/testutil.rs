//! Shared test doubles for the engine's unit tests

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};
use muxlog_driver::{Host, Sink};

use crate::queue::SubmissionQueue;

/// Drains the queue into a buffer until the message terminator.
pub(crate) fn collect_message<M: RawMutex, const K: usize, const Q: usize>(
    queue: &SubmissionQueue<M, K, Q>,
    host: &TestHost,
) -> heapless::Vec<u8, 256> {
    let mut message = heapless::Vec::new();
    while let Some(chunk) = queue.pop(host, 0) {
        for &byte in chunk.payload() {
            unwrap!(message.push(byte).ok());
            if byte == b'\n' {
                return message;
            }
        }
    }
    message
}

/// Host whose sleeps are instantaneous and whose timer only counts arms
pub(crate) struct TestHost {
    interrupt: AtomicBool,
    now: AtomicU32,
    timer_arms: AtomicUsize,
}

impl TestHost {
    pub const fn new() -> Self {
        Self {
            interrupt: AtomicBool::new(false),
            now: AtomicU32::new(0),
            timer_arms: AtomicUsize::new(0),
        }
    }

    pub fn set_interrupt(&self, value: bool) {
        self.interrupt.store(value, Ordering::Relaxed);
    }

    pub fn set_now(&self, millis: u32) {
        self.now.store(millis, Ordering::Relaxed);
    }

    pub fn timer_arms(&self) -> usize {
        self.timer_arms.load(Ordering::Relaxed)
    }
}

impl Host for TestHost {
    fn current_thread_id(&self) -> u32 {
        1
    }

    fn is_interrupt_context(&self) -> bool {
        self.interrupt.load(Ordering::Relaxed)
    }

    fn now_millis(&self) -> u32 {
        self.now.load(Ordering::Relaxed)
    }

    fn sleep_millis(&self, _millis: u32) {}

    fn start_refresh_timer(&self, _flag: &'static AtomicBool) {
        self.timer_arms.fetch_add(1, Ordering::Relaxed);
    }
}

/// Sink that copies transmissions into a buffer
///
/// Completes synchronously unless told otherwise, in which case the flag is
/// left set and the test plays the completion interrupt.
pub(crate) struct CaptureSink {
    bytes: Mutex<CriticalSectionRawMutex, RefCell<heapless::Vec<u8, 1024>>>,
    completes: AtomicBool,
}

impl CaptureSink {
    pub const fn new() -> Self {
        Self {
            bytes: Mutex::new(RefCell::new(heapless::Vec::new())),
            completes: AtomicBool::new(true),
        }
    }

    pub fn set_completes(&self, value: bool) {
        self.completes.store(value, Ordering::Relaxed);
    }

    pub fn contents(&self) -> heapless::Vec<u8, 1024> {
        self.bytes.lock(|cell| cell.borrow().clone())
    }
}

impl Sink for CaptureSink {
    fn transmit(&self, buffer: &[u8], in_flight: &'static AtomicBool) {
        self.bytes.lock(|cell| {
            unwrap!(cell.borrow_mut().extend_from_slice(buffer).ok());
        });
        if self.completes.load(Ordering::Relaxed) {
            in_flight.store(false, Ordering::Release);
        }
    }
}
