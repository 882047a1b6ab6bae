//! Double-buffered transmit accumulator

use core::sync::atomic::{AtomicBool, Ordering};
use muxlog_driver::{Host, Sink};

use crate::chunk::Chunk;
use crate::core::TaskId;

/// Pair of byte arenas feeding the sink
///
/// One arena fills with the payload bytes of consumed chunks while the other
/// may be in flight to the sink. A fill is handed over either when the arena
/// holds `T` chunks (throughput bound) or when the refresh timer fired
/// (latency bound), whichever comes first. The in-flight arena is never
/// touched until the sink clears the flag.
///
/// Both flags live in the engine's shared state so that sink-completion and
/// timer interrupt handlers can address them; the pair only borrows them.
pub(crate) struct TransmitPair<const K: usize, const T: usize> {
    arenas: [[[u8; K]; T]; 2],
    byte_index: [usize; 2],
    chunk_count: [usize; 2],
    write: usize,
    active_task: TaskId,
    was_terminal: bool,
    in_flight: &'static AtomicBool,
    refresh_needed: &'static AtomicBool,
}

impl<const K: usize, const T: usize> TransmitPair<K, T> {
    pub fn new(in_flight: &'static AtomicBool, refresh_needed: &'static AtomicBool) -> Self {
        in_flight.store(false, Ordering::Relaxed);
        refresh_needed.store(false, Ordering::Relaxed);
        Self {
            arenas: [[[0; K]; T]; 2],
            byte_index: [0; 2],
            chunk_count: [0; 2],
            write: 0,
            active_task: TaskId::INVALID,
            was_terminal: false,
            in_flight,
            refresh_needed,
        }
    }

    pub fn has_active_task(&self) -> bool {
        self.active_task.is_valid()
    }

    pub fn active_task(&self) -> TaskId {
        self.active_task
    }

    /// True iff the last append consumed a message terminator.
    pub fn got_terminal_chunk(&self) -> bool {
        self.was_terminal
    }

    /// Appends the payload of `chunk` to the fill arena, up to and including
    /// the first `\n`. Invalid views are ignored. The caller guarantees room
    /// for one more chunk.
    pub fn append(&mut self, chunk: Chunk<K>) {
        if !chunk.tag().is_valid() {
            return;
        }
        self.was_terminal = false;
        let write = self.write;
        let arena = self.arenas[write].as_flattened_mut();
        let mut index = self.byte_index[write];
        for &byte in chunk.payload() {
            arena[index] = byte;
            index += 1;
            if byte == b'\n' {
                self.was_terminal = true;
                break;
            }
        }
        self.byte_index[write] = index;
        self.chunk_count[write] += 1;
        self.active_task = if self.was_terminal {
            TaskId::INVALID
        } else {
            chunk.tag()
        };
    }

    /// Runs the flush decision once.
    ///
    /// A full arena forces the flush path, waiting out the other arena's
    /// flight first. The handed-over arena stays untouched until the sink
    /// clears `in_flight`; the swap gives the pump the other arena to fill.
    pub fn transmit_if_needed<H: Host, S: Sink>(&mut self, host: &H, sink: &S, pause_millis: u32) {
        let write = self.write;
        if self.chunk_count[write] == 0 {
            return;
        }
        if self.chunk_count[write] == T {
            while self.in_flight.load(Ordering::Acquire) {
                host.sleep_millis(pause_millis);
            }
            self.refresh_needed.store(true, Ordering::Relaxed);
        }
        if !self.in_flight.load(Ordering::Acquire) && self.refresh_needed.load(Ordering::Relaxed) {
            self.in_flight.store(true, Ordering::Release);
            let length = self.byte_index[write];
            sink.transmit(&self.arenas[write].as_flattened()[..length], self.in_flight);
            self.write = 1 - write;
            self.byte_index[self.write] = 0;
            self.chunk_count[self.write] = 0;
            self.refresh_needed.store(false, Ordering::Relaxed);
            host.start_refresh_timer(self.refresh_needed);
        }
    }
}
