//! Consumer state machine

use embassy_sync::blocking_mutex::raw::RawMutex;
use muxlog_driver::{Host, Sink};

use crate::mux::Mux;
use crate::reorder::ReorderRing;
use crate::transmit::TransmitPair;

/// The consumer end of the engine
///
/// Owns the reorder ring and the transmit pair; the caller dedicates a thread
/// to [`Pump::run`]. Every iteration moves at most one chunk towards the sink
/// and then runs the flush decision, maintaining the invariant that the fill
/// arena has room for one more chunk on entry.
///
/// Chunk routing:
/// * With no message in progress, the oldest parked chunk is preferred over a
///   fresh fetch, so producers already buffered drain before newcomers. This
///   bounds how long a chunk may sit in the ring.
/// * While a message is in progress, the active producer is served from the
///   queue directly when possible; foreign chunks are parked. The O(ring)
///   scan runs only when fetching cannot make progress.
/// * When the ring is full and the active producer still owes its terminator,
///   contiguity is abandoned: the ring head is emitted even if foreign. This
///   overload release valve records a truncation mark so the reader learns
///   that a message was spliced.
pub struct Pump<H, S, M, const K: usize, const Q: usize, const R: usize, const T: usize>
where
    H: Host + 'static,
    S: Sink + 'static,
    M: RawMutex + 'static,
{
    mux: &'static Mux<M, K, Q, R, T>,
    host: &'static H,
    sink: &'static S,
    ring: ReorderRing<K, R>,
    tx: TransmitPair<K, T>,
}

impl<H, S, M, const K: usize, const Q: usize, const R: usize, const T: usize>
    Pump<H, S, M, K, Q, R, T>
where
    H: Host + 'static,
    S: Sink + 'static,
    M: RawMutex + 'static,
{
    pub(crate) fn new(
        mux: &'static Mux<M, K, Q, R, T>,
        host: &'static H,
        sink: &'static S,
    ) -> Self {
        let tx = TransmitPair::new(&mux.in_flight, &mux.refresh_needed);
        host.start_refresh_timer(&mux.refresh_needed);
        Self {
            mux,
            host,
            sink,
            ring: ReorderRing::new(),
            tx,
        }
    }

    /// Runs until [`Mux::shutdown`]. Exit latency is bounded by the
    /// configured pause.
    pub fn run(mut self) {
        debug!("log pump running");
        while self.mux.keep_running() {
            self.step();
        }
        debug!("log pump stopped");
    }

    fn step(&mut self) {
        let pause = self.mux.config.pause_millis;
        if !self.tx.has_active_task() {
            if self.ring.is_empty() {
                // may be an invalid view after a pop timeout; append ignores it
                let chunk = self.ring.fetch(&self.mux.queue, self.host, pause);
                self.tx.append(chunk);
            } else {
                self.tx.append(self.ring.peek());
                self.ring.pop();
            }
        } else if self.ring.is_empty() {
            let chunk = self.ring.fetch(&self.mux.queue, self.host, pause);
            if chunk.tag().is_valid() {
                if chunk.tag() == self.tx.active_task() {
                    self.tx.append(chunk);
                } else {
                    self.ring.keep_fetched();
                }
            }
        } else if !self.ring.is_full() {
            if self.ring.is_inspected() {
                let chunk = self.ring.fetch(&self.mux.queue, self.host, pause);
                if chunk.tag().is_valid() {
                    if chunk.tag() == self.tx.active_task() {
                        self.tx.append(chunk);
                    } else {
                        self.ring.keep_fetched();
                    }
                }
            } else {
                let chunk = self.ring.inspect(self.tx.active_task());
                if !self.ring.is_inspected() {
                    self.tx.append(chunk);
                    self.ring.remove_found();
                }
            }
        } else {
            // ring full while the active producer owes its terminator
            let head = self.ring.peek();
            if head.tag() != self.tx.active_task() {
                self.mux.queue.mark_truncated();
            }
            self.tx.append(head);
            self.ring.pop();
            self.ring.clear_inspected();
        }

        if self.tx.got_terminal_chunk() {
            self.ring.clear_inspected();
        }
        self.tx.transmit_if_needed(self.host, self.sink, pause);
    }
}
