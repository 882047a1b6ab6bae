//! Consumer-side reorder ring

use embassy_sync::blocking_mutex::raw::RawMutex;
use muxlog_driver::Host;

use crate::chunk::Chunk;
use crate::core::TaskId;
use crate::queue::SubmissionQueue;

/// Ring of chunks the pump parks foreign chunks in while it completes one
/// producer's message
///
/// The ring owns `R` chunk slots between two cursors. `stuff_start` points at
/// the oldest parked chunk, `stuff_end` at the staging slot the next fetch
/// lands in; a fetched chunk only becomes part of the ring when
/// [`ReorderRing::keep_fetched`] commits it. Invalid tags inside the ring are
/// holes left by [`ReorderRing::remove_found`] and are eliminated by
/// compaction.
///
/// The scan state (`found`, `inspected_count`, `inspected`) belongs to one
/// search for the active producer's continuation:
///
/// 1. `clear_inspected` starts a search at `stuff_start`.
/// 2. `inspect(target)` advances `found` until it hits a matching tag and
///    returns that chunk, leaving `inspected` false so the caller may consume
///    it with `remove_found`. A later `inspect` resumes behind the hole.
/// 3. When the scan runs out of unvisited slots, the ring is compacted,
///    `inspected` flips true, and the caller falls back to fetching from the
///    submission queue.
///
/// Calling `remove_found` without a preceding successful `inspect` is a
/// caller error; it is a no-op here and asserts in debug builds.
///
/// Compaction walks exactly `count` slots, so a completely hole-filled ring
/// empties to `count == 0` even though its occupied region wraps the whole
/// buffer.
pub(crate) struct ReorderRing<const K: usize, const R: usize> {
    slots: [Chunk<K>; R],
    stuff_start: usize,
    stuff_end: usize,
    found: usize,
    count: usize,
    inspected_count: usize,
    inspected: bool,
}

impl<const K: usize, const R: usize> ReorderRing<K, R> {
    pub fn new() -> Self {
        Self {
            slots: [Chunk::new(TaskId::INVALID); R],
            stuff_start: 0,
            stuff_end: 0,
            found: 0,
            count: 0,
            inspected_count: 0,
            inspected: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == R
    }

    pub fn is_inspected(&self) -> bool {
        self.inspected
    }

    /// Restarts the scan from the oldest parked chunk.
    pub fn clear_inspected(&mut self) {
        self.inspected = false;
        self.inspected_count = 0;
        self.found = self.stuff_start;
    }

    /// Pops one chunk from the submission queue into the staging slot.
    ///
    /// Returns the invalid chunk when the pop timed out; such a view must not
    /// be committed with `keep_fetched`.
    pub fn fetch<M: RawMutex, H: Host, const Q: usize>(
        &mut self,
        queue: &SubmissionQueue<M, K, Q>,
        host: &H,
        pause_millis: u32,
    ) -> Chunk<K> {
        match queue.pop(host, pause_millis) {
            Some(chunk) => {
                self.slots[self.stuff_end] = chunk;
                chunk
            }
            None => Chunk::new(TaskId::INVALID),
        }
    }

    /// The oldest parked chunk.
    pub fn peek(&self) -> Chunk<K> {
        self.slots[self.stuff_start]
    }

    /// Discards the oldest parked chunk.
    pub fn pop(&mut self) {
        debug_assert!(self.count > 0);
        self.count -= 1;
        self.stuff_start = (self.stuff_start + 1) % R;
        self.found = self.stuff_start;
    }

    /// Commits the last fetched chunk into the ring.
    pub fn keep_fetched(&mut self) {
        debug_assert!(self.count < R);
        self.count += 1;
        self.stuff_end = (self.stuff_end + 1) % R;
    }

    /// Resumes the scan for `target`.
    ///
    /// On a hit the matching chunk is returned with `inspected` still false.
    /// On exhaustion the ring is compacted, `inspected` flips true and the
    /// returned view is meaningless.
    pub fn inspect(&mut self, target: TaskId) -> Chunk<K> {
        while self.inspected_count < self.count && self.slots[self.found].tag() != target {
            self.inspected_count += 1;
            self.found = (self.found + 1) % R;
        }
        if self.inspected_count == self.count {
            self.compact();
            self.inspected = true;
        }
        self.slots[self.found]
    }

    /// Turns the chunk found by the last `inspect` into a hole.
    pub fn remove_found(&mut self) {
        debug_assert!(!self.inspected);
        if !self.inspected {
            self.slots[self.found].invalidate();
        }
    }

    /// Eliminates holes, preserving the order of valid chunks.
    ///
    /// Two cursors walk the occupied region from `stuff_start`: everything
    /// before `dst` is valid and `src` never trails it. The new count is the
    /// number of chunks kept, never derived from cursor distance.
    fn compact(&mut self) {
        let mut src = self.stuff_start;
        let mut dst = self.stuff_start;
        let mut kept = 0;
        for _ in 0..self.count {
            if self.slots[src].tag().is_valid() {
                if src != dst {
                    self.slots[dst] = self.slots[src];
                    self.slots[src].invalidate();
                }
                dst = (dst + 1) % R;
                kept += 1;
            }
            src = (src + 1) % R;
        }
        self.stuff_end = dst;
        self.count = kept;
    }
}
