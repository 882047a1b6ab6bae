//! Fixed-size transport record

use embassy_sync::blocking_mutex::raw::RawMutex;
use muxlog_driver::Host;

use crate::core::TaskId;
use crate::queue::SubmissionQueue;

/// The atomic unit of transport between producers and the pump
///
/// Byte 0 carries the producer tag, bytes `1..K` the payload. A message is a
/// run of chunks with the same tag whose last payload byte is `\n`; payload
/// bytes after the `\n` of a partially filled chunk are stale and never reach
/// the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Chunk<const K: usize> {
    bytes: [u8; K],
}

impl<const K: usize> Chunk<K> {
    const _ASSERT: usize = K - 2;

    pub const fn new(tag: TaskId) -> Self {
        let mut bytes = [0; K];
        bytes[0] = tag.into_u8();
        Self { bytes }
    }

    pub fn tag(&self) -> TaskId {
        TaskId::from_raw(self.bytes[0])
    }

    /// Turns the chunk into a hole
    pub fn invalidate(&mut self) {
        self.bytes[0] = TaskId::INVALID.into_u8();
    }

    pub fn payload(&self) -> &[u8] {
        &self.bytes[1..]
    }

    #[cfg(test)]
    pub fn filled(tag: TaskId, payload: &[u8]) -> Self {
        let mut chunk = Self::new(tag);
        chunk.bytes[1..1 + payload.len()].copy_from_slice(payload);
        chunk
    }
}

/// Producer-side chunk filler bound to one task
///
/// Lives on the caller stack for the duration of one message. Submits a full
/// chunk transparently on every `K - 1`th payload byte; [`ChunkBuilder::flush`]
/// terminates the message. A builder created with the invalid tag (interrupt
/// logging disabled, producer cap exhausted) discards everything.
pub(crate) struct ChunkBuilder<'a, H: Host, M: RawMutex, const K: usize, const Q: usize> {
    queue: &'a SubmissionQueue<M, K, Q>,
    host: &'a H,
    chunk: Chunk<K>,
    cursor: usize,
    blocking: bool,
}

impl<'a, H: Host, M: RawMutex, const K: usize, const Q: usize> ChunkBuilder<'a, H, M, K, Q> {
    pub fn new(
        queue: &'a SubmissionQueue<M, K, Q>,
        host: &'a H,
        tag: TaskId,
        blocking: bool,
    ) -> Self {
        Self {
            queue,
            host,
            chunk: Chunk::new(tag),
            cursor: 1,
            blocking,
        }
    }

    pub fn is_active(&self) -> bool {
        self.chunk.tag().is_valid()
    }

    pub fn tag(&self) -> TaskId {
        self.chunk.tag()
    }

    pub fn push(&mut self, byte: u8) {
        if !self.is_active() {
            return;
        }
        self.chunk.bytes[self.cursor] = byte;
        self.cursor += 1;
        if self.cursor == K {
            self.queue.push(self.host, self.chunk, self.blocking);
            self.cursor = 1;
        }
    }

    /// Terminates the message: writes `\n` and submits the partial chunk.
    ///
    /// The cursor never reaches `K` between pushes, so the terminator always
    /// fits.
    pub fn flush(&mut self) {
        if !self.is_active() {
            return;
        }
        self.chunk.bytes[self.cursor] = b'\n';
        self.queue.push(self.host, self.chunk, self.blocking);
        self.cursor = 1;
    }
}
