//! # Muxlog
//!
//! This library multiplexes log lines from many concurrent producers (threads
//! and interrupt handlers) onto a single slow, byte-oriented sink such as a
//! UART with DMA or a software trace channel. It uses fixed buffers sized at
//! construction, requiring no dynamic memory allocation on the hot path.
//!
//! The library targets systems with tight interrupt latency requirements:
//! submission from interrupt context is a single bounded channel attempt, and
//! the only work on a producer's stack is text rendering into one chunk.
//!
//! ## Architecture
//!
//! ```text
//! Producer threads / ISRs                       Pump thread
//! ───────────────────────                       ───────────
//!
//! ┌────────────┐  chunks   ┌──────────────────┐
//! │ LineWriter ├──────────►│ Submission queue ├──┐
//! └────────────┘           └──────────────────┘  │ fetch
//! ┌────────────┐               ▲                 ▼
//! │ LineWriter ├───────────────┘           ┌──────────────┐
//! └────────────┘                           │ Reorder ring │
//!       ...                                └──────┬───────┘
//!                                                 ▼
//!                                          ┌───────────────┐  ┌──────┐
//!                                          │ Transmit pair ├─►│ Sink │
//!                                          └───────────────┘  └──────┘
//! ```
//!
//! Components:
//! * _LineWriter_ renders one message on the caller's stack, breaking it into
//!   fixed-size chunks tagged with the producer id. Chunks enter the shared
//!   bounded submission queue; concurrent messages interleave there freely.
//! * _Reorder ring_ is where the pump parks foreign chunks while it completes
//!   one producer's message, restoring per-producer contiguity on the output.
//! * _Transmit pair_ accumulates payload bytes double-buffered: one arena
//!   fills while the other is in flight to the sink. A buffer is handed over
//!   when full, or when the refresh timer expires, bounding output latency.
//! * _Pump_ is the single consumer tying the three together; the application
//!   dedicates a thread to it through the [`Host`].
//!
//! The environment is reached through two small traits, [`Host`] and
//! [`Sink`], defined in the `muxlog-driver` crate. A std implementation lives
//! in `muxlog-std`; embedded targets supply their own.
//!
//! ## Concurrency model
//!
//! Producers contend only on the submission channel, never on each other's
//! messages. The ring and the transmit pair are owned by the pump and touched
//! by nothing else. Sink completion and timer expiry communicate through two
//! atomic flags in the engine's shared state, so both may be signalled from
//! interrupt context.
//!
//! Per-producer byte order is preserved exactly. Across producers there is no
//! total order: the pump emits whole messages in the order their first chunks
//! reached it.
//!
//! ## Overload behaviour
//!
//! Under overload the engine degrades visibly, never silently:
//! * a full queue in non-blocking mode drops whole chunks;
//! * a full reorder ring splices a foreign message into the active one.
//!
//! Both record a marker that replaces the first header separator of the next
//! message with `@`, telling the reader that output was lost or spliced.
#![no_std]

#[cfg(test)]
extern crate std;

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

mod chunk;
mod config;
mod mux;
mod pump;
mod queue;
mod registry;
mod reorder;
#[cfg(test)]
pub(crate) mod testutil;
mod transmit;
mod writer;

pub use muxlog_core as core;
pub use muxlog_driver::{Host, Sink};

pub use config::Config;
pub use mux::Mux;
pub use pump::Pump;
pub use registry::NAME_CAPACITY;
pub use writer::LineWriter;
