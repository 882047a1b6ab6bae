//! Muxlog host and sink interface
//!
//! The crate provides the seam between the Muxlog engine and its environment.
//! Limited scope facilitates compatibility across versions. Host and sink
//! implementation crates should depend on this crate. Muxlog users should
//! depend on the `muxlog` crate instead.
//!
//! Two capabilities are defined:
//! * [`Host`] supplies thread identity, interrupt-context detection,
//!   monotonic time, sleeping and the one-shot refresh timer.
//! * [`Sink`] consumes completed transmit buffers asynchronously.
//!
//! Unlike logging stacks that push rendered lines through a callback, Muxlog
//! hands the sink a whole accumulator buffer together with an in-flight flag
//! and keeps the buffer untouched until the flag clears. This design lets a
//! DMA-driven UART read straight out of the accumulator without a copy, at
//! the price of a strict hand-over contract spelled out on [`Sink::transmit`].

#![no_std]

mod host;
mod sink;

pub use host::Host;
pub use sink::Sink;
