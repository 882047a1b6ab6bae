//! Std host and sink for Muxlog
//!
//! This crate provides the reference [`Host`](muxlog::Host) and
//! [`Sink`](muxlog::Sink) implementations for hosted targets: OS threads, a
//! condvar-backed one-shot refresh timer and a synchronous sink over any
//! [`std::io::Write`]. It also spawns the dedicated pump thread.
//!
//! ```no_run
//! use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
//! use muxlog::core::Format;
//! use muxlog::{Config, Mux};
//! use muxlog_std::{StdHost, WriteSink, spawn_pump};
//!
//! type LogMux = Mux<CriticalSectionRawMutex, 8, 64, 64, 32>;
//!
//! let config = Config::new();
//! let mux: &'static LogMux = Box::leak(Box::new(Mux::new(config)));
//! let host: &'static StdHost = Box::leak(Box::new(StdHost::new(config.refresh_millis)));
//! let sink = Box::leak(Box::new(WriteSink::new(std::io::stdout())));
//! let pump = spawn_pump(mux, host, sink).expect("pump thread");
//!
//! mux.register_current_task(host, Some("main"));
//! mux.line(host).str("booted in ").uint(42, Format::DEFAULT).str(" ms");
//!
//! mux.shutdown();
//! pump.join();
//! ```

mod host;
mod sink;
mod spawn;

pub use host::StdHost;
pub use sink::WriteSink;
pub use spawn::{PumpThread, spawn_pump};
