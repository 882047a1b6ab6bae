//! Pump thread management

use std::io;
use std::thread::{self, JoinHandle};

use embassy_sync::blocking_mutex::raw::RawMutex;
use muxlog::{Host, Mux, Sink};

/// Handle of the spawned pump thread
pub struct PumpThread {
    handle: JoinHandle<()>,
}

impl PumpThread {
    /// Waits for the pump to exit. Call [`Mux::shutdown`] first; the pump
    /// then returns within one configured pause.
    pub fn join(self) {
        let _ = self.handle.join();
    }
}

/// Spawns the dedicated consumer thread, named `logpump`.
///
/// Spawn failure is a construction-time error and is reported to the caller;
/// the engine is unusable without its pump.
pub fn spawn_pump<H, S, M, const K: usize, const Q: usize, const R: usize, const T: usize>(
    mux: &'static Mux<M, K, Q, R, T>,
    host: &'static H,
    sink: &'static S,
) -> io::Result<PumpThread>
where
    H: Host + Sync,
    S: Sink + Sync,
    M: RawMutex + Send + Sync + 'static,
{
    let pump = mux.pump(host, sink);
    let handle = thread::Builder::new()
        .name("logpump".into())
        .spawn(move || pump.run())?;
    Ok(PumpThread { handle })
}
