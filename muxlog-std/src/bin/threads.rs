//! Ten named threads logging through one engine onto stdout.
//!
//! Messages start densely interleaved and thin out exponentially, showing
//! de-interleaving under contention and timer-driven flushes once traffic
//! dies down.

use std::io;
use std::thread;
use std::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use muxlog::core::{Format, TaskRepresentation, Topic};
use muxlog::{Config, Mux};
use muxlog_std::{StdHost, WriteSink, spawn_pump};

type DemoMux = Mux<CriticalSectionRawMutex, 8, 64, 64, 32>;

const SYSTEM: Topic = Topic::new(0);
const THREAD_COUNT: usize = 10;

fn main() {
    let mut config = Config::new();
    config.task_representation = TaskRepresentation::Name;
    config.refresh_millis = 200;

    let mux: &'static DemoMux = Box::leak(Box::new(Mux::new(config)));
    let host: &'static StdHost = Box::leak(Box::new(StdHost::new(config.refresh_millis)));
    let sink = Box::leak(Box::new(WriteSink::new(io::stdout())));
    let pump = spawn_pump(mux, host, sink).expect("failed to spawn the pump thread");

    mux.register_topic(SYSTEM, "system");

    let workers: Vec<_> = (0..THREAD_COUNT)
        .map(|n| {
            thread::spawn(move || {
                let name = format!("thread_{n}");
                mux.register_current_task(host, Some(&name));
                for i in 0..10 {
                    mux.line_for(host, SYSTEM)
                        .str(&name)
                        .str(": ")
                        .uint(i, Format::DEFAULT);
                    thread::sleep(Duration::from_millis(8 << i));
                }
            })
        })
        .collect();

    for worker in workers {
        let _ = worker.join();
    }

    mux.shutdown();
    pump.join();
}
