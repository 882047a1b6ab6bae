//! End-to-end scenarios: engine + std host + captured sink over real threads

use std::cell::Cell;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use muxlog::{Config, Host, Mux};
use muxlog_std::{StdHost, WriteSink, spawn_pump};

type Sink = WriteSink<Vec<u8>>;

fn quiet_config() -> Config {
    let mut config = Config::new();
    config.pause_millis = 5;
    config.refresh_millis = 50;
    config.time_format = None;
    config
}

fn fixture<const K: usize, const Q: usize, const R: usize, const T: usize>(
    config: Config,
) -> (
    &'static Mux<CriticalSectionRawMutex, K, Q, R, T>,
    &'static StdHost,
    &'static Sink,
) {
    (
        Box::leak(Box::new(Mux::new(config))),
        Box::leak(Box::new(StdHost::new(config.refresh_millis))),
        Box::leak(Box::new(WriteSink::new(Vec::new()))),
    )
}

fn output(sink: &Sink) -> String {
    String::from_utf8(sink.with(|w| w.clone())).unwrap()
}

/// Polls the sink until `predicate` holds or a generous deadline passes;
/// the caller's asserts report any mismatch.
fn wait_for(sink: &Sink, predicate: impl Fn(&str) -> bool) -> String {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let text = output(sink);
        if predicate(&text) || Instant::now() > deadline {
            return text;
        }
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_two_quiet_producers() {
    let (mux, host, sink) = fixture::<8, 16, 16, 8>(quiet_config());
    let pump = spawn_pump(mux, host, sink).unwrap();

    thread::spawn(move || {
        mux.register_current_task(host, None);
        mux.line(host).str("hi");
    })
    .join()
    .unwrap();
    thread::sleep(Duration::from_millis(30));
    thread::spawn(move || {
        mux.register_current_task(host, None);
        mux.line(host).str("yo");
    })
    .join()
    .unwrap();

    let text = wait_for(sink, |t| t.len() >= 12);
    mux.shutdown();
    pump.join();

    assert_eq!(text, "01 hi\n02 yo\n");
}

#[test]
fn test_single_producer_round_trip() {
    // one message shorter than an arena arrives as exactly header + body
    let (mux, host, sink) = fixture::<8, 16, 16, 8>(quiet_config());
    let pump = spawn_pump(mux, host, sink).unwrap();

    thread::spawn(move || {
        mux.register_current_task(host, None);
        mux.line(host).str("exactly this body");
    })
    .join()
    .unwrap();

    let text = wait_for(sink, |t| t.ends_with('\n'));
    mux.shutdown();
    pump.join();

    assert_eq!(text, "01 exactly this body\n");
}

#[test]
fn test_concurrent_messages_stay_contiguous() {
    let (mux, host, sink) = fixture::<8, 64, 16, 16>(quiet_config());
    let pump = spawn_pump(mux, host, sink).unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let workers: Vec<_> = [b'a', b'b']
        .into_iter()
        .map(|letter| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                mux.register_current_task(host, None);
                let body: String = (0..20).map(|_| letter as char).collect();
                barrier.wait();
                mux.line(host).str(&body);
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let text = wait_for(sink, |t| t.matches('\n').count() >= 2);
    mux.shutdown();
    pump.join();

    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    let mut bodies: Vec<&str> = Vec::new();
    for line in &lines {
        // clean separators: nothing was lost or spliced
        assert!(!line.contains('@'), "unexpected splice mark in {line:?}");
        let (_, body) = line.split_once(' ').unwrap();
        assert_eq!(body.len(), 20);
        // no foreign bytes inside a message body
        let first = body.chars().next().unwrap();
        assert!(body.chars().all(|c| c == first), "interleaved body {body:?}");
        bodies.push(body);
    }
    bodies.sort();
    assert_eq!(bodies, ["aaaaaaaaaaaaaaaaaaaa", "bbbbbbbbbbbbbbbbbbbb"]);
}

/// [`StdHost`] that can impersonate interrupt context on the current thread
struct IsrHost {
    inner: StdHost,
}

thread_local! {
    static IN_ISR: Cell<bool> = const { Cell::new(false) };
}

impl Host for IsrHost {
    fn current_thread_id(&self) -> u32 {
        self.inner.current_thread_id()
    }

    fn is_interrupt_context(&self) -> bool {
        IN_ISR.with(|flag| flag.get())
    }

    fn now_millis(&self) -> u32 {
        self.inner.now_millis()
    }

    fn sleep_millis(&self, millis: u32) {
        self.inner.sleep_millis(millis);
    }

    fn start_refresh_timer(&self, flag: &'static AtomicBool) {
        self.inner.start_refresh_timer(flag);
    }
}

#[test]
fn test_interrupt_messages_are_contiguous() {
    let mut config = quiet_config();
    config.log_from_interrupt = true;
    let mux: &'static Mux<CriticalSectionRawMutex, 8, 64, 16, 16> =
        Box::leak(Box::new(Mux::new(config)));
    let host: &'static IsrHost = Box::leak(Box::new(IsrHost {
        inner: StdHost::new(config.refresh_millis),
    }));
    let sink: &'static Sink = Box::leak(Box::new(WriteSink::new(Vec::new())));
    let pump = spawn_pump(mux, host, sink).unwrap();

    thread::spawn(move || {
        mux.register_current_task(host, None);
        mux.line(host).str("task one");
        IN_ISR.with(|flag| flag.set(true));
        mux.line(host).str("from isr");
        IN_ISR.with(|flag| flag.set(false));
        mux.line(host).str("task two");
    })
    .join()
    .unwrap();

    let text = wait_for(sink, |t| t.matches('\n').count() >= 3);
    mux.shutdown();
    pump.join();

    assert_eq!(text, "01 task one\nff from isr\n01 task two\n");
}

#[test]
fn test_timer_flush_bounds_latency() {
    let mut config = quiet_config();
    config.refresh_millis = 100;
    config.pause_millis = 10;
    let (mux, host, sink) = fixture::<8, 16, 16, 16>(config);
    let pump = spawn_pump(mux, host, sink).unwrap();

    let sent_at = Instant::now();
    thread::spawn(move || {
        mux.register_current_task(host, None);
        mux.line(host).str("partial");
    })
    .join()
    .unwrap();

    let text = wait_for(sink, |t| !t.is_empty());
    let elapsed = sent_at.elapsed();
    mux.shutdown();
    pump.join();

    assert_eq!(text, "01 partial\n");
    // refresh + pause, with scheduling slack
    assert!(elapsed < Duration::from_millis(600), "flushed after {elapsed:?}");
}

#[test]
fn test_nonblocking_overflow_marks_next_header() {
    let mut config = quiet_config();
    config.blocking = false;
    let (mux, host, sink) = fixture::<8, 2, 4, 8>(config);

    // no pump yet: the two-chunk queue overflows mid-message and the
    // terminator is among the dropped chunks
    mux.register_current_task(host, None);
    mux.line(host)
        .str("a very long message that overflows the tiny queue");

    let pump = spawn_pump(mux, host, sink).unwrap();
    mux.line(host).str("next");

    let text = wait_for(sink, |t| t.contains("next"));
    mux.shutdown();
    pump.join();

    assert!(text.starts_with("01 a"), "lost the surviving prefix: {text:?}");
    // the next message from any producer advertises the loss
    assert!(text.contains("01@next"), "missing truncation mark: {text:?}");
}

#[test]
fn test_blocking_producers_lose_nothing() {
    let mut config = quiet_config();
    config.blocking = true;
    let (mux, host, sink) = fixture::<8, 4, 8, 8>(config);
    let pump = spawn_pump(mux, host, sink).unwrap();

    thread::spawn(move || {
        mux.register_current_task(host, None);
        for i in 0..100u32 {
            mux.line(host).str("m ").uint(i, muxlog::core::Format::DEFAULT);
        }
    })
    .join()
    .unwrap();

    let text = wait_for(sink, |t| t.matches('\n').count() >= 100);
    mux.shutdown();
    pump.join();

    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 100);
    for (i, line) in lines.iter().enumerate() {
        assert_eq!(*line, format!("01 m {i}"));
    }
}

#[test]
fn test_shutdown_is_prompt() {
    let mut config = quiet_config();
    config.pause_millis = 50;
    let (mux, host, sink) = fixture::<8, 16, 16, 8>(config);
    let pump = spawn_pump(mux, host, sink).unwrap();

    thread::sleep(Duration::from_millis(20));
    let asked_at = Instant::now();
    mux.shutdown();
    pump.join();
    assert!(asked_at.elapsed() < Duration::from_secs(1));
}
