//! Host implementation over OS threads

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use muxlog::Host;

static NEXT_THREAD_ID: AtomicU32 = AtomicU32::new(1);

thread_local! {
    static THREAD_ID: u32 = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
}

/// [`Host`] backed by `std::thread` and `std::time`
///
/// Thread ids are handed out lazily from a process-wide counter, so they are
/// unique and never zero. The refresh timer is a dedicated thread parked on a
/// condvar; re-arming while a shot is pending restarts the period.
pub struct StdHost {
    start: Instant,
    timer: RefreshTimer,
}

impl StdHost {
    /// `refresh_millis` should match the engine's configured refresh period.
    pub fn new(refresh_millis: u32) -> Self {
        Self {
            start: Instant::now(),
            timer: RefreshTimer::new(refresh_millis),
        }
    }
}

impl Host for StdHost {
    fn current_thread_id(&self) -> u32 {
        THREAD_ID.with(|id| *id)
    }

    fn is_interrupt_context(&self) -> bool {
        false
    }

    fn now_millis(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }

    fn sleep_millis(&self, millis: u32) {
        thread::sleep(Duration::from_millis(millis.into()));
    }

    fn start_refresh_timer(&self, flag: &'static AtomicBool) {
        self.timer.start(flag);
    }
}

struct TimerState {
    armed: Option<&'static AtomicBool>,
    keep_running: bool,
}

struct TimerShared {
    state: Mutex<TimerState>,
    condvar: Condvar,
}

/// One-shot timer thread
///
/// Idle it waits on the condvar; armed it waits with the refresh timeout. A
/// non-timeout wakeup means re-arm or shutdown, so the period restarts. Only
/// a timeout fires the flag.
struct RefreshTimer {
    shared: Arc<TimerShared>,
    thread: Option<JoinHandle<()>>,
}

impl RefreshTimer {
    fn new(timeout_millis: u32) -> Self {
        let shared = Arc::new(TimerShared {
            state: Mutex::new(TimerState {
                armed: None,
                keep_running: true,
            }),
            condvar: Condvar::new(),
        });
        let worker = Arc::clone(&shared);
        let thread = thread::Builder::new()
            .name("logrefresh".into())
            .spawn(move || Self::run(&worker, timeout_millis))
            .ok();
        Self { shared, thread }
    }

    fn start(&self, flag: &'static AtomicBool) {
        let mut state = self
            .shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        state.armed = Some(flag);
        self.shared.condvar.notify_one();
    }

    fn run(shared: &TimerShared, timeout_millis: u32) {
        let timeout = Duration::from_millis(timeout_millis.into());
        let mut state = shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while state.keep_running {
            if state.armed.is_some() {
                let (next, wait) = shared
                    .condvar
                    .wait_timeout(state, timeout)
                    .unwrap_or_else(PoisonError::into_inner);
                state = next;
                if wait.timed_out() {
                    if let Some(flag) = state.armed.take() {
                        flag.store(true, Ordering::Relaxed);
                    }
                }
            } else {
                state = shared
                    .condvar
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        }
    }
}

impl Drop for RefreshTimer {
    fn drop(&mut self) {
        {
            let mut state = self
                .shared
                .state
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            state.keep_running = false;
            self.shared.condvar.notify_one();
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
