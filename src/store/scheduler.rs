//! Recurring save timers.
//!
//! A timer never overlaps with itself: the next interval starts only after
//! the previous tick has returned.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{Level, event};

pub type TickFn = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Routine,
    Historical,
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerKind::Routine => f.write_str("routine"),
            TimerKind::Historical => f.write_str("historical"),
        }
    }
}

/// Handle to one armed recurring timer.
pub trait SaveTimer: Send + Sync {
    /// Pauses the timer; no ticks fire until `start`.
    fn stop(&self);

    /// Resumes the timer with a full interval.
    fn start(&self);

    /// Stops the timer for good.
    fn close(&self);

    fn is_running(&self) -> bool;
}

pub trait SaveScheduler: Send + Sync {
    fn schedule(&self, kind: TimerKind, interval: Duration, tick: TickFn) -> Box<dyn SaveTimer>;
}

/// Runs each timer as a task on a tokio runtime. Ticks execute on the
/// blocking pool since a save does synchronous disk I/O.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Uses the runtime of the calling context. Panics outside a runtime,
    /// like [`Handle::current`].
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

struct TokioTimer {
    active_tx: watch::Sender<bool>,
    join_handle: Mutex<Option<JoinHandle<()>>>,
}

impl SaveScheduler for TokioScheduler {
    fn schedule(&self, kind: TimerKind, interval: Duration, tick: TickFn) -> Box<dyn SaveTimer> {
        let (active_tx, mut active_rx) = watch::channel(true);

        let join_handle = self.handle.spawn(async move {
            loop {
                if !*active_rx.borrow_and_update() {
                    if active_rx.changed().await.is_err() {
                        break;
                    }
                    continue;
                }

                tokio::select! {
                    changed = active_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = sleep(interval) => {
                        let tick = tick.clone();
                        if let Err(err) = tokio::task::spawn_blocking(move || tick()).await {
                            event!(Level::ERROR, timer = %kind, error = %err, "save timer tick failed");
                        }
                    }
                }
            }
        });

        Box::new(TokioTimer {
            active_tx,
            join_handle: Mutex::new(Some(join_handle)),
        })
    }
}

impl SaveTimer for TokioTimer {
    fn stop(&self) {
        self.active_tx.send_replace(false);
    }

    fn start(&self) {
        self.active_tx.send_replace(true);
    }

    fn close(&self) {
        self.active_tx.send_replace(false);
        if let Ok(mut guard) = self.join_handle.lock() {
            if let Some(join_handle) = guard.take() {
                join_handle.abort();
            }
        }
    }

    fn is_running(&self) -> bool {
        *self.active_tx.borrow()
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        self.close();
    }
}

struct ManualTimerState {
    interval: Duration,
    running: AtomicBool,
    closed: AtomicBool,
    fired: AtomicUsize,
    tick: TickFn,
}

struct ManualTimer(Arc<ManualTimerState>);

impl SaveTimer for ManualTimer {
    fn stop(&self) {
        self.0.running.store(false, Ordering::SeqCst);
    }

    fn start(&self) {
        if !self.0.closed.load(Ordering::SeqCst) {
            self.0.running.store(true, Ordering::SeqCst);
        }
    }

    fn close(&self) {
        self.0.closed.store(true, Ordering::SeqCst);
        self.0.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.0.running.load(Ordering::SeqCst)
    }
}

/// Scheduler whose timers only fire when the caller says so.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    timers: Arc<Mutex<HashMap<TimerKind, Arc<ManualTimerState>>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn timer(&self, kind: TimerKind) -> Option<Arc<ManualTimerState>> {
        self.timers
            .lock()
            .ok()
            .and_then(|timers| timers.get(&kind).cloned())
    }

    /// Runs one tick on the calling thread if the timer is armed and running.
    pub fn fire(&self, kind: TimerKind) -> bool {
        let Some(timer) = self.timer(kind) else {
            return false;
        };
        if !timer.running.load(Ordering::SeqCst) {
            return false;
        }
        timer.fired.fetch_add(1, Ordering::SeqCst);
        (timer.tick)();
        true
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.timer(kind)
            .is_some_and(|timer| !timer.closed.load(Ordering::SeqCst))
    }

    pub fn is_running(&self, kind: TimerKind) -> bool {
        self.timer(kind)
            .is_some_and(|timer| timer.running.load(Ordering::SeqCst))
    }

    pub fn interval(&self, kind: TimerKind) -> Option<Duration> {
        self.timer(kind).map(|timer| timer.interval)
    }

    pub fn fired(&self, kind: TimerKind) -> usize {
        self.timer(kind)
            .map(|timer| timer.fired.load(Ordering::SeqCst))
            .unwrap_or(0)
    }
}

impl SaveScheduler for ManualScheduler {
    fn schedule(&self, kind: TimerKind, interval: Duration, tick: TickFn) -> Box<dyn SaveTimer> {
        let state = Arc::new(ManualTimerState {
            interval,
            running: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            fired: AtomicUsize::new(0),
            tick,
        });
        if let Ok(mut timers) = self.timers.lock() {
            timers.insert(kind, state.clone());
        }
        Box::new(ManualTimer(state))
    }
}
