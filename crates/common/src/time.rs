//! Time utilities and the cooperative clock for drover.
//!
//! The consensus coordinator is a timed state machine: it must trigger a new
//! ledger round on a fixed cadence and escalate ballot timeouts, while staying
//! deterministic enough to test. This module provides:
//!
//! - [`current_timestamp`] / [`current_timestamp_ms`]: wall-clock helpers
//! - [`VirtualClock`]: a single-threaded reactor clock that owns all pending
//!   timers and fires them in deadline order
//! - [`VirtualTimer`]: one logical timer slot; re-arming cancels the previous
//!   arming, and callbacks observe [`TimerEvent::Cancelled`] instead of being
//!   silently dropped
//!
//! # Clock modes
//!
//! A clock is either *real* (reads the system clock; the embedding event loop
//! calls [`VirtualClock::crank`] to fire due timers) or *virtual* (time only
//! moves through [`VirtualClock::advance`], which is what tests and simulations
//! use).
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use drover_common::{TimerEvent, VirtualClock, VirtualTimer};
//!
//! let clock = VirtualClock::virtual_at(100);
//! let mut timer = VirtualTimer::new(clock.clone());
//! timer.expires_from_now(Duration::from_secs(5), |event| {
//!     assert_eq!(event, TimerEvent::Expired);
//! });
//! assert_eq!(clock.advance(Duration::from_secs(5)), 1);
//! ```

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Returns the current Unix timestamp in seconds.
///
/// If the system clock is before the Unix epoch (which should never happen
/// in practice), returns 0.
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

/// Returns the current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Why a timer callback is being invoked.
///
/// Every timer callback must check the event: a [`TimerEvent::Cancelled`]
/// delivery means the arming was superseded (explicit cancel or re-arm) and
/// the callback must return without side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// The timer's deadline was reached.
    Expired,
    /// The arming was cancelled before the deadline.
    Cancelled,
}

type TimerCallback = Box<dyn FnOnce(TimerEvent) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClockMode {
    Real,
    Virtual,
}

struct ClockState {
    /// Current time in virtual mode, milliseconds since the Unix epoch.
    virtual_now_ms: u64,
    /// Pending deadlines as (deadline_ms, generation), earliest first.
    deadlines: BinaryHeap<Reverse<(u64, u64)>>,
    /// Live callbacks by generation. A heap entry whose generation is no
    /// longer present here is stale (cancelled or superseded) and ignored.
    callbacks: HashMap<u64, TimerCallback>,
    /// Monotonic generation counter; every arming gets a fresh value.
    next_generation: u64,
}

/// The reactor clock.
///
/// All timers of a node share one clock. Cloning is cheap and clones share
/// state. Timer callbacks run inline on the task that cranks the clock, with
/// no clock lock held, so a callback may schedule or cancel further timers.
#[derive(Clone)]
pub struct VirtualClock {
    mode: ClockMode,
    state: Arc<Mutex<ClockState>>,
}

impl VirtualClock {
    /// Create a real-time clock. `now_ms` reads the system clock; the
    /// embedding loop is responsible for calling [`crank`](Self::crank).
    pub fn real() -> Self {
        Self::with_mode(ClockMode::Real, 0)
    }

    /// Create a virtual clock starting at `start_secs` (Unix seconds).
    /// Time only moves through [`advance`](Self::advance).
    pub fn virtual_at(start_secs: u64) -> Self {
        Self::with_mode(ClockMode::Virtual, start_secs * 1000)
    }

    fn with_mode(mode: ClockMode, virtual_now_ms: u64) -> Self {
        Self {
            mode,
            state: Arc::new(Mutex::new(ClockState {
                virtual_now_ms,
                deadlines: BinaryHeap::new(),
                callbacks: HashMap::new(),
                next_generation: 0,
            })),
        }
    }

    /// Whether this clock runs on virtual time.
    pub fn is_virtual(&self) -> bool {
        self.mode == ClockMode::Virtual
    }

    /// Current time in milliseconds since the Unix epoch.
    pub fn now_ms(&self) -> u64 {
        match self.mode {
            ClockMode::Real => current_timestamp_ms(),
            ClockMode::Virtual => self.state.lock().virtual_now_ms,
        }
    }

    /// Current time in seconds since the Unix epoch.
    pub fn now_secs(&self) -> u64 {
        self.now_ms() / 1000
    }

    /// Earliest pending deadline, if any timer is armed.
    pub fn next_deadline_ms(&self) -> Option<u64> {
        let state = self.state.lock();
        state
            .deadlines
            .iter()
            .filter(|Reverse((_, generation))| state.callbacks.contains_key(generation))
            .map(|Reverse((deadline, _))| *deadline)
            .min()
    }

    /// Advance virtual time by `duration`, firing every timer whose deadline
    /// is reached, in deadline order. A callback that arms a new timer within
    /// the advanced window will see that timer fire in the same call.
    ///
    /// Returns the number of callbacks fired. On a real-time clock this is
    /// equivalent to [`crank`](Self::crank); real time cannot be advanced.
    pub fn advance(&self, duration: Duration) -> usize {
        match self.mode {
            ClockMode::Real => self.fire_due(self.now_ms()),
            ClockMode::Virtual => {
                let target = self.state.lock().virtual_now_ms + duration.as_millis() as u64;
                let fired = self.fire_due(target);
                self.state.lock().virtual_now_ms = target;
                fired
            }
        }
    }

    /// Fire every timer due at the current time. Returns the count fired.
    pub fn crank(&self) -> usize {
        self.fire_due(self.now_ms())
    }

    fn fire_due(&self, target_ms: u64) -> usize {
        let mut fired = 0;
        loop {
            // Pop one due entry under the lock, then invoke without it so the
            // callback can re-arm on this clock.
            let due = {
                let mut state = self.state.lock();
                let next = state.deadlines.peek().map(|Reverse(entry)| *entry);
                match next {
                    Some((deadline, _)) if deadline <= target_ms => {
                        let Reverse((deadline, generation)) =
                            state.deadlines.pop().expect("peeked entry present");
                        match state.callbacks.remove(&generation) {
                            Some(cb) => {
                                if self.mode == ClockMode::Virtual
                                    && state.virtual_now_ms < deadline
                                {
                                    state.virtual_now_ms = deadline;
                                }
                                Some(cb)
                            }
                            // Stale entry: cancelled or superseded arming.
                            None => continue,
                        }
                    }
                    _ => None,
                }
            };
            match due {
                Some(cb) => {
                    cb(TimerEvent::Expired);
                    fired += 1;
                }
                None => break,
            }
        }
        fired
    }

    /// Arm a one-shot timer. Returns the arming's generation.
    fn schedule(&self, delay: Duration, cb: TimerCallback) -> u64 {
        let deadline = self.now_ms() + delay.as_millis() as u64;
        let mut state = self.state.lock();
        let generation = state.next_generation;
        state.next_generation += 1;
        state.deadlines.push(Reverse((deadline, generation)));
        state.callbacks.insert(generation, cb);
        generation
    }

    /// Cancel an arming. The callback is invoked inline with
    /// [`TimerEvent::Cancelled`]; cancelling a fired or already-cancelled
    /// arming is a no-op. Returns whether a callback was cancelled.
    fn cancel(&self, generation: u64) -> bool {
        let cb = self.state.lock().callbacks.remove(&generation);
        match cb {
            Some(cb) => {
                cb(TimerEvent::Cancelled);
                true
            }
            None => false,
        }
    }

    /// Number of live (armed, unfired, uncancelled) timers.
    pub fn armed_count(&self) -> usize {
        self.state.lock().callbacks.len()
    }
}

/// One logical timer slot on a [`VirtualClock`].
///
/// At most one arming is live per `VirtualTimer`: arming cancels any prior
/// arming, whose callback observes [`TimerEvent::Cancelled`]. This mirrors
/// the deadline timers of an asio-style reactor, where `expires_from_now`
/// aborts the outstanding wait.
pub struct VirtualTimer {
    clock: VirtualClock,
    armed: Option<u64>,
}

impl VirtualTimer {
    /// Create an unarmed timer on `clock`.
    pub fn new(clock: VirtualClock) -> Self {
        Self { clock, armed: None }
    }

    /// Arm the timer to fire `delay` from now, cancelling any prior arming.
    pub fn expires_from_now<F>(&mut self, delay: Duration, cb: F)
    where
        F: FnOnce(TimerEvent) + Send + 'static,
    {
        self.cancel();
        self.armed = Some(self.clock.schedule(delay, Box::new(cb)));
    }

    /// Cancel the live arming, if any. The cancelled callback runs inline
    /// with [`TimerEvent::Cancelled`]. Cancelling after the timer fired is a
    /// no-op.
    pub fn cancel(&mut self) {
        if let Some(generation) = self.armed.take() {
            self.clock.cancel(generation);
        }
    }
}
