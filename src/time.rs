//! Time points, clocks and one-shot timers.
//!
//! Time inside a [`Context`](crate::Context) is measured in microsecond ticks ([`TimePoint`])
//! read from a [`Clock`]. Contexts default to a [`MonotonicClock`]; tests swap in a
//! [`ManualClock`] to step time deterministically.
//!
//! [`TimerQueue`] keeps one-shot timers ordered by expiry. The owning context fires expired
//! timers once per update, after all stream contexts were processed.

use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::{Add, Sub};
use std::time::{Duration, Instant};

/// An absolute point in time, in microseconds since the clock's origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimePoint(u64);

impl TimePoint {
    pub const ZERO: TimePoint = TimePoint(0);

    #[inline]
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    #[inline]
    pub const fn as_micros(self) -> u64 {
        self.0
    }

    /// Time elapsed since `earlier`, zero if `earlier` is in the future.
    #[inline]
    pub fn saturating_duration_since(self, earlier: TimePoint) -> Duration {
        Duration::from_micros(self.0.saturating_sub(earlier.0))
    }
}

impl Add<Duration> for TimePoint {
    type Output = TimePoint;

    fn add(self, rhs: Duration) -> TimePoint {
        let micros = u64::try_from(rhs.as_micros()).unwrap_or(u64::MAX);
        TimePoint(self.0.saturating_add(micros))
    }
}

impl Sub for TimePoint {
    type Output = Duration;

    fn sub(self, rhs: TimePoint) -> Duration {
        self.saturating_duration_since(rhs)
    }
}

impl fmt::Display for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}us", self.0)
    }
}

/// Source of the current time.
pub trait Clock {
    fn now(&self) -> TimePoint;
}

/// Wall clock based on [`Instant`], counting from its creation.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> TimePoint {
        TimePoint::ZERO + self.origin.elapsed()
    }
}

/// A clock that only moves when told to.
///
/// With an auto-tick configured, every read first advances the clock by that step, so a
/// loop that reads the time once per frame sees time pass without explicit calls.
///
/// ```
/// use std::time::Duration;
/// use stickflow::{Clock, ManualClock, TimePoint};
///
/// let clock = ManualClock::new();
/// clock.advance(Duration::from_millis(5));
/// assert_eq!(clock.now(), TimePoint::from_micros(5_000));
///
/// clock.set_auto_tick(Duration::from_micros(10));
/// assert_eq!(clock.now(), TimePoint::from_micros(5_010));
/// assert_eq!(clock.now(), TimePoint::from_micros(5_020));
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    ticks: Cell<TimePoint>,
    auto_tick: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, at: TimePoint) {
        self.ticks.set(at);
    }

    pub fn advance(&self, by: Duration) {
        self.ticks.set(self.ticks.get() + by);
    }

    pub fn set_auto_tick(&self, step: Duration) {
        self.auto_tick.set(step);
    }

    pub fn auto_tick(&self) -> Duration {
        self.auto_tick.get()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> TimePoint {
        let step = self.auto_tick.get();
        if !step.is_zero() {
            self.advance(step);
        }
        self.ticks.get()
    }
}

/// Handle of a scheduled timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

type TimerFn = Box<dyn FnOnce(TimePoint)>;

/// One-shot timers ordered by expiry, then by scheduling order.
#[derive(Default)]
pub struct TimerQueue {
    pending: RefCell<BTreeMap<(TimePoint, TimerId), TimerFn>>,
    due: RefCell<HashMap<TimerId, TimePoint>>,
    next_id: Cell<u64>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `callback` to run once the queue is fired at or after `at`.
    pub fn schedule(&self, at: TimePoint, callback: impl FnOnce(TimePoint) + 'static) -> TimerId {
        let id = TimerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.pending.borrow_mut().insert((at, id), Box::new(callback));
        self.due.borrow_mut().insert(id, at);
        id
    }

    /// Cancel a timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&self, id: TimerId) -> bool {
        let Some(at) = self.due.borrow_mut().remove(&id) else {
            return false;
        };
        self.pending.borrow_mut().remove(&(at, id)).is_some()
    }

    pub fn is_scheduled(&self, id: TimerId) -> bool {
        self.due.borrow().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.due.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.due.borrow().is_empty()
    }

    /// Earliest pending expiry.
    pub fn next_expiry(&self) -> Option<TimePoint> {
        self.pending.borrow().keys().next().map(|(at, _)| *at)
    }

    /// Run every timer due at `now`, earliest first. Returns how many fired.
    ///
    /// Timers scheduled by a firing callback wait for the next call, even if already due.
    pub fn fire_expired(&self, now: TimePoint) -> usize {
        let horizon = TimerId(self.next_id.get());
        let mut fired = 0;
        loop {
            let next = {
                let mut pending = self.pending.borrow_mut();
                // Only due keys are visited; timers added while firing wait for the next call.
                let key = pending
                    .range(..=(now, TimerId(u64::MAX)))
                    .map(|(key, _)| *key)
                    .find(|(_, id)| *id < horizon);
                key.and_then(|key| pending.remove_entry(&key))
            };
            let Some(((at, id), callback)) = next else {
                break;
            };
            self.due.borrow_mut().remove(&id);
            callback(at);
            fired += 1;
        }
        fired
    }

    /// Drop every pending timer without running it.
    pub fn clear(&self) {
        self.pending.borrow_mut().clear();
        self.due.borrow_mut().clear();
    }
}

impl fmt::Debug for TimerQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerQueue")
            .field("len", &self.len())
            .field("next_expiry", &self.next_expiry())
            .finish()
    }
}
