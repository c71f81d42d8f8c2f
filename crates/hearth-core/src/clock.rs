//! The global tick counter and its scoped virtual-time transactions.
//!
//! Devices never read ambient time: every calendar-dependent computation
//! receives a `&Clock`. A [`ClockTransaction`] temporarily shifts what
//! [`Clock::now`] reports so that work "as of" a past tick (assembling a
//! recipe that finished while the device was unloaded) sees that tick.
//! The shift is undone when the guard is dropped, on every exit path.

use std::ops::Deref;

/// Ticks are the atomic unit of simulation time. Signed so that offsets into
/// the past are plain arithmetic.
pub type Ticks = i64;

/// Calendar ticks in one in-game hour.
pub const TICKS_IN_HOUR: Ticks = 1000;

/// Calendar ticks in one in-game day.
pub const TICKS_IN_DAY: Ticks = TICKS_IN_HOUR * 24;

/// The global tick counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Clock {
    ticks: Ticks,
    /// Virtual offset applied by an open transaction. Always zero outside one.
    #[serde(skip)]
    offset: Ticks,
}

impl Clock {
    /// Create a clock starting at tick 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock starting at the given tick.
    pub fn starting_at(ticks: Ticks) -> Self {
        Self { ticks, offset: 0 }
    }

    /// The current tick, as seen by calendar-dependent code. Inside a
    /// transaction this is the shifted, virtual tick.
    pub fn now(&self) -> Ticks {
        self.ticks + self.offset
    }

    /// The real tick, ignoring any open transaction.
    pub fn real_now(&self) -> Ticks {
        self.ticks
    }

    /// Whether a transaction is currently shifting the view of time.
    pub fn is_shifted(&self) -> bool {
        self.offset != 0
    }

    /// Advance the real counter. Only the scheduler calls this.
    pub fn advance(&mut self, ticks: Ticks) {
        debug_assert!(ticks >= 0, "the clock never runs backwards");
        self.ticks += ticks.max(0);
    }

    /// Open a transaction that shifts `now()` by `delta` (negative = the past)
    /// until the returned guard is dropped.
    ///
    /// The guard holds the only mutable borrow of the clock and never hands
    /// it back out, so transactions cannot nest.
    pub fn transaction(&mut self, delta: Ticks) -> ClockTransaction<'_> {
        self.offset = delta;
        ClockTransaction { clock: self }
    }

    /// Open a transaction whose virtual `now()` is exactly `tick`.
    pub fn transaction_at(&mut self, tick: Ticks) -> ClockTransaction<'_> {
        let delta = tick - self.ticks;
        self.transaction(delta)
    }
}

/// Scoped virtual-time view. Derefs to the clock it shifts.
#[derive(Debug)]
pub struct ClockTransaction<'a> {
    clock: &'a mut Clock,
}

impl ClockTransaction<'_> {
    /// The offset this transaction applies to the real clock.
    pub fn offset(&self) -> Ticks {
        self.clock.offset
    }
}

impl Deref for ClockTransaction<'_> {
    type Target = Clock;

    fn deref(&self) -> &Clock {
        self.clock
    }
}

impl Drop for ClockTransaction<'_> {
    fn drop(&mut self) {
        self.clock.offset = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_starts_at_zero() {
        let clock = Clock::new();
        assert_eq!(clock.now(), 0);
        assert!(!clock.is_shifted());
    }

    #[test]
    fn advance_moves_real_time() {
        let mut clock = Clock::new();
        clock.advance(250);
        clock.advance(0);
        assert_eq!(clock.now(), 250);
        assert_eq!(clock.real_now(), 250);
    }

    #[test]
    fn transaction_shifts_view_only() {
        let mut clock = Clock::starting_at(2500);
        {
            let tr = clock.transaction(-1500);
            assert_eq!(tr.now(), 1000);
            assert_eq!(tr.real_now(), 2500);
            assert_eq!(tr.offset(), -1500);
            assert!(tr.is_shifted());
        }
        assert_eq!(clock.now(), 2500);
        assert!(!clock.is_shifted());
    }

    #[test]
    fn transaction_at_targets_absolute_tick() {
        let mut clock = Clock::starting_at(10_000);
        let tr = clock.transaction_at(4_000);
        assert_eq!(tr.now(), 4_000);
        drop(tr);
        assert_eq!(clock.now(), 10_000);
    }

    #[test]
    fn transaction_released_on_early_return() {
        fn read_past(clock: &mut Clock, bail: bool) -> Option<Ticks> {
            let tr = clock.transaction(-10);
            if bail {
                return None;
            }
            Some(tr.now())
        }

        let mut clock = Clock::starting_at(100);
        assert_eq!(read_past(&mut clock, true), None);
        assert_eq!(clock.now(), 100);
        assert_eq!(read_past(&mut clock, false), Some(90));
        assert_eq!(clock.now(), 100);
    }

    #[test]
    fn offset_is_not_persisted() {
        let mut clock = Clock::starting_at(42);
        let bytes = {
            let tr = clock.transaction(-5);
            bitcode::serialize(&*tr).unwrap()
        };
        let restored: Clock = bitcode::deserialize(&bytes).unwrap();
        assert_eq!(restored.now(), 42);
    }

    #[test]
    fn hours_and_days() {
        assert_eq!(TICKS_IN_DAY, 24_000);
        assert_eq!(4 * TICKS_IN_HOUR, 4_000);
    }
}
