//! Pacing clocks.
//!
//! Every wait in a session goes through a [`Clock`], so tests can run the
//! whole timeline in virtual time.

use chrono::NaiveDate;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

/// Source of waits and of the calendar date
pub trait Clock {
    /// Block the session timeline for `duration`
    fn sleep(&self, duration: Duration);

    /// The local calendar date, used to key the daily tally
    fn today(&self) -> NaiveDate;
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }

    fn today(&self) -> NaiveDate {
        (**self).today()
    }
}

/// Wall clock with a scale factor applied to every wait
#[derive(Clone, Debug)]
pub struct SystemClock {
    time_scale: f64,
}

impl SystemClock {
    /// Negative scales clamp to zero, non-finite ones fall back to real time
    pub fn new(time_scale: f64) -> Self {
        let time_scale = if time_scale.is_finite() {
            time_scale.max(0.0)
        } else {
            1.0
        };
        Self { time_scale }
    }

    /// Real time spent on a wait of `duration`; saturates instead of overflowing
    pub fn scaled(&self, duration: Duration) -> Duration {
        Duration::try_from_secs_f64(duration.as_secs_f64() * self.time_scale)
            .unwrap_or(Duration::MAX)
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Clock for SystemClock {
    fn sleep(&self, duration: Duration) {
        let scaled = self.scaled(duration);
        if !scaled.is_zero() {
            std::thread::sleep(scaled);
        }
    }

    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// Clock that never blocks; waits only advance a virtual counter
#[derive(Debug)]
pub struct VirtualClock {
    elapsed: Cell<Duration>,
    today: Cell<NaiveDate>,
}

impl VirtualClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            elapsed: Cell::new(Duration::ZERO),
            today: Cell::new(today),
        }
    }

    /// Total virtual time slept so far
    pub fn elapsed(&self) -> Duration {
        self.elapsed.get()
    }

    /// Move the calendar to another day
    pub fn set_today(&self, today: NaiveDate) {
        self.today.set(today);
    }
}

impl Clock for VirtualClock {
    fn sleep(&self, duration: Duration) {
        self.elapsed.set(self.elapsed.get() + duration);
    }

    fn today(&self) -> NaiveDate {
        self.today.get()
    }
}
