use parking_lot::Mutex;
use time::{Duration, OffsetDateTime};

/// Source of the simulation's notion of "now", in UTC.
///
/// Every component that needs the current time takes a clock handle instead
/// of reading the system time, so tests and replay runs can drive the
/// simulation with a logical clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

/// A real time clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealTimeClock;

impl Clock for RealTimeClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct LogicalClock {
    now: Mutex<OffsetDateTime>,
}

impl LogicalClock {
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Moves the clock forward by the given duration and returns the new time.
    pub fn advance(&self, by: Duration) -> OffsetDateTime {
        let mut now = self.now.lock();
        *now += by;
        *now
    }

    pub fn set(&self, to: OffsetDateTime) {
        *self.now.lock() = to;
    }
}

impl Clock for LogicalClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock()
    }
}
