//! Wall-clock seam used throughout the workspace
//!
//! Tip admission, aged eviction and the orphanage walk all reason about
//! wall-clock time. Threading a `Clock` through constructors instead of
//! calling `SystemTime::now()` inline keeps the time-dependent logic
//! deterministic under test: `ManualClock` is a settable clock the tests
//! advance by hand.

use parking_lot::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A source of wall-clock time.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> SystemTime;

    /// Time elapsed since `earlier`. Zero if `earlier` lies in the future.
    fn since(&self, earlier: SystemTime) -> Duration {
        self.now()
            .duration_since(earlier)
            .unwrap_or(Duration::ZERO)
    }
}

/// The real system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A clock whose current instant is set by hand.
///
/// Starts at the real current time so timestamps remain plausible epochs.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<SystemTime>,
}

impl ManualClock {
    pub fn new(now: SystemTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: SystemTime) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(SystemTime::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        *self.now.lock()
    }
}

/// Microseconds since the Unix epoch, the wire representation of instants.
pub fn unix_micros(t: SystemTime) -> i64 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_micros() as i64,
        Err(e) => -(e.duration().as_micros() as i64),
    }
}

/// Instant from microseconds since the Unix epoch.
pub fn from_unix_micros(micros: i64) -> SystemTime {
    if micros >= 0 {
        UNIX_EPOCH + Duration::from_micros(micros as u64)
    } else {
        UNIX_EPOCH - Duration::from_micros(micros.unsigned_abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new(UNIX_EPOCH);
        clock.advance(Duration::from_secs(5));

        assert_eq!(clock.now(), UNIX_EPOCH + Duration::from_secs(5));
        assert_eq!(clock.since(UNIX_EPOCH), Duration::from_secs(5));
    }

    #[test]
    fn test_since_is_zero_for_future_instants() {
        let clock = ManualClock::new(UNIX_EPOCH);
        let future = UNIX_EPOCH + Duration::from_secs(10);

        assert_eq!(clock.since(future), Duration::ZERO);
    }

    #[test]
    fn test_micros_roundtrip() {
        let t = UNIX_EPOCH + Duration::from_micros(1_650_000_000_123_456);
        assert_eq!(from_unix_micros(unix_micros(t)), t);
    }
}
