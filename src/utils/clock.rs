use chrono::{DateTime, FixedOffset, Local, NaiveTime, TimeZone, Utc};
use parking_lot::Mutex;

/// Source of "now" for cache expiry.
///
/// Cache entries expire at local midnight, so besides the current instant a
/// clock also knows where the current local day began.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// The most recent local midnight, at or before `now()`.
    fn start_of_day(&self) -> DateTime<Utc>;
}

/// Wall clock in the machine's local time zone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn start_of_day(&self) -> DateTime<Utc> {
        start_of_day_in(Local::now())
    }
}

/// A clock that only moves when told to. Midnight is computed in a fixed
/// UTC offset so results don't depend on the host time zone.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<FixedOffset>>,
}

impl ManualClock {
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<FixedOffset>) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock();
        *now = *now + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().with_timezone(&Utc)
    }

    fn start_of_day(&self) -> DateTime<Utc> {
        start_of_day_in(*self.now.lock())
    }
}

/// Midnight of the calendar day `now` falls on, in `now`'s own time zone.
///
/// When a DST transition skips midnight, falls back to subtracting the
/// elapsed wall-clock time of day.
pub fn start_of_day_in<Tz: TimeZone>(now: DateTime<Tz>) -> DateTime<Utc> {
    let midnight = now.date_naive().and_time(NaiveTime::MIN);
    match now.timezone().from_local_datetime(&midnight).earliest() {
        Some(start) => start.with_timezone(&Utc),
        None => {
            let elapsed = now.time().signed_duration_since(NaiveTime::MIN);
            now.with_timezone(&Utc) - elapsed
        }
    }
}
