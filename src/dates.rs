use std::sync::Mutex;

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Source of "now" for everything deciding on time (cool-downs, sync timestamps).
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock only moving when told to.
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, duration: Duration) {
        let mut now = match self.now.lock() {
            Ok(now) => now,
            Err(poisoned) => poisoned.into_inner(),
        };
        *now += duration;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Trailing period of days, ending on a reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NaivePeriod {
    start: NaiveDate,
    end: NaiveDate,
}

impl NaivePeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start > end {
            return NaivePeriod {
                start: end,
                end: start,
            };
        }
        NaivePeriod { start, end }
    }

    /// `None` when the start would fall before the first representable date.
    pub fn trailing(end: NaiveDate, days: u32) -> Option<Self> {
        end.checked_sub_signed(Duration::days(i64::from(days)))
            .map(|start| NaivePeriod::new(start, end))
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }
}
