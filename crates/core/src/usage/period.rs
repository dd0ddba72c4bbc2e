//! Billing periods.
//!
//! A billing period is the calendar month in UTC, derived purely from a
//! timestamp. There is no persisted "current period" pointer, so periods
//! are always computed and can never drift; rolling into a new month
//! implicitly starts every counter at zero without touching history.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A UTC calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BillingPeriod {
    /// Calendar year.
    pub year: i32,
    /// Calendar month, 1-12.
    pub month: u32,
}

impl BillingPeriod {
    /// Derives the period containing a timestamp.
    pub fn from_timestamp(at: DateTime<Utc>) -> Self {
        Self {
            year: at.year(),
            month: at.month(),
        }
    }

    /// The period containing now.
    pub fn current() -> Self {
        Self::from_timestamp(Utc::now())
    }

    /// The counter key for this period, e.g. `2026-08`.
    pub fn key(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }

    /// First instant of the period.
    pub fn start(&self) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(self.year, self.month, 1, 0, 0, 0)
            .single()
            .unwrap_or_default()
    }

    /// First instant of the following period (exclusive end boundary).
    pub fn end(&self) -> DateTime<Utc> {
        self.next().start()
    }

    /// The following period.
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Returns `true` if the timestamp falls inside the period.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        Self::from_timestamp(at) == *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_from_timestamp() {
        let at = Utc.with_ymd_and_hms(2026, 8, 27, 15, 30, 0).unwrap();
        let period = BillingPeriod::from_timestamp(at);
        assert_eq!(period.key(), "2026-08");
        assert!(period.contains(at));
    }

    #[test]
    fn test_boundaries() {
        let period = BillingPeriod {
            year: 2026,
            month: 8,
        };
        assert_eq!(period.start(), Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap());
        assert_eq!(period.end(), Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap());

        // The last instant of the month is inside; the boundary is not.
        assert!(period.contains(Utc.with_ymd_and_hms(2026, 8, 31, 23, 59, 59).unwrap()));
        assert!(!period.contains(period.end()));
    }

    #[test]
    fn test_year_rollover() {
        let december = BillingPeriod {
            year: 2026,
            month: 12,
        };
        let january = december.next();
        assert_eq!(january.key(), "2027-01");
    }
}
