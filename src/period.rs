//! Calendar period bucketing used by cohort analysis

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

/// Width of a cohort period
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Granularity {
    Day,
    /// Weeks start on Monday
    Week,
    #[default]
    Month,
}

/// Granularity used when none is configured
pub const DEFAULT_GRANULARITY: Granularity = Granularity::Month;

impl Granularity {
    /// Bucket a timestamp into its period
    pub fn period_of(self, timestamp: NaiveDateTime) -> Period {
        let date = timestamp.date();
        let index = match self {
            Granularity::Month => i64::from(date.year()) * 12 + i64::from(date.month0()),
            // 0001-01-01 is a Monday and has num_days_from_ce() == 1
            Granularity::Week => i64::from(date.num_days_from_ce() - 1).div_euclid(7),
            Granularity::Day => i64::from(date.num_days_from_ce()),
        };
        Period {
            granularity: self,
            index,
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
        };
        f.write_str(name)
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "d" | "day" | "daily" => Ok(Granularity::Day),
            "w" | "week" | "weekly" => Ok(Granularity::Week),
            "m" | "month" | "monthly" => Ok(Granularity::Month),
            other => Err(format!("unknown period granularity: {other}")),
        }
    }
}

/// A calendar period, ordered chronologically within one granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    granularity: Granularity,
    index: i64,
}

impl Period {
    /// Number of period boundaries crossed going from `self` to `later`.
    /// Negative when `later` precedes `self`.
    pub fn periods_until(&self, later: &Period) -> i64 {
        debug_assert_eq!(self.granularity, later.granularity);
        later.index - self.index
    }

    /// First calendar day of the period
    pub fn start_date(&self) -> NaiveDate {
        match self.granularity {
            Granularity::Month => {
                let year = self.index.div_euclid(12) as i32;
                let month = self.index.rem_euclid(12) as u32 + 1;
                NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
            }
            Granularity::Week => day_from_ce(self.index * 7 + 1),
            Granularity::Day => day_from_ce(self.index),
        }
    }
}

fn day_from_ce(days: i64) -> NaiveDate {
    i32::try_from(days)
        .ok()
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .unwrap_or(NaiveDate::MIN)
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let start = self.start_date();
        match self.granularity {
            Granularity::Month => write!(f, "{}", start.format("%Y-%m")),
            Granularity::Week => {
                let end = start + Duration::days(6);
                write!(f, "{}/{}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d"))
            }
            Granularity::Day => write!(f, "{}", start.format("%Y-%m-%d")),
        }
    }
}
