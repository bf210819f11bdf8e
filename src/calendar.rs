//! Calendar months used to query and filter settlement files.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{AsicError, AsicResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> AsicResult<Self> {
        if !(1..=12).contains(&month) || NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(AsicError::invalid("month", format!("{year:04}-{month:02}"), "month must be within 1..=12"));
        }
        Ok(Self { year, month })
    }

    /// Accepts `YYYY-MM` and `YYYYMM`.
    pub fn parse(s: &str) -> AsicResult<Self> {
        let t = s.trim();
        let (y, m) = match t.split_once('-') {
            Some((y, m)) => (y, m),
            None if t.len() == 6 && t.is_char_boundary(4) => t.split_at(4),
            None => return Err(AsicError::invalid("month", s, "expected YYYY-MM or YYYYMM")),
        };
        let digits = |p: &str, n: usize| p.len() == n && p.bytes().all(|b| b.is_ascii_digit());
        if !digits(y, 4) || !digits(m, 2) {
            return Err(AsicError::invalid("month", s, "expected YYYY-MM or YYYYMM"));
        }
        let year: i32 = y.parse().map_err(|_| AsicError::invalid("month", s, "year is not a number"))?;
        let month: u32 = m.parse().map_err(|_| AsicError::invalid("month", s, "month is not a number"))?;
        Self::new(year, month)
    }

    pub fn from_date(d: NaiveDate) -> Self { Self { year: d.year(), month: d.month() } }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Last calendar day, accounting for month length and leap years.
    pub fn last_day(&self) -> NaiveDate {
        self.first_day()
            .checked_add_months(Months::new(1))
            .and_then(|d| d.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn next(&self) -> Self { Self::from_date(self.first_day().checked_add_months(Months::new(1)).unwrap_or(NaiveDate::MAX)) }

    /// Inclusive run of months from `self` to `until`.
    pub fn through(&self, until: YearMonth) -> Vec<YearMonth> {
        let mut out = Vec::new();
        let mut cur = *self;
        while cur <= until {
            out.push(cur);
            let n = cur.next();
            if n == cur { break; }
            cur = n;
        }
        out
    }

    pub fn contains(&self, d: NaiveDate) -> bool { self.first_day() <= d && d <= self.last_day() }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:04}-{:02}", self.year, self.month) }
}

impl FromStr for YearMonth {
    type Err = AsicError;
    fn from_str(s: &str) -> Result<Self, Self::Err> { Self::parse(s) }
}
