//! Calendar month identities used for activation windows and rate lookups

use anyhow::{Context, Result, anyhow};
use chrono::{Datelike, NaiveDate};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::fmt::Display;
use std::str::FromStr;

/// A calendar month. `month` is 1-based.
///
/// Equality and ordering follow `(year, month)`, which agrees with the
/// zero-padded `YYYY-MM` key. The label is for display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthRef {
    year: i32,
    month: u32,
}

impl MonthRef {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(anyhow!("Invalid month number: {}", month));
        }
        if !(0..=9999).contains(&year) {
            return Err(anyhow!("Year out of range: {}", year));
        }
        Ok(MonthRef { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        MonthRef {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Parses a `YYYY-MM` key.
    pub fn from_key(key: &str) -> Result<Self> {
        let (year, month) = key
            .split_once('-')
            .filter(|(y, m)| {
                y.len() == 4
                    && m.len() == 2
                    && y.bytes().all(|b| b.is_ascii_digit())
                    && m.bytes().all(|b| b.is_ascii_digit())
            })
            .ok_or_else(|| anyhow!("Invalid month key '{}', expected YYYY-MM", key))?;
        let year: i32 = year
            .parse()
            .with_context(|| format!("Invalid year in month key '{key}'"))?;
        let month: u32 = month
            .parse()
            .with_context(|| format!("Invalid month in month key '{key}'"))?;
        Self::new(year, month)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn key(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }

    pub fn label(&self) -> String {
        self.first_day().format("%b %Y").to_string()
    }

    /// Date for `day` within this month, `None` when the day does not exist.
    pub fn day(&self, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, day)
    }

    pub fn first_day(&self) -> NaiveDate {
        // (year, month) is validated on construction so day 1 always exists
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    pub fn previous(&self) -> Self {
        if self.month == 1 {
            MonthRef {
                year: self.year - 1,
                month: 12,
            }
        } else {
            MonthRef {
                year: self.year,
                month: self.month - 1,
            }
        }
    }
}

impl Display for MonthRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for MonthRef {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s.trim())
    }
}

impl Serialize for MonthRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("MonthRef", 4)?;
        state.serialize_field("year", &self.year)?;
        state.serialize_field("month", &self.month)?;
        state.serialize_field("key", &self.key())?;
        state.serialize_field("label", &self.label())?;
        state.end()
    }
}

/// The most recent `count` months ending at the month of `today`, most recent
/// first. `count` is clamped to at least one.
pub fn recent_months(count: usize, today: NaiveDate) -> Vec<MonthRef> {
    let count = count.max(1);
    let mut months = Vec::with_capacity(count);
    let mut current = MonthRef::from_date(today);
    for _ in 0..count {
        months.push(current);
        current = current.previous();
    }
    months
}
