//! Period keys
//!
//! A [`Period`] is the structured form of the period strings admins enter on
//! records: `"2024-03"` (month), `"2024-Q2"` (quarter), `"2024-H1"` (half
//! year) and `"2024"` (year). Strings are converted to `Period` once at the
//! boundary; everything downstream works on the tagged value.
//!
//! `Period` is the single source of truth for chronological ordering. Its
//! [`Period::sort_key`] is zero-padded per component so lexicographic order
//! of keys matches chronological order within one granularity.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::types::Granularity;

/// A calendar period at one of the four supported granularities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    granularity: Granularity,
    year: i32,
    /// Month 1-12, quarter 1-4, half 1-2, or 1 for a whole year
    subunit: u32,
}

impl Period {
    /// Build a period, validating the subunit range for the granularity.
    pub fn new(granularity: Granularity, year: i32, subunit: u32) -> Result<Self> {
        let max = 12 / granularity.months();
        if !(1..=max).contains(&subunit) {
            return Err(Error::malformed(
                &Self::from_parts(granularity, year, subunit).to_string(),
                format!(
                    "{} must be between 1 and {}",
                    Self::subunit_name(granularity),
                    max
                ),
            ));
        }
        Ok(Self::from_parts(granularity, year, subunit))
    }

    fn from_parts(granularity: Granularity, year: i32, subunit: u32) -> Self {
        Self {
            granularity,
            year,
            subunit,
        }
    }

    fn subunit_name(granularity: Granularity) -> &'static str {
        match granularity {
            Granularity::Month => "month",
            Granularity::Quarter => "quarter",
            Granularity::HalfYear => "half",
            Granularity::Year => "year",
        }
    }

    /// Parse a period string.
    ///
    /// The separator letter is case-insensitive (`2024-q2` == `2024-Q2`).
    /// Anything that does not yield an integer year and an in-range subunit
    /// is rejected with [`Error::MalformedPeriod`].
    pub fn parse(input: &str) -> Result<Self> {
        let s = input.trim().to_ascii_uppercase();

        let (granularity, year_str, sub_str) = if let Some((y, q)) = s.split_once("-Q") {
            (Granularity::Quarter, y, Some(q))
        } else if let Some((y, h)) = s.split_once("-H") {
            (Granularity::HalfYear, y, Some(h))
        } else if let Some((y, m)) = s.split_once('-') {
            (Granularity::Month, y, Some(m))
        } else {
            (Granularity::Year, s.as_str(), None)
        };

        let year = parse_component(year_str)
            .and_then(|y| i32::try_from(y).ok())
            .ok_or_else(|| Error::malformed(input, "year is not an integer"))?;

        let subunit = match sub_str {
            Some(sub) => parse_component(sub).ok_or_else(|| {
                Error::malformed(
                    input,
                    format!("{} is not an integer", Self::subunit_name(granularity)),
                )
            })?,
            None => 1,
        };

        Self::new(granularity, year, subunit).map_err(|e| match e {
            Error::MalformedPeriod { reason, .. } => Error::malformed(input, reason),
            other => other,
        })
    }

    /// The period of granularity `granularity` that contains `date`.
    pub fn containing(date: NaiveDate, granularity: Granularity) -> Self {
        let span = granularity.months();
        Self::from_parts(granularity, date.year(), (date.month() - 1) / span + 1)
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn subunit(&self) -> u32 {
        self.subunit
    }

    /// First calendar month (1-12) covered by this period.
    pub fn first_month(&self) -> u32 {
        (self.subunit - 1) * self.granularity.months() + 1
    }

    /// Fixed-width key whose lexicographic order is chronological.
    pub fn sort_key(&self) -> String {
        match self.granularity {
            Granularity::Month => format!("{:04}-{:02}", self.year, self.subunit),
            Granularity::Quarter => format!("{:04}-Q{}", self.year, self.subunit),
            Granularity::HalfYear => format!("{:04}-H{}", self.year, self.subunit),
            Granularity::Year => format!("{:04}", self.year),
        }
    }

    /// Map this period into the bucket that contains it at `target`.
    ///
    /// Returns `None` when this period is coarser than `target`: a coarse
    /// observation is never split across finer buckets.
    pub fn rollup_to(&self, target: Granularity) -> Option<Self> {
        if !self.granularity.rolls_into(target) {
            return None;
        }
        let subunit = (self.first_month() - 1) / target.months() + 1;
        Some(Self::from_parts(target, self.year, subunit))
    }

    /// The period immediately before this one at the same granularity.
    pub fn previous(&self) -> Self {
        if self.subunit == 1 {
            let last = 12 / self.granularity.months();
            Self::from_parts(self.granularity, self.year - 1, last)
        } else {
            Self::from_parts(self.granularity, self.year, self.subunit - 1)
        }
    }

    /// Human-friendly name (e.g., "March 2024", "Q2 2024").
    pub fn display_name(&self) -> String {
        match self.granularity {
            Granularity::Month => {
                let month_name = match self.subunit {
                    1 => "January",
                    2 => "February",
                    3 => "March",
                    4 => "April",
                    5 => "May",
                    6 => "June",
                    7 => "July",
                    8 => "August",
                    9 => "September",
                    10 => "October",
                    11 => "November",
                    12 => "December",
                    _ => "Unknown",
                };
                format!("{} {}", month_name, self.year)
            }
            Granularity::Quarter => format!("Q{} {}", self.subunit, self.year),
            Granularity::HalfYear => format!("H{} {}", self.subunit, self.year),
            Granularity::Year => format!("{}", self.year),
        }
    }
}

/// Digits only; rejects signs, blanks and anything `str::parse` would
/// otherwise accept loosely.
fn parse_component(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl Ord for Period {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.year, self.first_month(), self.granularity).cmp(&(
            other.year,
            other.first_month(),
            other.granularity,
        ))
    }
}

impl PartialOrd for Period {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.sort_key())
    }
}

impl std::str::FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Period {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.sort_key()
    }
}
