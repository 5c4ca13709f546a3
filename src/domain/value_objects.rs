//! # Domain Value Objects
//!
//! Immutable value types for the crawl cursor: the day being harvested and
//! the page to fetch next.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;
use thiserror::Error;

/// Compact `YYYYMMDD` format used by the remote query and by contract numbers
pub const COMPACT_DATE_FORMAT: &str = "%Y%m%d";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("'{0}' is not an 8-digit YYYYMMDD date")]
    InvalidDate(String),

    #[error("page number must be >= 1, got {0}")]
    InvalidPage(u64),

    #[error("date {0} has no successor")]
    DateOverflow(String),
}

/// A single calendar day targeted by a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TargetDate(NaiveDate);

impl TargetDate {
    #[must_use]
    pub const fn from_naive(date: NaiveDate) -> Self {
        Self(date)
    }

    #[must_use]
    pub const fn as_naive(&self) -> NaiveDate {
        self.0
    }

    /// `YYYYMMDD`, the prefix every contract number of this day starts with
    #[must_use]
    pub fn compact(&self) -> String {
        self.0.format(COMPACT_DATE_FORMAT).to_string()
    }

    /// The following calendar day
    pub fn succ(&self) -> Result<Self, ValueError> {
        self.0
            .checked_add_days(Days::new(1))
            .map(Self)
            .ok_or_else(|| ValueError::DateOverflow(self.compact()))
    }
}

impl FromStr for TargetDate {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValueError::InvalidDate(s.to_string()));
        }
        NaiveDate::parse_from_str(s, COMPACT_DATE_FORMAT)
            .map(Self)
            .map_err(|_| ValueError::InvalidDate(s.to_string()))
    }
}

impl TryFrom<String> for TargetDate {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TargetDate> for String {
    fn from(value: TargetDate) -> Self {
        value.compact()
    }
}

impl fmt::Display for TargetDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.compact())
    }
}

/// Durable resumption cursor: `{target_date, next_page}`.
///
/// Only two forward transitions exist: [`Checkpoint::advance_within_date`]
/// and [`Checkpoint::roll_to_next_date`]. `next_page` is never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    target_date: TargetDate,
    next_page: NonZeroU32,
}

impl Checkpoint {
    pub fn new(target_date: TargetDate, next_page: u32) -> Result<Self, ValueError> {
        let next_page =
            NonZeroU32::new(next_page).ok_or(ValueError::InvalidPage(u64::from(next_page)))?;
        Ok(Self {
            target_date,
            next_page,
        })
    }

    /// Page 1 of the given date
    #[must_use]
    pub const fn start_of(target_date: TargetDate) -> Self {
        Self {
            target_date,
            next_page: NonZeroU32::MIN,
        }
    }

    #[must_use]
    pub const fn target_date(&self) -> TargetDate {
        self.target_date
    }

    #[must_use]
    pub const fn next_page(&self) -> u32 {
        self.next_page.get()
    }

    /// `{D, P}` -> `{D, P+1}`
    #[must_use]
    pub const fn advance_within_date(&self) -> Self {
        Self {
            target_date: self.target_date,
            next_page: self.next_page.saturating_add(1),
        }
    }

    /// `{D, P}` -> `{D+1, 1}`
    pub fn roll_to_next_date(&self) -> Result<Self, ValueError> {
        Ok(Self::start_of(self.target_date.succ()?))
    }

    /// True when `other` would move the cursor backwards on the same date
    #[must_use]
    pub fn regresses_to(&self, other: &Self) -> bool {
        other.target_date < self.target_date
            || (other.target_date == self.target_date && other.next_page < self.next_page)
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / page {}", self.target_date, self.next_page)
    }
}
