//! Fiscal-year conventions.
//!
//! The reporting year rolls over on the first of October, and stored years
//! are Gregorian. Displayed years carry a fixed Buddhist-era offset; the
//! offset is presentation-only and must never be applied before persistence.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Month that opens a new fiscal year.
pub const FISCAL_YEAR_START_MONTH: u32 = 10;

/// Offset between the stored Gregorian year and the displayed era year.
pub const DISPLAY_YEAR_OFFSET: i32 = 543;

/// A 12-month reporting period, identified by the Gregorian year it ends in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct FiscalYear(pub i32);

impl FiscalYear {
    /// Fiscal year containing the given calendar date.
    pub fn containing(date: NaiveDate) -> Self {
        if date.month() >= FISCAL_YEAR_START_MONTH {
            Self(date.year() + 1)
        } else {
            Self(date.year())
        }
    }

    /// Era year shown to users. Never persisted.
    pub const fn display_year(self) -> i32 {
        self.0 + DISPLAY_YEAR_OFFSET
    }

    /// Inverse of [`FiscalYear::display_year`], for parsing user input.
    pub const fn from_display(display: i32) -> Self {
        Self(display - DISPLAY_YEAR_OFFSET)
    }

    pub fn starts_on(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.0 - 1, FISCAL_YEAR_START_MONTH, 1)
            .expect("fiscal year start is a valid date")
    }
}

impl fmt::Display for FiscalYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FY{}", self.display_year())
    }
}

/// Year scoping applied to assessment and budget roll-ups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YearFilter {
    All,
    One(FiscalYear),
}

impl YearFilter {
    pub fn matches(self, year: FiscalYear) -> bool {
        match self {
            Self::All => true,
            Self::One(selected) => selected == year,
        }
    }
}
