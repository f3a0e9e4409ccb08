//! Working-day calendar and duration arithmetic.
//!
//! Defines which dates count as business days and subtracts task durations
//! from an anchor date.
//!
//! # Day Model
//! All dates are `NaiveDate` values with no time zone. A date is a business
//! day iff:
//! - It falls on Monday through Friday, AND
//! - It is NOT listed in `holidays`.
//!
//! Calendar-day arithmetic ignores the calendar entirely.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{DurationUnit, TaskDuration};

/// Business-day calendar.
///
/// Weekends are always non-working. Holidays are additional blocked
/// dates and override the weekday rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Calendar {
    /// Calendar identifier.
    pub id: String,
    /// Dates that are never business days.
    pub holidays: BTreeSet<NaiveDate>,
}

impl Calendar {
    /// Creates a calendar with no holidays (weekends only).
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            holidays: BTreeSet::new(),
        }
    }

    /// Creates the plain Monday-to-Friday calendar.
    pub fn weekdays() -> Self {
        Self::new("weekdays")
    }

    /// Adds a holiday.
    pub fn with_holiday(mut self, date: NaiveDate) -> Self {
        self.holidays.insert(date);
        self
    }

    /// Whether `date` is a business day.
    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        // Holidays first (they override)
        if self.holidays.contains(&date) {
            return false;
        }
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    /// Steps back `days` business days from `from`.
    ///
    /// `from` itself is never counted: subtracting 1 business day from a
    /// Monday yields the previous Friday. Zero returns `from` unchanged.
    /// Saturates at `NaiveDate::MIN`.
    ///
    /// Whole weeks are skipped at once (any 7 consecutive days hold 5
    /// weekdays, less the holidays among them), so the cost depends on the
    /// number of holidays crossed rather than on `days`.
    pub fn sub_business_days(&self, from: NaiveDate, days: u32) -> NaiveDate {
        let mut current = from;
        let mut remaining = u64::from(days);

        // Leave at least one day for the stepwise walk
        loop {
            let weeks = remaining.saturating_sub(1) / 5;
            if weeks == 0 {
                break;
            }
            let Some(target) = current.checked_sub_days(Days::new(weeks * 7)) else {
                return NaiveDate::MIN;
            };
            let blocked = self.weekday_holidays(target, current);
            remaining -= weeks * 5 - blocked;
            current = target;
        }

        while remaining > 0 {
            match current.pred_opt() {
                Some(prev) => current = prev,
                None => break,
            }
            if self.is_business_day(current) {
                remaining -= 1;
            }
        }
        current
    }

    /// Steps back `days` calendar days from `from`.
    pub fn sub_calendar_days(&self, from: NaiveDate, days: u32) -> NaiveDate {
        from.checked_sub_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MIN)
    }

    /// Start date of a span of `duration` that ends on `end`.
    pub fn start_for(&self, end: NaiveDate, duration: TaskDuration) -> NaiveDate {
        match duration.unit {
            DurationUnit::BusinessDays => self.sub_business_days(end, duration.amount),
            DurationUnit::CalendarDays => self.sub_calendar_days(end, duration.amount),
        }
    }

    /// Holidays falling on a weekday in `[start, end)`.
    fn weekday_holidays(&self, start: NaiveDate, end: NaiveDate) -> u64 {
        self.holidays
            .range(start..end)
            .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
            .count() as u64
    }
}
