//! Completion date parsing.
//!
//! The completion record of a project is free text as far as the
//! calculator is concerned. Accepted forms:
//!
//! | Input | Anchor |
//! |-------|--------|
//! | `2026-03-31` | that date |
//! | `2026-03-31T09:00:00Z` | the date part |
//! | `2026/03/31` | that date |
//! | `2026-03` | last day of the month |

use chrono::{Months, NaiveDate};

/// Parses a completion date or month.
///
/// Returns `None` for anything unparsable; callers treat that as "no
/// timeline available".
pub fn parse_completion_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }

    // Datetime: take the date part
    if let Some(prefix) = raw.get(..10) {
        if raw.len() > 10 {
            if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
                return Some(date);
            }
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y/%m/%d") {
        return Some(date);
    }

    // Month only: anchor at the last day
    let first = NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d").ok()?;
    first.checked_add_months(Months::new(1))?.pred_opt()
}
