//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so the engine enforces consistent
//! invariants.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use uuid::Uuid;

use crate::{Currency, EngineError, ResultEngine};

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::InvalidId(format!("invalid {label} id")))
}

/// Parse a currency code stored in the DB into a strongly typed `Currency`.
pub(crate) fn model_currency(value: &str) -> ResultEngine<Currency> {
    Currency::try_from(value)
}

/// Resolve the UTC calendar-month range `[from, to)` containing `at`.
///
/// Budgets and duplicate detection are both evaluated over this range.
pub(crate) fn month_range(at: DateTime<Utc>) -> ResultEngine<(DateTime<Utc>, DateTime<Utc>)> {
    let invalid = || EngineError::InvalidDate("occurrence date out of range".to_string());

    let (year, month) = (at.year(), at.month());
    let from = Utc
        .with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .ok_or_else(invalid)?;
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let to = Utc
        .with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0)
        .single()
        .ok_or_else(invalid)?;
    Ok((from, to))
}

/// Trim an optional free-text field, mapping whitespace-only to empty.
pub(crate) fn normalize_text(value: &str) -> String {
    value.trim().to_string()
}
