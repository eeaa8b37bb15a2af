use chrono::NaiveDate;

use crate::error::{Error, Result};

/// Dates travel as `YYYY-MM-DD` in every body format.
pub fn parse_date(field: &str, raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| Error::BadRequest(format!("{} must be a date (YYYY-MM-DD)", field)))
}

pub fn require_text(field: &str, value: Option<String>) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(Error::BadRequest(format!("{} is required", field))),
    }
}
