use std::fmt::Write;

use chrono::NaiveDate;
use log::trace;

use crate::{PillError, Result};

/// Default reset marker layout, a US short date such as `1/2/2025`
pub const DEFAULT_DATE_FORMAT: &str = "%-m/%-d/%Y";

const REQUIRED_FIELDS_MESSAGE: &str = "All fields are required";
const INVALID_QUANTITY_MESSAGE: &str = "Quantity must be a valid number";

/// Renders `date` with a strftime layout. Bad layouts are reported instead of panicking.
pub fn format_marker(date: NaiveDate, format: &str) -> Result<String> {
    let mut marker = String::new();
    write!(marker, "{}", date.format(format)).map_err(|_| PillError::ConfigError {
        message: format!("Invalid date format: {}", format),
    })?;
    Ok(marker)
}

/// Today's reset marker in local time
pub fn today_marker(format: &str) -> Result<String> {
    format_marker(chrono::Local::now().date_naive(), format)
}

/// Fails unless every field has something other than whitespace in it
pub fn require_fields(fields: &[&str]) -> Result<()> {
    if fields.iter().any(|f| f.trim().is_empty()) {
        return Err(PillError::validation(REQUIRED_FIELDS_MESSAGE));
    }
    Ok(())
}

/// Parses a dose quantity typed by the user.
///
/// Accepts anything that reads as a finite number greater than zero with no
/// fractional part, ignoring surrounding whitespace (`" 2 "`, `"2.0"`, `"1e1"`).
/// Hex and binary literals such as `"0x10"` are not numbers here.
pub fn parse_quantity(raw: &str) -> Result<u32> {
    let trimmed = raw.trim();
    let invalid = || PillError::validation(INVALID_QUANTITY_MESSAGE);

    let value: f64 = trimmed.parse().map_err(|_| invalid())?;
    if !value.is_finite() || value <= 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
        trace!("Rejected quantity {:?}", raw);
        return Err(invalid());
    }

    Ok(value as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_uses_short_us_date_by_default() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        assert_eq!(format_marker(date, DEFAULT_DATE_FORMAT).unwrap(), "1/2/2025");

        let date = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
        assert_eq!(format_marker(date, DEFAULT_DATE_FORMAT).unwrap(), "12/31/2025");
    }

    #[test]
    fn marker_rejects_broken_format() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        assert!(matches!(
            format_marker(date, "%Y-%"),
            Err(PillError::ConfigError { .. })
        ));
    }

    #[test]
    fn quantity_accepts_positive_whole_numbers() {
        assert_eq!(parse_quantity("2").unwrap(), 2);
        assert_eq!(parse_quantity(" 3 ").unwrap(), 3);
        assert_eq!(parse_quantity("2.0").unwrap(), 2);
        assert_eq!(parse_quantity("1e1").unwrap(), 10);
    }

    #[test]
    fn quantity_rejects_everything_else() {
        for raw in ["-1", "0", "abc", "2.5", "inf", "NaN", "", "99999999999", "0x10", "0b11"] {
            let err = parse_quantity(raw).unwrap_err();
            assert!(err.is_validation(), "{raw:?} should be a validation error");
            assert_eq!(err.to_string(), INVALID_QUANTITY_MESSAGE);
        }
    }

    #[test]
    fn blank_fields_are_rejected() {
        assert!(require_fields(&["Aspirin", "2", "08:00"]).is_ok());

        let err = require_fields(&["Aspirin", "  ", "08:00"]).unwrap_err();
        assert_eq!(err.to_string(), REQUIRED_FIELDS_MESSAGE);
    }
}
