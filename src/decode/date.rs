//! Spreadsheet date serials.
//!
//! Dates typed into the workbook come back as day counts from the
//! spreadsheet epoch. Day 25569 is 1970-01-01.

use chrono::{Days, NaiveDate};

use super::text::sanitize;
use crate::types::CellValue;

/// Days between the spreadsheet serial epoch and the Unix epoch.
pub const SPREADSHEET_EPOCH_OFFSET: i64 = 25_569;

/// Numeric text at or below this value is not treated as a date serial.
pub const SERIAL_TEXT_THRESHOLD: f64 = 10_000.0;

/// Converts a day serial to a calendar date (UTC, time of day ignored).
///
/// Returns `None` for non-finite serials and serials outside chrono's range.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use limit_pacer::decode::serial_to_date;
///
/// assert_eq!(serial_to_date(45658.0), NaiveDate::from_ymd_opt(2025, 1, 1));
/// assert_eq!(serial_to_date(45658.75), NaiveDate::from_ymd_opt(2025, 1, 1));
/// ```
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    let days = serial.floor() - SPREADSHEET_EPOCH_OFFSET as f64;
    if days.abs() > i64::MAX as f64 / 2.0 {
        return None;
    }
    let days = days as i64;
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
    if days >= 0 {
        epoch.checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        epoch.checked_sub_days(Days::new(days.unsigned_abs()))
    }
}

/// Inverse of [`serial_to_date`].
pub fn date_to_serial(date: NaiveDate) -> i64 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN);
    (date - epoch).num_days() + SPREADSHEET_EPOCH_OFFSET
}

/// Decodes a deadline cell to `YYYY-MM-DD`.
///
/// Number cells are always serials. Text cells are serials only when they
/// parse as a number above [`SERIAL_TEXT_THRESHOLD`]; any other text is
/// passed through sanitized, on the assumption it is already ISO.
///
/// # Examples
///
/// ```
/// use limit_pacer::decode::decode_deadline;
/// use limit_pacer::CellValue;
///
/// assert_eq!(decode_deadline(&CellValue::Number(45658.0)), "2025-01-01");
/// assert_eq!(decode_deadline(&CellValue::text("45658")), "2025-01-01");
/// assert_eq!(decode_deadline(&CellValue::text("2025-01-01")), "2025-01-01");
/// assert_eq!(decode_deadline(&CellValue::text("42")), "42");
/// ```
pub fn decode_deadline(cell: &CellValue) -> String {
    match cell {
        CellValue::Number(serial) => serial_to_date(*serial)
            .map(format_date)
            .unwrap_or_else(|| cell.as_text()),
        CellValue::Text(raw) => {
            let trimmed = raw.trim();
            match trimmed.parse::<f64>() {
                Ok(serial) if serial > SERIAL_TEXT_THRESHOLD => serial_to_date(serial)
                    .map(format_date)
                    .unwrap_or_else(|| sanitize(raw)),
                _ => sanitize(raw),
            }
        },
        CellValue::Empty => String::new(),
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
