//! Small shared helpers

use chrono::NaiveDate;

/// Parse a date string in any of the forms the API is known to emit:
/// ISO datetime (`2025-07-15T00:00:00`), ISO date (`2025-07-15`) or
/// `DD/MM/YYYY`. Returns `None` for anything else; callers decide
/// whether an unparseable date is tolerable or a data-shape error.
pub fn parse_date_flexible(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d);
    }
    NaiveDate::parse_from_str(raw, "%d/%m/%Y").ok()
}
