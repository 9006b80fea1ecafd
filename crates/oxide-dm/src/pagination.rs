//! LIMIT/OFFSET clause generation.

use std::fmt::Display;
use std::num::ParseIntError;

use crate::error::{DialectError, Result};

/// Builds the pagination suffix of a SELECT statement.
///
/// Values are rendered with `Display` and parsed as signed integers, so
/// numbers and numeric strings are both accepted. A negative limit drops the
/// whole clause; a negative offset drops only the offset. An offset is never
/// emitted without a limit.
///
/// # Errors
///
/// Returns [`DialectError::InvalidPagination`] if a value is not an integer.
///
/// # Example
///
/// ```
/// use oxide_dm::pagination::limit_and_offset_sql;
///
/// assert_eq!(limit_and_offset_sql(Some(&10), Some(&5)).unwrap(), " LIMIT 10 OFFSET 5");
/// assert_eq!(limit_and_offset_sql(Some(&"-1"), Some(&5)).unwrap(), "");
/// ```
pub fn limit_and_offset_sql(limit: Option<&dyn Display>, offset: Option<&dyn Display>) -> Result<String> {
    let mut sql = String::new();

    let Some(limit) = limit else {
        return Ok(sql);
    };
    let limit = parse_clause("LIMIT", limit)?;
    if limit < 0 {
        return Ok(sql);
    }
    sql.push_str(&format!(" LIMIT {limit}"));

    if let Some(offset) = offset {
        let offset = parse_clause("OFFSET", offset)?;
        if offset >= 0 {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
    }

    Ok(sql)
}

fn parse_clause(clause: &'static str, value: &dyn Display) -> Result<i64> {
    let value = value.to_string();
    parse_int(&value).map_err(|source| DialectError::InvalidPagination {
        clause,
        value,
        source,
    })
}

/// Parses an integer with an optional sign and `0x`, `0o` or `0b` prefix.
fn parse_int(value: &str) -> std::result::Result<i64, ParseIntError> {
    let (negative, digits) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };

    let (radix, digits) = match digits.get(..2) {
        Some("0x" | "0X") => (16, &digits[2..]),
        Some("0o" | "0O") => (8, &digits[2..]),
        Some("0b" | "0B") => (2, &digits[2..]),
        _ => (10, digits),
    };

    // Only one sign, ahead of the radix prefix; the raw value never parses.
    if digits.starts_with(['+', '-']) {
        return value.parse();
    }

    // Re-attach the sign so i64::MIN still parses.
    if negative {
        i64::from_str_radix(&format!("-{digits}"), radix)
    } else {
        i64::from_str_radix(digits, radix)
    }
}
