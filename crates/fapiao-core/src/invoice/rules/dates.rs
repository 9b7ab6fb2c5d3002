//! Invoice date parsing and formatting.

use chrono::NaiveDate;

use super::patterns::{DATE_COMPACT, DATE_YMD};

/// Parse an invoice date.
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, `YYYY.MM.DD`, `YYYY年M月D日` (single or
/// double digit month/day) and `YYYYMMDD`. The result must be a real
/// calendar date.
pub fn parse_invoice_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    let caps = DATE_YMD.captures(s).or_else(|| DATE_COMPACT.captures(s))?;
    let year: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let day: u32 = caps[3].parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Render a date as `YYYY-MM-DD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse and re-render a date as `YYYY-MM-DD`.
pub fn normalize_date(s: &str) -> Option<String> {
    parse_invoice_date(s).map(format_date)
}
