//! Invoice dates.
//!
//! The extractor reports dates as the text it found; [`parse_invoice_date`]
//! turns that text into a calendar date for callers that need one.

use chrono::NaiveDate;

use super::patterns::{DATE_DMY, DATE_LONG, DATE_YMD};

/// The first date-shaped substring of `text`, by position.
pub fn find_date(text: &str) -> Option<&str> {
    [&*DATE_DMY, &*DATE_YMD, &*DATE_LONG]
        .into_iter()
        .filter_map(|pattern| pattern.find(text))
        .min_by_key(|m| m.start())
        .map(|m| m.as_str())
}

/// Parse a date as it appears on an invoice.
///
/// Accepts `15/01/2024`, `15-01-24`, `15.01.2024` (day first), `2024-01-15`
/// and `15 Jan 2024` / `15 January 2024`. Two-digit years 00-50 are read
/// as 20xx, 51-99 as 19xx.
pub fn parse_invoice_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    if let Some(caps) = DATE_YMD.captures(raw) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }

    if let Some(caps) = DATE_DMY.captures(raw) {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let year = parse_year(&caps[3])?;
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }

    if let Some(caps) = DATE_LONG.captures(raw) {
        let day: u32 = caps[1].parse().ok()?;
        let month = month_number(&caps[2])?;
        let year: i32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    None
}

fn parse_year(s: &str) -> Option<i32> {
    let year: i32 = s.parse().ok()?;
    Some(match year {
        0..=50 => 2000 + year,
        51..=99 => 1900 + year,
        _ => year,
    })
}

fn month_number(abbr: &str) -> Option<u32> {
    let month = match abbr.to_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" | "sept" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_find_date() {
        assert_eq!(find_date("Date: 15/01/2024 Cust: X"), Some("15/01/2024"));
        assert_eq!(find_date("issued 2024-01-15"), Some("2024-01-15"));
        assert_eq!(find_date("on 3 March 2024, paid"), Some("3 March 2024"));
        assert_eq!(find_date("PI No: 4410"), None);
    }

    #[test]
    fn test_find_date_earliest_wins() {
        assert_eq!(find_date("12 Jan 2024 then 13/01/2024"), Some("12 Jan 2024"));
    }

    #[test]
    fn test_parse_day_first() {
        assert_eq!(parse_invoice_date("15/01/2024"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_invoice_date("15-01-2024"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_invoice_date("15.01.2024"), Some(ymd(2024, 1, 15)));
    }

    #[test]
    fn test_parse_two_digit_year() {
        assert_eq!(parse_invoice_date("15/01/24"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_invoice_date("15/01/98"), Some(ymd(1998, 1, 15)));
    }

    #[test]
    fn test_parse_iso_and_long() {
        assert_eq!(parse_invoice_date("2024-01-15"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_invoice_date("12 Jan 2024"), Some(ymd(2024, 1, 12)));
        assert_eq!(parse_invoice_date("12 January 2024"), Some(ymd(2024, 1, 12)));
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(parse_invoice_date("31/02/2024"), None);
        assert_eq!(parse_invoice_date("soon"), None);
    }
}
