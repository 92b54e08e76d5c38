//! Conversion of loosely typed backend values into the domain model.

use super::{CategoryActual, CategoryTarget};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use sanddollar_api::endpoints::{
    ai_budget::{CategoryActualEntry, CategoryTargetEntry},
    Amount,
};
use serde_json::Value;

pub const DEFAULT_TARGET_REASON: &str = "AI recommended target";

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Canonical `YYYY-MM` for the current local month when `raw` is unusable.
pub fn normalize_month(raw: Option<&str>) -> String {
    normalize_month_at(raw, Local::now().date_naive())
}

/// Canonical `YYYY-MM` form of a month label.
///
/// Values already shaped like `YYYY-MM` pass through untouched, anything else
/// that parses as a date is reduced to its year and month, and the rest falls
/// back to `today`.
pub fn normalize_month_at(raw: Option<&str>, today: NaiveDate) -> String {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return format_month(today);
    };

    if is_year_month(raw) {
        return raw.to_string();
    }

    format_month(parse_date(raw).unwrap_or(today))
}

fn format_month(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

fn is_year_month(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 7
        && bytes[4] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || b.is_ascii_digit())
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Some(dt) = DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(dt.date());
    }
    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
    {
        return Some(date);
    }

    // Month labels without a day ("March 2025", "Mar 2025")
    let with_day = format!("1 {}", s);
    ["%d %B %Y", "%d %b %Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&with_day, fmt).ok())
}

/// Lenient numeric coercion. Never fails; unusable input yields `0.0`.
pub fn to_number(value: &Amount) -> f64 {
    let number = match value {
        Amount::Number(n) => *n,
        Amount::Text(s) => parse_leading_number(s),
        Amount::Other(value) => value_to_number(value),
    };

    if number.is_finite() {
        number
    } else {
        0.0
    }
}

fn value_to_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => parse_leading_number(s),
        // Arrays stringify as their comma-joined elements
        Value::Array(items) => {
            let joined = items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(",");
            parse_leading_number(&joined)
        }
        Value::Null | Value::Bool(_) | Value::Object(_) => 0.0,
    }
}

/// Parse the longest numeric prefix of `s` (`"12.5abc"` is `12.5`).
///
/// Leading whitespace and a sign are accepted, as are a fraction and an
/// exponent. Anything without digits is `0.0`.
pub fn parse_leading_number(s: &str) -> f64 {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if digits > 0 || frac_end > frac_start {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }

    if digits == 0 {
        return 0.0;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().unwrap_or(0.0)
}

pub fn map_actual_entry(entry: &CategoryActualEntry) -> CategoryActual {
    CategoryActual {
        category: entry.category.clone(),
        actual: to_number(&entry.actual),
        target: entry.target.as_ref().map(to_number),
    }
}

pub fn map_target_entry(entry: &CategoryTargetEntry) -> CategoryTarget {
    let reason = entry
        .reason
        .as_deref()
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_TARGET_REASON);
    CategoryTarget::new(entry.category.clone(), to_number(&entry.target), reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    #[test]
    fn keeps_year_month_unchanged() {
        assert_eq!(normalize_month_at(Some("2025-01"), today()), "2025-01");
        assert_eq!(normalize_month_at(Some("1999-12"), today()), "1999-12");
    }

    #[test]
    fn reduces_full_dates_to_month() {
        assert_eq!(normalize_month_at(Some("2025-01-01"), today()), "2025-01");
        assert_eq!(normalize_month_at(Some("2024-11-30T23:00:00Z"), today()), "2024-11");
        assert_eq!(normalize_month_at(Some("2024-07-04T10:15:00"), today()), "2024-07");
        assert_eq!(normalize_month_at(Some("02/15/2025"), today()), "2025-02");
        assert_eq!(normalize_month_at(Some("March 2025"), today()), "2025-03");
        assert_eq!(normalize_month_at(Some("Aug 9, 2023"), today()), "2023-08");
    }

    #[test]
    fn falls_back_to_today() {
        assert_eq!(normalize_month_at(None, today()), "2025-03");
        assert_eq!(normalize_month_at(Some(""), today()), "2025-03");
        assert_eq!(normalize_month_at(Some("not a month"), today()), "2025-03");
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in ["2025-01-01", "garbage", "December 2024", "2023-06"] {
            let once = normalize_month_at(Some(raw), today());
            assert_eq!(normalize_month_at(Some(&once), today()), once);
        }
    }

    #[test]
    fn converts_numbers_and_strings() {
        assert_eq!(to_number(&Amount::from(42.5)), 42.5);
        assert_eq!(to_number(&Amount::from("1250.00")), 1250.0);
        assert_eq!(to_number(&Amount::from("12.5abc")), 12.5);
        assert_eq!(to_number(&Amount::from("  -3")), -3.0);
        assert_eq!(to_number(&Amount::from(".5")), 0.5);
        assert_eq!(to_number(&Amount::from("1e3 dollars")), 1000.0);
        assert_eq!(to_number(&Amount::from("7e")), 7.0);
    }

    #[test]
    fn unusable_values_are_zero() {
        assert_eq!(to_number(&Amount::from("abc")), 0.0);
        assert_eq!(to_number(&Amount::from("")), 0.0);
        assert_eq!(to_number(&Amount::from("-")), 0.0);
        assert_eq!(to_number(&Amount::from(".")), 0.0);
        assert_eq!(to_number(&Amount::from("1e400")), 0.0);
        assert_eq!(to_number(&Amount::Other(Value::Null)), 0.0);
        assert_eq!(to_number(&Amount::Other(json!(true))), 0.0);
        assert_eq!(to_number(&Amount::Other(json!({"value": 3}))), 0.0);
    }

    #[test]
    fn arrays_use_joined_text() {
        assert_eq!(to_number(&Amount::Other(json!([5]))), 5.0);
        assert_eq!(to_number(&Amount::Other(json!(["8.25", 1]))), 8.25);
        assert_eq!(to_number(&Amount::Other(json!([]))), 0.0);
    }

    #[test]
    fn maps_entries() {
        let actual = map_actual_entry(&CategoryActualEntry {
            category: "Rent".into(),
            actual: Amount::from("1500"),
            target: None,
        });
        assert_eq!(actual, CategoryActual::new("Rent", 1500.0));

        let target = map_target_entry(&CategoryTargetEntry {
            category: "Rent".into(),
            target: Amount::from("oops"),
            reason: Some(String::new()),
        });
        assert_eq!(target.target, 0.0);
        assert_eq!(target.reason, DEFAULT_TARGET_REASON);
    }
}
