// Expression parsing tests: byte quantities and relative dates

use chrono::{Duration, TimeZone, Utc};
use vmidle::error::ExprError;
use vmidle::expr::{parse_bytes, parse_date};

#[test]
fn parse_bytes_plain_and_suffixed() {
    assert_eq!(parse_bytes("512"), Ok(512.0));
    assert_eq!(parse_bytes("4K"), Ok(4096.0));
    assert_eq!(parse_bytes("4k"), Ok(4096.0));
    assert_eq!(parse_bytes("4KB"), Ok(4096.0));
    assert_eq!(parse_bytes("4KiB"), Ok(4096.0));
    assert_eq!(parse_bytes("1.5M"), Ok(1.5 * 1024.0 * 1024.0));
    assert_eq!(parse_bytes("2G"), Ok(2.0 * 1024.0 * 1024.0 * 1024.0));
    assert_eq!(parse_bytes("100B"), Ok(100.0));
    assert_eq!(parse_bytes(" 8 M "), Ok(8.0 * 1024.0 * 1024.0));
}

#[test]
fn parse_bytes_rejects_garbage() {
    assert_eq!(parse_bytes(""), Err(ExprError::Empty));
    assert!(matches!(parse_bytes("K"), Err(ExprError::InvalidBytes(_))));
    assert!(matches!(parse_bytes("4X"), Err(ExprError::InvalidBytes(_))));
    assert!(matches!(parse_bytes("four"), Err(ExprError::InvalidBytes(_))));
}

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 10, 15, 30, 0).unwrap()
}

fn begin() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap()
}

fn end() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 9, 23, 59, 0).unwrap()
}

fn date(expr: &str) -> Result<chrono::DateTime<Utc>, ExprError> {
    parse_date(expr, Some(begin()), Some(end()), now())
}

#[test]
fn parse_date_references() {
    assert_eq!(date("now"), Ok(now()));
    assert_eq!(date("begin"), Ok(begin()));
    assert_eq!(date("end"), Ok(end()));
    assert_eq!(date("today"), Ok(Utc.with_ymd_and_hms(2024, 5, 10, 0, 0, 0).unwrap()));
    assert_eq!(date("lastweek"), Ok(now() - Duration::days(7)));
    assert_eq!(date("lastmonth"), Ok(now() - Duration::days(30)));
}

#[test]
fn parse_date_offsets() {
    assert_eq!(date("now-7d"), Ok(now() - Duration::days(7)));
    assert_eq!(date("begin+2h"), Ok(begin() + Duration::hours(2)));
    assert_eq!(date("end-30m"), Ok(end() - Duration::minutes(30)));
    assert_eq!(date("now-1w"), Ok(now() - Duration::weeks(1)));
    assert_eq!(date("now-1M"), Ok(now() - Duration::days(30)));
    assert_eq!(date("now-1y"), Ok(now() - Duration::days(365)));
    assert_eq!(date("now-90"), Ok(now() - Duration::seconds(90)));
}

#[test]
fn parse_date_bare_count_goes_back_from_now() {
    assert_eq!(date("3d"), Ok(now() - Duration::days(3)));
}

#[test]
fn parse_date_absolute_forms() {
    assert_eq!(
        date("2024-01-02T03:04:05Z"),
        Ok(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap())
    );
    assert_eq!(
        date("2024-01-02"),
        Ok(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap())
    );
}

#[test]
fn parse_date_needs_store_bounds_for_begin_and_end() {
    let err = parse_date("begin", None, None, now()).unwrap_err();
    assert!(matches!(err, ExprError::NoReference(_, "begin")));
    assert!(parse_date("now-1d", None, None, now()).is_ok());
}

#[test]
fn parse_date_rejects_garbage() {
    assert_eq!(date(""), Err(ExprError::Empty));
    assert!(matches!(date("yesterday"), Err(ExprError::InvalidDate(_))));
    assert!(matches!(date("now-7x"), Err(ExprError::InvalidDate(_))));
    assert!(matches!(date("now*2"), Err(ExprError::InvalidDate(_))));
}

#[test]
fn parse_date_out_of_range_offsets_are_errors() {
    assert!(matches!(
        date("now-10000000000000000s"),
        Err(ExprError::InvalidDate(_))
    ));
    assert!(matches!(date("now+400000y"), Err(ExprError::InvalidDate(_))));
    assert!(matches!(
        date("begin-99999999999999999999d"),
        Err(ExprError::InvalidDate(_))
    ));
}
