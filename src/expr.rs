// User-facing expressions: byte quantities ("4K") and relative dates ("now-7d", "begin").

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::error::ExprError;

/// Parse a byte quantity: a number with an optional binary suffix (B, K, M, G, T),
/// optionally followed by "B" or "iB". Case-insensitive. "4K" = 4096.
pub fn parse_bytes(expr: &str) -> Result<f64, ExprError> {
    let s = expr.trim();
    if s.is_empty() {
        return Err(ExprError::Empty);
    }
    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, suffix) = s.split_at(split);
    let value: f64 = number
        .parse()
        .map_err(|_| ExprError::InvalidBytes(expr.to_string()))?;

    let suffix = suffix.trim().to_ascii_uppercase();
    let unit = suffix
        .strip_suffix("IB")
        .or_else(|| suffix.strip_suffix('B').filter(|u| !u.is_empty()))
        .unwrap_or(&suffix);
    let multiplier: f64 = match unit {
        "" | "B" => 1.0,
        "K" => 1024.0,
        "M" => 1024.0 * 1024.0,
        "G" => 1024.0 * 1024.0 * 1024.0,
        "T" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        _ => return Err(ExprError::InvalidBytes(expr.to_string())),
    };
    Ok(value * multiplier)
}

/// Resolve a date expression `[<reference>[+-]]<count>[suffix]` against the store bounds.
///
/// References: `now`, `begin`, `end`, `today`, `lastweek`, `lastmonth`. Suffixes:
/// `s m h d w M y` (M = 30 days, y = 365 days, none = seconds). A bare count is relative
/// to `now` going back. RFC 3339 timestamps and `YYYY-MM-DD` dates are taken verbatim.
pub fn parse_date(
    expr: &str,
    begin: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, ExprError> {
    let s = expr.trim();
    if s.is_empty() {
        return Err(ExprError::Empty);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(day) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return day
            .and_hms_opt(0, 0, 0)
            .map(|d| d.and_utc())
            .ok_or_else(|| ExprError::InvalidDate(expr.to_string()));
    }

    let ref_len = s
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(s.len());
    let (reference, rest) = s.split_at(ref_len);

    let base = match reference {
        "" | "now" => now,
        "begin" => begin.ok_or(ExprError::NoReference(expr.to_string(), "begin"))?,
        "end" => end.ok_or(ExprError::NoReference(expr.to_string(), "end"))?,
        "today" => now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|d| d.and_utc())
            .ok_or_else(|| ExprError::InvalidDate(expr.to_string()))?,
        "lastweek" => now
            .checked_sub_signed(Duration::days(7))
            .ok_or_else(|| ExprError::InvalidDate(expr.to_string()))?,
        "lastmonth" => now
            .checked_sub_signed(Duration::days(30))
            .ok_or_else(|| ExprError::InvalidDate(expr.to_string()))?,
        _ => return Err(ExprError::InvalidDate(expr.to_string())),
    };

    if rest.is_empty() {
        return Ok(base);
    }

    let (sign, amount) = match rest.as_bytes()[0] {
        b'-' => (-1, &rest[1..]),
        b'+' => (1, &rest[1..]),
        // bare count: "7d" means "now-7d"
        _ if reference.is_empty() => (-1, rest),
        _ => return Err(ExprError::InvalidDate(expr.to_string())),
    };
    let offset = parse_offset(amount).ok_or_else(|| ExprError::InvalidDate(expr.to_string()))?;
    base.checked_add_signed(offset * sign)
        .ok_or_else(|| ExprError::InvalidDate(expr.to_string()))
}

fn parse_offset(s: &str) -> Option<Duration> {
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (count, suffix) = s.split_at(split);
    let count: i64 = count.parse().ok()?;
    let secs_per_unit: i64 = match suffix {
        "" | "s" => 1,
        "m" => 60,
        "h" => 3_600,
        "d" => 86_400,
        "w" => 7 * 86_400,
        "M" => 30 * 86_400,
        "y" => 365 * 86_400,
        _ => return None,
    };
    Duration::try_seconds(count.checked_mul(secs_per_unit)?)
}
