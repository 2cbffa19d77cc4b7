use chatflow_types::ValueType;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::LazyLock;
use tracing::warn;

use crate::substitute::value_to_string;

static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2}):(\d{2})(?::(\d{2}))?$").expect("valid time pattern"));

static DMY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})(?:\s+(\d{1,2}):(\d{2})(?::(\d{2}))?)?$")
        .expect("valid date pattern")
});

/// Epoch values below this are seconds, above it milliseconds.
const EPOCH_MILLIS_THRESHOLD: f64 = 1e11;

/// Type-aware comparison used by branching nodes. Total: an unrecognized
/// operator or an unparseable operand degrades to `false`, never a panic.
///
/// `left` is the resolved variable value (`None` when nothing resolved and
/// no fallback applied); `right` is the already-substituted literal side.
pub fn evaluate(left: Option<&Value>, right: &str, data_type: ValueType, operator: &str) -> bool {
    match operator {
        "isEmpty" => is_empty(left),
        "isNotEmpty" => !is_empty(left),
        "isTrue" => is_boolean(left, true),
        "isFalse" => is_boolean(left, false),
        "isDateAfter" => date_ordering(left, right) == Some(Ordering::Greater),
        "isDateBefore" => date_ordering(left, right) == Some(Ordering::Less),
        "==" | "!=" | ">" | "<" | ">=" | "<=" => compare(left, right, data_type, operator),
        "contains" | "startsWith" | "endsWith" => string_match(left, right, operator),
        other => {
            warn!(operator = other, "unrecognized condition operator");
            false
        }
    }
}

fn compare(left: Option<&Value>, right: &str, data_type: ValueType, operator: &str) -> bool {
    match data_type {
        ValueType::Number => {
            let (Some(l), Some(r)) = (left.and_then(value_to_f64), str_to_f64(right)) else {
                return false;
            };
            apply_ordering(l.partial_cmp(&r), operator)
        }
        ValueType::Date => {
            apply_ordering(date_ordering(left, right), operator)
        }
        ValueType::Boolean => {
            let (Some(l), Some(r)) = (left.and_then(value_to_bool), str_to_bool(right)) else {
                return false;
            };
            match operator {
                "==" => l == r,
                "!=" => l != r,
                _ => false,
            }
        }
        ValueType::String => {
            let l = left.map(value_to_string).unwrap_or_default();
            apply_ordering(Some(l.as_str().cmp(right)), operator)
        }
    }
}

fn apply_ordering(ordering: Option<Ordering>, operator: &str) -> bool {
    let Some(ordering) = ordering else {
        return false;
    };
    match operator {
        "==" => ordering == Ordering::Equal,
        "!=" => ordering != Ordering::Equal,
        ">" => ordering == Ordering::Greater,
        "<" => ordering == Ordering::Less,
        ">=" => ordering != Ordering::Less,
        "<=" => ordering != Ordering::Greater,
        _ => false,
    }
}

fn string_match(left: Option<&Value>, right: &str, operator: &str) -> bool {
    let l = left.map(value_to_string).unwrap_or_default().to_lowercase();
    let r = right.to_lowercase();
    match operator {
        "contains" => l.contains(&r),
        "startsWith" => l.starts_with(&r),
        "endsWith" => l.ends_with(&r),
        _ => false,
    }
}

fn is_empty(left: Option<&Value>) -> bool {
    match left {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

fn is_boolean(left: Option<&Value>, expected: bool) -> bool {
    left.and_then(value_to_bool) == Some(expected)
}

fn value_to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => str_to_bool(s),
        _ => None,
    }
}

fn str_to_bool(s: &str) -> Option<bool> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => str_to_f64(s),
        _ => None,
    }
}

fn str_to_f64(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok()
}

fn date_ordering(left: Option<&Value>, right: &str) -> Option<Ordering> {
    let l = left.and_then(parse_date_value)?;
    let r = parse_date_str(right)?;
    Some(l.cmp(&r))
}

/// Tolerant date coercion over a variable value. Returns `None` for
/// anything unparseable; comparisons against `None` are always false.
pub fn parse_date_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_f64().and_then(epoch_to_datetime),
        Value::String(s) => parse_date_str(s),
        _ => None,
    }
}

/// Tolerant date coercion over a string:
/// `HH:mm[:ss]` is today at that time, `dd/mm/yyyy[ HH:mm[:ss]]` is an
/// explicit construction, then RFC 3339 and common ISO forms, then a bare
/// epoch number (seconds below 1e11, milliseconds above).
pub fn parse_date_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(caps) = TIME_RE.captures(s) {
        let time = capture_time(&caps, 1)?;
        return Utc::now()
            .date_naive()
            .and_time(time)
            .and_local_timezone(Utc)
            .single();
    }

    if let Some(caps) = DMY_RE.captures(s) {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        let time = if caps.get(4).is_some() {
            capture_time(&caps, 4)?
        } else {
            NaiveTime::MIN
        };
        return date.and_time(time).and_local_timezone(Utc).single();
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return dt.and_local_timezone(Utc).single();
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_time(NaiveTime::MIN).and_local_timezone(Utc).single();
    }

    s.parse::<f64>().ok().and_then(epoch_to_datetime)
}

fn capture_time(caps: &regex::Captures<'_>, first_group: usize) -> Option<NaiveTime> {
    let hour: u32 = caps.get(first_group)?.as_str().parse().ok()?;
    let minute: u32 = caps.get(first_group + 1)?.as_str().parse().ok()?;
    let second: u32 = caps
        .get(first_group + 2)
        .map(|m| m.as_str().parse())
        .transpose()
        .ok()?
        .unwrap_or(0);
    NaiveTime::from_hms_opt(hour, minute, second)
}

fn epoch_to_datetime(n: f64) -> Option<DateTime<Utc>> {
    if !n.is_finite() {
        return None;
    }
    if n.abs() < EPOCH_MILLIS_THRESHOLD {
        Utc.timestamp_opt(n as i64, 0).single()
    } else {
        Utc.timestamp_millis_opt(n as i64).single()
    }
}

/// Whether `now` falls inside `[start, end]`, shifting the window across
/// midnight when `end < start` (an overnight range like 22:00-06:00).
pub fn in_time_window(now: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    if end < start {
        now >= start || now <= end
    } else {
        now >= start && now <= end
    }
}

/// Parses `HH:mm` or `HH:mm:ss` clock strings.
pub fn parse_clock(s: &str) -> Option<NaiveTime> {
    let caps = TIME_RE.captures(s.trim())?;
    capture_time(&caps, 1)
}

/// Parses a fixed UTC offset such as `"+02:00"` or `"-0330"`.
pub fn parse_utc_offset(s: &str) -> Option<chrono::FixedOffset> {
    let s = s.trim();
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => (1, s),
    };
    let digits: String = rest.chars().filter(|c| c.is_ascii_digit()).collect();
    let (hours, minutes): (i32, i32) = match digits.len() {
        1 | 2 => (digits.parse().ok()?, 0),
        4 => (digits[..2].parse().ok()?, digits[2..].parse().ok()?),
        _ => return None,
    };
    chrono::FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
