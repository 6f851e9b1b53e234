//! Primitive checks shared by compiled pipelines and hand-written validators
//!
//! Every function here is pure: it inspects a JSON value and either returns
//! the (possibly coerced) value or reports that the check does not hold.
//! Error reporting is the caller's job.

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::cmp::Ordering;
use std::fmt;

/// Largest integer an f64 represents exactly (2^53)
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Comparison operator used by `compare(...)` and `length(...)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Ne,
}

impl CompareOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            ">" => Some(CompareOp::Gt),
            ">=" => Some(CompareOp::Gte),
            "<" => Some(CompareOp::Lt),
            "<=" => Some(CompareOp::Lte),
            "=" => Some(CompareOp::Eq),
            "!=" => Some(CompareOp::Ne),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
        }
    }

    /// Whether `value <op> bound` holds given `value.cmp(bound)`
    pub fn holds(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Gte => ordering != Ordering::Less,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Lte => ordering != Ordering::Greater,
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/* ===================== Type checks ===================== */

/// Numbers, numeric strings and booleans; yields a JSON number
pub fn number(value: &Value) -> Option<Value> {
    match value {
        Value::Number(_) => Some(value.clone()),
        Value::Bool(b) => Some(Value::from(u8::from(*b))),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            let parsed: f64 = trimmed.parse().ok()?;
            parsed.is_finite().then(|| number_value(parsed))
        }
        _ => None,
    }
}

/// JSON strings only
pub fn string(value: &Value) -> Option<Value> {
    value.is_string().then(|| value.clone())
}

/// `true`, `false`, `0`, `1`, `"0"`, `"1"`, `"true"`, `"false"`
pub fn boolean(value: &Value) -> Option<Value> {
    let flag = match value {
        Value::Bool(b) => *b,
        Value::Number(n) => match n.as_f64() {
            Some(f) if f == 0.0 => false,
            Some(f) if f == 1.0 => true,
            _ => return None,
        },
        Value::String(s) => match s.as_str() {
            "0" | "false" => false,
            "1" | "true" => true,
            _ => return None,
        },
        _ => return None,
    };
    Some(Value::Bool(flag))
}

/// Numbers without a fractional part. Does not coerce.
pub fn integer(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(value.clone()),
        Value::Number(n) => n
            .as_f64()
            .filter(|f| f.fract() == 0.0)
            .map(|_| value.clone()),
        _ => None,
    }
}

/// RFC 3339 / `YYYY-MM-DD` strings or epoch milliseconds; yields epoch milliseconds
pub fn date(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()).map(number_value),
        Value::String(s) => parse_date_millis(s).map(Value::from),
        _ => None,
    }
}

pub fn empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/* ===================== Relations ===================== */

/// Length of a string (in chars) or of an array
pub fn length(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

/// Same type and same value. Arrays and objects never compare equal.
pub fn strict_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => false,
    }
}

/// `value <op> bound` for values of the same JSON type.
///
/// A numeric value may be compared against a date string bound; the bound
/// is converted to epoch milliseconds first.
pub fn compare(value: &Value, bound: &Value, op: CompareOp) -> bool {
    let ordering = match (value, bound) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
        (Value::Number(a), Value::String(b)) => match (a.as_f64(), parse_date_millis(b)) {
            (Some(a), Some(b)) => a.partial_cmp(&(b as f64)),
            _ => None,
        },
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    };

    ordering.map_or(false, |ordering| op.holds(ordering))
}

pub fn matches(pattern: &Regex, value: &Value) -> bool {
    as_text(value).map_or(false, |text| pattern.is_match(&text))
}

pub fn one_of(value: &Value, candidates: &[Value]) -> bool {
    !value.is_null() && candidates.iter().any(|c| strict_equals(value, c))
}

/* ===================== Helpers ===================== */

/// String form of a scalar, `None` for null, arrays and objects
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(number_text(n)),
        _ => None,
    }
}

fn number_text(n: &Number) -> String {
    match (n.as_i64(), n.as_f64()) {
        (Some(i), _) => i.to_string(),
        (None, Some(f)) if f.fract() == 0.0 && f.abs() < MAX_SAFE_INTEGER => {
            (f as i64).to_string()
        }
        _ => n.to_string(),
    }
}

/// Integral floats become JSON integers so `"3"` coerces to `3`, not `3.0`
pub(crate) fn number_value(f: f64) -> Value {
    if f.fract() == 0.0 && f.abs() < MAX_SAFE_INTEGER {
        Value::from(f as i64)
    } else {
        Number::from_f64(f).map_or(Value::Null, Value::Number)
    }
}

pub(crate) fn parse_date_millis(text: &str) -> Option<i64> {
    if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
        return Some(datetime.timestamp_millis());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc().timestamp_millis())
}
