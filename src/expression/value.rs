// src/expression/value.rs
use serde_json::{Map, Number, Value as Json};
use std::borrow::Cow;
use std::cmp::Ordering;

/// A runtime value. Arrays, objects and strings that come from the response
/// borrow from it instead of being copied.
#[derive(Debug, Clone)]
pub enum Value<'a> {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Cow<'a, str>),
    Array(&'a [Json]),
    Object(&'a Map<String, Json>),
}

impl<'a> Value<'a> {
    pub fn from_json(json: &'a Json) -> Self {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::Str(Cow::Borrowed(s)),
            Json::Array(items) => Value::Array(items),
            Json::Object(map) => Value::Object(map),
        }
    }

    /// Converts back to JSON; `None` for undefined.
    pub fn to_json(&self) -> Option<Json> {
        let json = match self {
            Value::Undefined => return None,
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::Str(s) => Json::String(s.to_string()),
            Value::Array(items) => Json::Array(items.to_vec()),
            Value::Object(map) => Json::Object((*map).clone()),
        };
        Some(json)
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Null | Value::Array(_) | Value::Object(_) => "object",
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::Str(s) => string_to_number(s),
            Value::Array(_) | Value::Object(_) => self.to_primitive().to_number(),
        }
    }

    pub fn to_display(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::Str(s) => s.to_string(),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Json::Null => String::new(),
                    other => Value::from_json(other).to_display(),
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".to_string(),
        }
    }

    /// Arrays and objects become their string form; everything else is unchanged.
    pub fn to_primitive(&self) -> Value<'a> {
        match self {
            Value::Array(_) | Value::Object(_) => Value::Str(Cow::Owned(self.to_display())),
            other => other.clone(),
        }
    }

    /// `===`. Arrays and objects compare by identity.
    pub fn strict_eq(&self, other: &Value<'a>) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => std::ptr::eq(*a, *b),
            (Value::Object(a), Value::Object(b)) => std::ptr::eq(*a, *b),
            _ => false,
        }
    }

    /// `==` with the usual coercions.
    pub fn loose_eq(&self, other: &Value<'a>) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() || b.is_nullish() => a.is_nullish() && b.is_nullish(),
            (a, b) if std::mem::discriminant(a) == std::mem::discriminant(b) => a.strict_eq(b),
            (Value::Bool(_), _) | (_, Value::Bool(_)) => {
                Value::Number(self.to_number()).loose_eq(&Value::Number(other.to_number()))
            }
            (Value::Number(n), Value::Str(s)) => *n == string_to_number(s),
            (Value::Str(s), Value::Number(n)) => string_to_number(s) == *n,
            (Value::Array(_) | Value::Object(_), _) => self.to_primitive().loose_eq(other),
            (_, Value::Array(_) | Value::Object(_)) => self.loose_eq(&other.to_primitive()),
            _ => false,
        }
    }

    /// Relational comparison; `None` when either side is NaN.
    pub fn compare(&self, other: &Value<'a>) -> Option<Ordering> {
        match (self.to_primitive(), other.to_primitive()) {
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(&b)),
            (a, b) => a.to_number().partial_cmp(&b.to_number()),
        }
    }
}

/// JSON has no NaN/Infinity; those map to null the way `JSON.stringify` does.
pub fn number_to_json(n: f64) -> Json {
    const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;
    if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        Json::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map(Json::Number).unwrap_or(Json::Null)
    }
}

pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

/// Hex digits to a number; values past `u64` lose precision instead of
/// failing. NaN for empty or non-hex input.
pub fn parse_hex(digits: &str) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }
    digits
        .chars()
        .try_fold(0.0, |acc, c| c.to_digit(16).map(|d| acc * 16.0 + f64::from(d)))
        .unwrap_or(f64::NAN)
}

fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        return parse_hex(hex);
    }
    // Rust also accepts "inf" and "nan"; the expression language does not.
    if trimmed.bytes().any(|b| b.is_ascii_alphabetic() && b != b'e' && b != b'E') {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}
