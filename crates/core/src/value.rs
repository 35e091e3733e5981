//! Typed limit values.
//!
//! Configuration discovered in the cluster is weakly typed. Every value is
//! kept as a [`LimitValue`] and converted with checked functions.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Full-string shape of a Prometheus/Mimir duration (`1h30m`, `30d`, `500ms`).
static DURATION_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\d+(?:\.\d+)?(?:ms|s|m|h|d|w|y))+$").expect("valid duration regex")
});

/// One `<number><unit>` component of a duration.
static DURATION_PART: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)(ms|s|m|h|d|w|y)").expect("valid duration part regex")
});

/// A configured limit value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum LimitValue {
    Number(f64),
    Text(String),
    /// Duration in seconds.
    Duration(f64),
    Bool(bool),
}

impl LimitValue {
    /// Coerces a raw string: integer, then float, then duration, then text.
    pub fn coerce(raw: &str) -> Self {
        let trimmed = raw.trim().trim_matches(|c| c == '"' || c == '\'');

        if let Ok(n) = trimmed.parse::<i64>() {
            return Self::Number(n as f64);
        }
        if let Ok(n) = trimmed.parse::<f64>() {
            if n.is_finite() {
                return Self::Number(n);
            }
        }
        if let Some(secs) = parse_duration_secs(trimmed) {
            return Self::Duration(secs);
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            _ => Self::Text(trimmed.to_string()),
        }
    }

    /// Reads the value as a number. Durations convert to seconds.
    pub fn as_f64(&self, key: &str) -> Result<f64> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Duration(secs) => Ok(*secs),
            Self::Text(t) => Err(Error::type_coercion(key, format!("\"{}\"", t), "number")),
            Self::Bool(b) => Err(Error::type_coercion(key, b.to_string(), "number")),
        }
    }

    /// Reads the value as a boolean.
    pub fn as_bool(&self, key: &str) -> Result<bool> {
        match self {
            Self::Bool(b) => Ok(*b),
            other => Err(Error::type_coercion(key, other.to_string(), "bool")),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Number(_) | Self::Duration(_))
    }
}

impl fmt::Display for LimitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(t) => write!(f, "\"{}\"", t),
            Self::Duration(secs) => write!(f, "{}s", secs),
            Self::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<f64> for LimitValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

/// Parses a duration string into seconds.
///
/// Accepts sequences such as `1h30m`, `720h`, `30d`, `1w`, `250ms`.
/// A year is 365 days.
pub fn parse_duration_secs(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() || !DURATION_SHAPE.is_match(raw) {
        return None;
    }

    let mut total = 0.0;
    for caps in DURATION_PART.captures_iter(raw) {
        let n: f64 = caps[1].parse().ok()?;
        let unit_secs = match &caps[2] {
            "ms" => 0.001,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3_600.0,
            "d" => 86_400.0,
            "w" => 7.0 * 86_400.0,
            "y" => 365.0 * 86_400.0,
            _ => return None,
        };
        total += n * unit_secs;
    }
    Some(total)
}
