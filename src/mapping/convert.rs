//! Text <-> scalar value conversion for built-in XSD types

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat};

use super::value::Value;
use crate::model::ScalarKind;

const DATE_FORMAT: &str = "%Y-%m-%d";
const LOCAL_DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Convert element or attribute text; text that does not parse stays a string
pub fn parse_scalar(text: &str, kind: ScalarKind) -> Value {
    let trimmed = text.trim();
    let parsed = match kind {
        ScalarKind::String => None,
        ScalarKind::Boolean => match trimmed {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        ScalarKind::Integer => trimmed.parse().ok().map(Value::Integer),
        ScalarKind::Decimal => parse_decimal(trimmed).map(Value::Decimal),
        ScalarKind::Date => NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
            .ok()
            .map(Value::Date),
        ScalarKind::DateTime => DateTime::parse_from_rfc3339(trimmed)
            .map(Value::DateTime)
            .or_else(|_| {
                NaiveDateTime::parse_from_str(trimmed, LOCAL_DATE_TIME_FORMAT)
                    .map(Value::LocalDateTime)
            })
            .ok(),
    };
    parsed.unwrap_or_else(|| Value::String(text.to_string()))
}

fn parse_decimal(text: &str) -> Option<f64> {
    match text {
        "INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        _ => text.parse().ok(),
    }
}

/// Lexical form of a scalar value; `None` for lists, records and null
pub fn format_scalar(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Decimal(d) if d.is_nan() => "NaN".to_string(),
        Value::Decimal(d) if d.is_infinite() => {
            if d.is_sign_positive() { "INF" } else { "-INF" }.to_string()
        }
        Value::Decimal(d) => d.to_string(),
        Value::Date(d) => d.format(DATE_FORMAT).to_string(),
        Value::DateTime(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        Value::LocalDateTime(dt) => dt.format(LOCAL_DATE_TIME_FORMAT).to_string(),
        Value::Null | Value::List(_) | Value::Record(_) => return None,
    };
    Some(text)
}

/// Text content of an element: lists are whitespace separated
pub fn format_text(value: &Value) -> String {
    match value {
        Value::List(items) => items
            .iter()
            .filter_map(format_scalar)
            .collect::<Vec<_>>()
            .join(" "),
        other => format_scalar(other).unwrap_or_default(),
    }
}
