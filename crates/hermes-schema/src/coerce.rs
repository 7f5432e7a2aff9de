//! Scalar coercion, one function per [`FieldType`] tag.
//!
//! Coercion accepts both wire strings and already-typed values so that a
//! validated map validates again to itself.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use hermes_core::{Symbol, Value};

use crate::field::FieldType;

/// The wire literal that stands for an absent value.
pub const NULL_LITERAL: &str = "null";

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const OFFSET_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S %z", "%Y-%m-%d %H:%M:%S%.f %z"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d %b %Y", "%b %d %Y"];

/// Returns `true` for values that coerce to [`Value::Null`].
#[must_use]
pub fn is_null(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s == NULL_LITERAL,
        _ => false,
    }
}

/// Coerces a scalar value to `ty`.
///
/// Containers (`Array`, `Hash`) are handled by the schema; passing them here
/// only checks the shape. The error is a short reason, without field name.
pub fn coerce_scalar(value: &Value, ty: FieldType) -> Result<Value, String> {
    if is_null(value) {
        return Ok(Value::Null);
    }

    match ty {
        FieldType::String => to_string(value),
        FieldType::Integer => to_integer(value),
        FieldType::Float => to_float(value),
        FieldType::Symbol => to_symbol(value),
        FieldType::Boolean => to_boolean(value),
        FieldType::DateTime => to_datetime(value),
        FieldType::Array => match value {
            Value::Array(_) => Ok(value.clone()),
            other => Err(format!("got {}", other.type_name())),
        },
        FieldType::Hash => match value {
            Value::Hash(_) => Ok(value.clone()),
            other => Err(format!("got {}", other.type_name())),
        },
    }
}

fn to_string(value: &Value) -> Result<Value, String> {
    match value {
        Value::String(_) => Ok(value.clone()),
        Value::Symbol(s) => Ok(Value::String(s.to_string())),
        Value::Array(_) | Value::Hash(_) => Err(format!("got {}", value.type_name())),
        other => Ok(Value::String(other.to_string())),
    }
}

fn to_integer(value: &Value) -> Result<Value, String> {
    match value {
        Value::Integer(_) => Ok(value.clone()),
        Value::String(s) => {
            let trimmed = s.trim().replace('_', "");
            trimmed
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| format!("'{s}' is not a valid Integer"))
        }
        other => Err(format!("got {}", other.type_name())),
    }
}

fn to_float(value: &Value) -> Result<Value, String> {
    match value {
        Value::Float(_) => Ok(value.clone()),
        Value::Integer(i) => Ok(Value::Float(*i as f64)),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(x) if x.is_finite() => Ok(Value::Float(x)),
            _ => Err(format!("'{s}' is not a valid Float")),
        },
        other => Err(format!("got {}", other.type_name())),
    }
}

fn to_symbol(value: &Value) -> Result<Value, String> {
    match value {
        Value::Symbol(_) => Ok(value.clone()),
        Value::String(s) => Ok(Value::Symbol(Symbol::new(s))),
        other => Err(format!("got {}", other.type_name())),
    }
}

fn to_boolean(value: &Value) -> Result<Value, String> {
    match value {
        Value::Boolean(_) => Ok(value.clone()),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Boolean(true)),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Boolean(false)),
        Value::String(s) => Err(format!("'{s}' is not true or false")),
        other => Err(format!("got {}", other.type_name())),
    }
}

fn to_datetime(value: &Value) -> Result<Value, String> {
    match value {
        Value::DateTime(_) => Ok(value.clone()),
        Value::String(s) => parse_datetime(s.trim())
            .map(Value::DateTime)
            .ok_or_else(|| format!("'{s}' is not a valid DateTime")),
        other => Err(format!("got {}", other.type_name())),
    }
}

/// Parses RFC 3339 and a handful of common layouts. Naive inputs are UTC.
#[must_use]
pub fn parse_datetime(input: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(input) {
        return Some(dt);
    }
    for format in OFFSET_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(input, format) {
            return Some(dt);
        }
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Some(Utc.from_utc_datetime(&naive).fixed_offset());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(input, format) {
            let naive = date.and_hms_opt(0, 0, 0)?;
            return Some(Utc.from_utc_datetime(&naive).fixed_offset());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_null_literal_for_every_type() {
        for ty in [
            FieldType::String,
            FieldType::Integer,
            FieldType::Boolean,
            FieldType::DateTime,
            FieldType::Array,
            FieldType::Hash,
        ] {
            assert_eq!(coerce_scalar(&Value::from("null"), ty), Ok(Value::Null));
        }
    }

    #[test]
    fn test_integer() {
        assert_eq!(coerce_scalar(&Value::from("42"), FieldType::Integer), Ok(Value::from(42)));
        assert_eq!(coerce_scalar(&Value::from("-7"), FieldType::Integer), Ok(Value::from(-7)));
        assert_eq!(
            coerce_scalar(&Value::from("1_000"), FieldType::Integer),
            Ok(Value::from(1000))
        );
        assert!(coerce_scalar(&Value::from("4.2"), FieldType::Integer).is_err());
        assert!(coerce_scalar(&Value::from("abc"), FieldType::Integer).is_err());
    }

    #[test]
    fn test_float() {
        assert_eq!(coerce_scalar(&Value::from("1.5"), FieldType::Float), Ok(Value::from(1.5)));
        assert_eq!(coerce_scalar(&Value::from(3), FieldType::Float), Ok(Value::from(3.0)));
        assert!(coerce_scalar(&Value::from("NaN"), FieldType::Float).is_err());
    }

    #[test]
    fn test_boolean_is_strict() {
        assert_eq!(
            coerce_scalar(&Value::from("TRUE"), FieldType::Boolean),
            Ok(Value::Boolean(true))
        );
        assert_eq!(
            coerce_scalar(&Value::from("False"), FieldType::Boolean),
            Ok(Value::Boolean(false))
        );
        assert!(coerce_scalar(&Value::from("yes"), FieldType::Boolean).is_err());
        assert!(coerce_scalar(&Value::from("0"), FieldType::Boolean).is_err());
    }

    #[test]
    fn test_symbol_and_string() {
        assert_eq!(
            coerce_scalar(&Value::from("open"), FieldType::Symbol),
            Ok(Value::Symbol(Symbol::new("open")))
        );
        assert_eq!(
            coerce_scalar(&Value::Symbol(Symbol::new("open")), FieldType::String),
            Ok(Value::from("open"))
        );
        assert!(coerce_scalar(&Value::from(vec!["a"]), FieldType::String).is_err());
    }

    #[test]
    fn test_datetime_layouts() {
        let rfc = parse_datetime("2024-03-01T10:20:30+02:00").unwrap();
        assert_eq!(rfc.hour(), 10);
        assert_eq!(rfc.offset().local_minus_utc(), 7200);

        let naive = parse_datetime("2024-03-01 10:20:30").unwrap();
        assert_eq!(naive.offset().local_minus_utc(), 0);

        let date = parse_datetime("2024-03-01").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2024, 3, 1));
        assert_eq!(date.hour(), 0);

        assert!(parse_datetime("yesterday-ish").is_none());
    }

    #[test]
    fn test_typed_values_pass_through() {
        let dt = parse_datetime("2024-03-01").unwrap();
        for (value, ty) in [
            (Value::from(5), FieldType::Integer),
            (Value::from(2.5), FieldType::Float),
            (Value::Boolean(true), FieldType::Boolean),
            (Value::DateTime(dt), FieldType::DateTime),
        ] {
            assert_eq!(coerce_scalar(&value, ty), Ok(value.clone()));
        }
    }
}
