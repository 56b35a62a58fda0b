use std::fmt;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::ColumnType;

/// A typed scalar pulled from one of the two result sets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Decimal(Decimal),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Guid(Uuid),
}

impl Value {
    pub fn as_display(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => {
                // Integral floats print without a trailing ".0", but only
                // inside i64 range: the cast saturates beyond it, which
                // would collapse distinct keys onto one display string.
                if f.fract() == 0.0 && f.abs() < 9.2e18 {
                    (*f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
            Value::Decimal(d) => d.normalize().to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            Value::Guid(g) => g.to_string(),
        }
    }

    /// Numeric view used for tolerance comparison. `None` for non-numeric kinds.
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

/// One normalized cell. Null is a value in its own right: two nulls are
/// equal to each other and unequal to any non-null value. `Incomparable`
/// retains the raw text of a cell that could not be coerced to its
/// declared type; it never compares equal to anything.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Cell {
    Null,
    Value(Value),
    Incomparable(String),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn as_display(&self) -> String {
        match self {
            Cell::Null => String::new(),
            Cell::Value(v) => v.as_display(),
            Cell::Incomparable(raw) => raw.clone(),
        }
    }
}

pub fn parse_naive_date(value: &str) -> Result<NaiveDate> {
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as date"))
}

pub fn parse_naive_datetime(value: &str) -> Result<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%d/%m/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as datetime"))
}

/// Parses a raw field into a [`Cell`] according to the declared column type.
/// Empty input is NULL regardless of type. A parse failure is an error here;
/// the normalizer downgrades it to [`Cell::Incomparable`] plus a diagnostic.
pub fn parse_typed_value(value: &str, ty: &ColumnType) -> Result<Cell> {
    if value.is_empty() {
        return Ok(Cell::Null);
    }
    let parsed = match ty {
        ColumnType::Text => Value::Text(value.to_string()),
        ColumnType::Integer => {
            let parsed: i64 = value
                .trim()
                .parse()
                .with_context(|| format!("Failed to parse '{value}' as integer"))?;
            Value::Integer(parsed)
        }
        ColumnType::Float => {
            let parsed: f64 = value
                .trim()
                .parse()
                .with_context(|| format!("Failed to parse '{value}' as float"))?;
            Value::Float(parsed)
        }
        ColumnType::Decimal => {
            let parsed: Decimal = value
                .trim()
                .parse()
                .with_context(|| format!("Failed to parse '{value}' as decimal"))?;
            Value::Decimal(parsed)
        }
        ColumnType::Boolean => {
            let lowered = value.to_ascii_lowercase();
            let parsed = match lowered.as_str() {
                "true" | "t" | "yes" | "y" | "1" => true,
                "false" | "f" | "no" | "n" | "0" => false,
                _ => bail!("Failed to parse '{value}' as boolean"),
            };
            Value::Boolean(parsed)
        }
        ColumnType::Date => Value::Date(parse_naive_date(value)?),
        ColumnType::DateTime => Value::DateTime(parse_naive_datetime(value)?),
        ColumnType::Guid => {
            let trimmed = value.trim().trim_matches(|c| matches!(c, '{' | '}'));
            let parsed = Uuid::parse_str(trimmed)
                .with_context(|| format!("Failed to parse '{value}' as GUID"))?;
            Value::Guid(parsed)
        }
    };
    Ok(Cell::Value(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    #[test]
    fn parse_naive_date_supports_multiple_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        assert_eq!(parse_naive_date("2024-05-06").unwrap(), expected);
        assert_eq!(parse_naive_date("06/05/2024").unwrap(), expected);
        assert_eq!(parse_naive_date("2024/05/06").unwrap(), expected);
    }

    #[test]
    fn empty_input_is_null_for_every_type() {
        for ty in [
            ColumnType::Text,
            ColumnType::Integer,
            ColumnType::Float,
            ColumnType::Decimal,
            ColumnType::Boolean,
            ColumnType::Date,
            ColumnType::DateTime,
            ColumnType::Guid,
        ] {
            assert_eq!(parse_typed_value("", &ty).unwrap(), Cell::Null);
        }
    }

    #[test]
    fn parse_typed_value_handles_boolean_spellings() {
        let truthy = parse_typed_value("Yes", &ColumnType::Boolean).unwrap();
        assert_eq!(truthy, Cell::Value(Value::Boolean(true)));
        let falsy = parse_typed_value("0", &ColumnType::Boolean).unwrap();
        assert_eq!(falsy, Cell::Value(Value::Boolean(false)));
        assert!(parse_typed_value("maybe", &ColumnType::Boolean).is_err());
    }

    #[test]
    fn parse_typed_value_supports_guid_inputs() {
        let raw = "550e8400-e29b-41d4-a716-446655440000";
        let parsed = parse_typed_value(raw, &ColumnType::Guid).unwrap();
        assert_eq!(
            parsed,
            Cell::Value(Value::Guid(Uuid::parse_str(raw).unwrap()))
        );

        let braced = "{550e8400-e29b-41d4-a716-446655440000}";
        assert!(matches!(
            parse_typed_value(braced, &ColumnType::Guid).unwrap(),
            Cell::Value(Value::Guid(_))
        ));
        assert!(parse_typed_value("not-a-guid", &ColumnType::Guid).is_err());
    }

    #[test]
    fn decimal_display_drops_trailing_zeroes() {
        let cell = parse_typed_value("10.500", &ColumnType::Decimal).unwrap();
        assert_eq!(cell.as_display(), "10.5");
    }

    #[test]
    fn float_display_keeps_huge_values_distinct() {
        assert_eq!(Value::Float(10.0).as_display(), "10");
        assert_eq!(Value::Float(-3.0).as_display(), "-3");
        assert_ne!(
            Value::Float(1e300).as_display(),
            Value::Float(2e300).as_display()
        );
        assert_ne!(
            Value::Float(1e19).as_display(),
            Value::Float(2e19).as_display()
        );
    }

    #[test]
    fn numeric_view_covers_all_numeric_kinds() {
        assert_eq!(Value::Integer(10).as_numeric(), Some(10.0));
        assert_eq!(Value::Float(10.5).as_numeric(), Some(10.5));
        let dec: Decimal = "10.004".parse().unwrap();
        assert_eq!(Value::Decimal(dec).as_numeric(), Some(10.004));
        assert_eq!(Value::Text("10".into()).as_numeric(), None);
    }
}
