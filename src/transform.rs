//! Value transforms applied to join columns before matching, so keys that
//! differ only in formatting across the two sources still line up
//! (e.g. `ext-1001` in one engine against `1001` in the other).

use std::{borrow::Cow, sync::LazyLock};

use regex::Regex;

use crate::{error::ConfigError, schema::ColumnType};

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());
static EXT_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^ext-?").unwrap());

pub const TRANSFORM_NAMES: &[&str] = &[
    "lowercase",
    "uppercase",
    "trim",
    "remove_prefix:<prefix>",
    "extract_digits",
    "remove_prefix_and_int",
    "to_int",
    "to_str",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transform {
    Lowercase,
    Uppercase,
    Trim,
    RemovePrefix(String),
    ExtractDigits,
    /// Strips an `ext-` prefix and keeps the leading integer.
    RemovePrefixAndInt,
    ToInt,
    ToStr,
}

impl Transform {
    /// Parses a transform reference such as `lowercase` or `remove_prefix:ext-`.
    pub fn parse(spec: &str) -> Result<Self, ConfigError> {
        let (name, arg) = match spec.split_once(':') {
            Some((name, arg)) => (name.trim(), Some(arg)),
            None => (spec.trim(), None),
        };
        match (name, arg) {
            ("lowercase", None) => Ok(Transform::Lowercase),
            ("uppercase", None) => Ok(Transform::Uppercase),
            ("trim", None) | ("strip_whitespace", None) => Ok(Transform::Trim),
            ("remove_prefix", Some(prefix)) => Ok(Transform::RemovePrefix(prefix.to_string())),
            ("remove_prefix", None) => Ok(Transform::RemovePrefix("ext-".to_string())),
            ("extract_digits", None) => Ok(Transform::ExtractDigits),
            ("remove_prefix_and_int", None) => Ok(Transform::RemovePrefixAndInt),
            ("to_int", None) => Ok(Transform::ToInt),
            ("to_str", None) => Ok(Transform::ToStr),
            _ => Err(ConfigError::UnknownTransform {
                name: spec.to_string(),
                available: TRANSFORM_NAMES.join(", "),
            }),
        }
    }

    /// Applies the transform, borrowing the input when it is unchanged.
    pub fn apply<'a>(&self, value: &'a str) -> Cow<'a, str> {
        match self {
            Transform::Lowercase => {
                if value.chars().all(|ch| !ch.is_uppercase()) {
                    Cow::Borrowed(value)
                } else {
                    Cow::Owned(value.to_lowercase())
                }
            }
            Transform::Uppercase => {
                if value.chars().all(|ch| !ch.is_lowercase()) {
                    Cow::Borrowed(value)
                } else {
                    Cow::Owned(value.to_uppercase())
                }
            }
            Transform::Trim => Cow::Borrowed(value.trim()),
            Transform::RemovePrefix(prefix) => match value.strip_prefix(prefix.as_str()) {
                Some(stripped) => Cow::Borrowed(stripped),
                None => Cow::Borrowed(value),
            },
            Transform::ExtractDigits => {
                let digits: String = DIGITS
                    .find_iter(value)
                    .map(|m| m.as_str())
                    .collect::<Vec<_>>()
                    .concat();
                Cow::Owned(digits)
            }
            Transform::RemovePrefixAndInt => {
                let stripped = EXT_PREFIX.replace(value, "");
                if stripped.trim().parse::<i64>().is_ok() {
                    match stripped {
                        Cow::Borrowed(s) => Cow::Borrowed(s.trim()),
                        Cow::Owned(s) => Cow::Owned(s.trim().to_string()),
                    }
                } else {
                    match DIGITS.find(&stripped) {
                        Some(m) => Cow::Owned(m.as_str().to_string()),
                        None => Cow::Owned(String::new()),
                    }
                }
            }
            Transform::ToInt => match value.trim().parse::<i64>() {
                Ok(parsed) => Cow::Owned(parsed.to_string()),
                Err(_) => match DIGITS.find(value) {
                    Some(m) => Cow::Owned(m.as_str().to_string()),
                    None => Cow::Owned(String::new()),
                },
            },
            Transform::ToStr => Cow::Borrowed(value),
        }
    }

    /// Declared type of a column after this transform has run over it.
    pub fn result_type(&self) -> ColumnType {
        match self {
            Transform::RemovePrefixAndInt | Transform::ToInt => ColumnType::Integer,
            _ => ColumnType::Text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_known_names_and_args() {
        assert_eq!(Transform::parse("lowercase").unwrap(), Transform::Lowercase);
        assert_eq!(
            Transform::parse("remove_prefix:ord-").unwrap(),
            Transform::RemovePrefix("ord-".to_string())
        );
        assert!(matches!(
            Transform::parse("reverse"),
            Err(ConfigError::UnknownTransform { .. })
        ));
    }

    #[test]
    fn remove_prefix_and_int_strips_ext_markers() {
        let t = Transform::RemovePrefixAndInt;
        assert_eq!(t.apply("ext-1001"), "1001");
        assert_eq!(t.apply("EXT1001"), "1001");
        assert_eq!(t.apply("1001"), "1001");
        assert_eq!(t.apply("order-55x"), "55");
        assert_eq!(t.apply("none"), "");
    }

    #[test]
    fn extract_digits_concatenates_all_runs() {
        assert_eq!(Transform::ExtractDigits.apply("a1b22c"), "122");
        assert_eq!(Transform::ExtractDigits.apply("abc"), "");
    }

    #[test]
    fn case_transforms_borrow_when_unchanged() {
        assert!(matches!(
            Transform::Lowercase.apply("already lower"),
            Cow::Borrowed(_)
        ));
        assert_eq!(Transform::Uppercase.apply("mIxEd"), "MIXED");
        assert_eq!(Transform::Trim.apply("  pad  "), "pad");
    }
}
