//! Typed cell values
//!
//! [`Value`] is the currency shared by the filler, the session boundary and
//! processed form data. Entity types convert their fields to and from it
//! with [`From`] and [`FromValue`].

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::error::MixinError;

/// A single typed column value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL `NULL`
    Null,
    /// Signed integer
    Integer(i64),
    /// Floating point number
    Float(f64),
    /// Text
    String(String),
    /// Boolean
    Boolean(bool),
    /// Calendar date
    Date(NaiveDate),
    /// Wall clock time
    Time(NaiveTime),
    /// Naive UTC timestamp
    DateTime(NaiveDateTime),
    /// Raw bytes
    Bytes(Vec<u8>),
}

impl Value {
    /// Name of the variant, used in error messages
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Boolean(_) => "boolean",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::DateTime(_) => "datetime",
            Self::Bytes(_) => "bytes",
        }
    }

    /// Whether this is [`Value::Null`]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Integer payload, if any
    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// String payload, if any
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    /// Convert into a Rust type, naming `attribute` in the error
    ///
    /// # Errors
    ///
    /// Returns [`MixinError::InvalidValue`] when the variant does not match `T`.
    pub fn extract<T: FromValue>(self, attribute: &str) -> Result<T, MixinError> {
        let found = self.kind();
        T::from_value(self).ok_or_else(|| MixinError::InvalidValue {
            attribute: attribute.to_string(),
            expected: T::EXPECTED,
            found,
        })
    }
}

/// Conversion out of a [`Value`]
pub trait FromValue: Sized {
    /// Human readable name of the accepted variant
    const EXPECTED: &'static str;

    /// Convert, returning `None` on a variant mismatch
    fn from_value(value: Value) -> Option<Self>;
}

macro_rules! value_conversions {
    ($($ty:ty => $variant:ident, $expected:literal;)*) => {
        $(
            impl FromValue for $ty {
                const EXPECTED: &'static str = $expected;

                fn from_value(value: Value) -> Option<Self> {
                    match value {
                        Value::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            }

            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

value_conversions! {
    i64 => Integer, "an integer";
    f64 => Float, "a float";
    String => String, "a string";
    bool => Boolean, "a boolean";
    NaiveDate => Date, "a date";
    NaiveTime => Time, "a time";
    NaiveDateTime => DateTime, "a datetime";
    Vec<u8> => Bytes, "bytes";
}

impl FromValue for i32 {
    const EXPECTED: &'static str = "a 32-bit integer";

    fn from_value(value: Value) -> Option<Self> {
        value.as_integer().and_then(|v| Self::try_from(v).ok())
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_matching_variant() {
        let title: String = Value::from("Hello").extract("title").unwrap();
        assert_eq!(title, "Hello");
    }

    #[test]
    fn test_extract_option_accepts_null() {
        let id: Option<i64> = Value::Null.extract("id").unwrap();
        assert_eq!(id, None);

        let id: Option<i64> = Value::Integer(7).extract("id").unwrap();
        assert_eq!(id, Some(7));
    }

    #[test]
    fn test_extract_mismatch_reports_types() {
        let err = Value::Boolean(true).extract::<String>("title").unwrap_err();
        assert!(matches!(
            err,
            MixinError::InvalidValue { ref attribute, expected: "a string", found: "boolean" }
                if attribute == "title"
        ));
    }

    #[test]
    fn test_non_optional_rejects_null() {
        assert!(Value::Null.extract::<bool>("published").is_err());
    }

    #[test]
    fn test_i32_out_of_range() {
        assert!(Value::Integer(i64::MAX).extract::<i32>("count").is_err());
        assert_eq!(Value::Integer(12).extract::<i32>("count").unwrap(), 12);
    }

    #[test]
    fn test_serializes_untagged() {
        let json = serde_json::to_string(&vec![
            Value::Null,
            Value::Integer(3),
            Value::from("x"),
            Value::Date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()),
        ])
        .unwrap();
        assert_eq!(json, r#"[null,3,"x","2024-05-01"]"#);
    }
}
