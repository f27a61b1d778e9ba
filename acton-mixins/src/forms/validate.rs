//! Field validators

use serde::Serialize;
use validator::ValidateLength;

use super::error::FieldError;
use crate::models::Value;

/// A rule attached to a form field
///
/// `InputRequired` and `Optional` are pre-validators: they run on the raw
/// submitted string before it is parsed and can stop the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Validator {
    /// The raw input must be present and non-empty
    InputRequired,
    /// Empty input is accepted and stops further validation
    Optional,
    /// Character count bounds on text values
    Length {
        /// Minimum length
        min: Option<u64>,
        /// Maximum length
        max: Option<u64>,
    },
}

/// Result of running the pre-validators on a raw value
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum PreCheck {
    /// Continue with parsing
    Proceed,
    /// Blank optional input; keep the field empty and stop
    Empty,
    /// Stop with this error
    Failed(FieldError),
}

impl Validator {
    /// Whether this runs before parsing
    #[must_use]
    pub const fn is_pre_validator(&self) -> bool {
        matches!(self, Self::InputRequired | Self::Optional)
    }

    pub(crate) fn pre_check(&self, raw: Option<&str>) -> PreCheck {
        match self {
            Self::InputRequired if raw.is_none_or(str::is_empty) => PreCheck::Failed(
                FieldError::with_code("This field is required.", "required"),
            ),
            Self::Optional if raw.is_none_or(|r| r.trim().is_empty()) => PreCheck::Empty,
            _ => PreCheck::Proceed,
        }
    }

    /// Check a parsed value
    ///
    /// # Errors
    ///
    /// Returns the failure as a [`FieldError`].
    pub fn check(&self, value: &Value) -> Result<(), FieldError> {
        match (self, value) {
            (Self::Length { min, max }, Value::String(text)) => {
                if text.validate_length(*min, *max, None) {
                    Ok(())
                } else {
                    Err(FieldError::with_code(length_message(*min, *max), "length"))
                }
            }
            _ => Ok(()),
        }
    }
}

fn length_message(min: Option<u64>, max: Option<u64>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("Field must be between {min} and {max} characters long."),
        (Some(min), None) => format!("Field must be at least {min} character(s) long."),
        (None, Some(max)) => format!("Field cannot be longer than {max} character(s)."),
        (None, None) => "Field has an invalid length.".to_string(),
    }
}
