//! Form field types and descriptors
//!
//! Defines the field kinds a form can hold and how each maps onto an HTML
//! input.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use super::validate::Validator;
use crate::models::Value;

/// Default format of date fields
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Default format of time fields
pub const TIME_FORMAT: &str = "%H:%M";
/// Default format of date-time fields, as produced by `datetime-local` inputs
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// HTML input types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputType {
    /// Text input (default)
    #[default]
    Text,
    /// Number input
    Number,
    /// Checkbox
    Checkbox,
    /// Date input
    Date,
    /// Time input
    Time,
    /// Date and time input
    DateTimeLocal,
    /// Hidden input
    Hidden,
}

impl InputType {
    /// Get the HTML type attribute value
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Checkbox => "checkbox",
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTimeLocal => "datetime-local",
            Self::Hidden => "hidden",
        }
    }
}

impl std::fmt::Display for InputType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Option for select dropdowns
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    /// Value attribute
    pub value: String,
    /// Display text
    pub label: String,
}

impl SelectOption {
    /// Create a new select option
    #[must_use]
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Kind of form field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Whole number
    Integer,
    /// Single line of text
    Text,
    /// Checkbox
    Boolean,
    /// Choice among [`FieldDescriptor::choices`]
    Select,
    /// Calendar date
    Date,
    /// Wall clock time
    Time,
    /// Date and time
    DateTime,
}

impl FieldType {
    /// Input element used to render the field; `None` for a `<select>`
    #[must_use]
    pub const fn input_type(&self) -> Option<InputType> {
        match self {
            Self::Integer => Some(InputType::Number),
            Self::Text => Some(InputType::Text),
            Self::Boolean => Some(InputType::Checkbox),
            Self::Select => None,
            Self::Date => Some(InputType::Date),
            Self::Time => Some(InputType::Time),
            Self::DateTime => Some(InputType::DateTimeLocal),
        }
    }

    /// Format used when none is set on the descriptor
    #[must_use]
    pub const fn default_format(&self) -> Option<&'static str> {
        match self {
            Self::Date => Some(DATE_FORMAT),
            Self::Time => Some(TIME_FORMAT),
            Self::DateTime => Some(DATETIME_FORMAT),
            _ => None,
        }
    }
}

/// A form field
///
/// # Examples
///
/// ```rust
/// use acton_mixins::forms::{FieldDescriptor, FieldType, Validator};
///
/// let agree = FieldDescriptor::new("agree_to_terms", FieldType::Boolean)
///     .validator(Validator::InputRequired);
/// assert_eq!(agree.label, "Agree To Terms");
/// assert!(agree.is_required());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name (used for form submission)
    pub name: String,
    /// Field kind
    pub field_type: FieldType,
    /// Label text
    pub label: String,
    /// Help text shown below the field
    pub description: String,
    /// Validators, run in order
    pub validators: Vec<Validator>,
    /// Allowed values of a select field
    pub choices: Vec<SelectOption>,
    /// strftime format of date and time fields
    pub format: Option<String>,
}

impl FieldDescriptor {
    /// Field labelled from its name, with no validators
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        Self {
            label: super::convert::label_for(&name),
            name,
            field_type,
            description: String::new(),
            validators: Vec::new(),
            choices: Vec::new(),
            format: field_type.default_format().map(str::to_string),
        }
    }

    /// Set the label
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the help text
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Append a validator
    #[must_use]
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Append a select choice
    #[must_use]
    pub fn choice(mut self, value: impl Into<String>, label: impl Into<String>) -> Self {
        self.choices.push(SelectOption::new(value, label));
        self
    }

    /// Override the date/time format
    #[must_use]
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Whether an [`Validator::InputRequired`] is attached
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.validators.contains(&Validator::InputRequired)
    }

    /// Largest `max` among [`Validator::Length`] validators
    #[must_use]
    pub fn max_length(&self) -> Option<u64> {
        self.validators
            .iter()
            .filter_map(|v| match v {
                Validator::Length { max, .. } => *max,
                _ => None,
            })
            .max()
    }

    fn effective_format(&self) -> &str {
        self.format
            .as_deref()
            .or_else(|| self.field_type.default_format())
            .unwrap_or_default()
    }

    /// Parse a submitted string into a typed value
    ///
    /// # Errors
    ///
    /// Returns the user facing message when the input does not parse.
    pub fn parse(&self, raw: Option<&str>) -> Result<Value, &'static str> {
        if self.field_type == FieldType::Boolean {
            return Ok(Value::Boolean(!matches!(raw, None | Some("" | "false"))));
        }

        let raw = raw.unwrap_or_default();
        match self.field_type {
            FieldType::Integer => raw
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| "Not a valid integer value."),
            FieldType::Text | FieldType::Boolean => Ok(Value::String(raw.to_string())),
            FieldType::Select => self
                .choices
                .iter()
                .any(|choice| choice.value == raw)
                .then(|| Value::String(raw.to_string()))
                .ok_or("Not a valid choice."),
            FieldType::Date => NaiveDate::parse_from_str(raw.trim(), self.effective_format())
                .map(Value::Date)
                .map_err(|_| "Not a valid date value."),
            FieldType::Time => NaiveTime::parse_from_str(raw.trim(), self.effective_format())
                .map(Value::Time)
                .map_err(|_| "Not a valid time value."),
            FieldType::DateTime => {
                NaiveDateTime::parse_from_str(raw.trim(), self.effective_format())
                    .map(Value::DateTime)
                    .map_err(|_| "Not a valid datetime value.")
            }
        }
    }

    /// Display a typed value the way this field expects it back
    #[must_use]
    pub fn format_value(&self, value: &Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::Boolean(checked) => checked.then(|| "y".to_string()),
            Value::Integer(v) => Some(v.to_string()),
            Value::Float(v) => Some(v.to_string()),
            Value::String(v) => Some(v.clone()),
            Value::Date(v) => Some(v.format(self.effective_format()).to_string()),
            Value::Time(v) => Some(v.format(self.effective_format()).to_string()),
            Value::DateTime(v) => Some(v.format(self.effective_format()).to_string()),
            Value::Bytes(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_type_for_field_type() {
        assert_eq!(FieldType::DateTime.input_type(), Some(InputType::DateTimeLocal));
        assert_eq!(FieldType::Select.input_type(), None);
        assert_eq!(InputType::DateTimeLocal.to_string(), "datetime-local");
    }

    #[test]
    fn test_new_field_defaults() {
        let field = FieldDescriptor::new("publish_on", FieldType::Date);
        assert_eq!(field.label, "Publish On");
        assert_eq!(field.format.as_deref(), Some(DATE_FORMAT));
        assert!(!field.is_required());
    }

    #[test]
    fn test_parse_integer() {
        let field = FieldDescriptor::new("count", FieldType::Integer);
        assert_eq!(field.parse(Some(" 42 ")), Ok(Value::Integer(42)));
        assert_eq!(field.parse(Some("4x")), Err("Not a valid integer value."));
    }

    #[test]
    fn test_parse_boolean() {
        let field = FieldDescriptor::new("published", FieldType::Boolean);
        assert_eq!(field.parse(None), Ok(Value::Boolean(false)));
        assert_eq!(field.parse(Some("false")), Ok(Value::Boolean(false)));
        assert_eq!(field.parse(Some("y")), Ok(Value::Boolean(true)));
    }

    #[test]
    fn test_parse_select_requires_known_choice() {
        let field = FieldDescriptor::new("status", FieldType::Select)
            .choice("draft", "Draft")
            .choice("live", "Live");
        assert_eq!(field.parse(Some("live")), Ok(Value::from("live")));
        assert_eq!(field.parse(Some("gone")), Err("Not a valid choice."));
    }

    #[test]
    fn test_parse_datetime_local_format() {
        let field = FieldDescriptor::new("starts_at", FieldType::DateTime);
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(field.parse(Some("2024-03-09T14:30")), Ok(Value::DateTime(expected)));
        assert!(field.parse(Some("2024-03-09 14:30")).is_err());
    }

    #[test]
    fn test_format_value_round_trips_time() {
        let field = FieldDescriptor::new("opens", FieldType::Time);
        let value = field.parse(Some("09:15")).unwrap();
        assert_eq!(field.format_value(&value).as_deref(), Some("09:15"));
    }

    #[test]
    fn test_max_length() {
        let field = FieldDescriptor::new("title", FieldType::Text).validator(Validator::Length {
            min: None,
            max: Some(80),
        });
        assert_eq!(field.max_length(), Some(80));
    }
}
