//! Column to form field conversion
//!
//! Each supported [`ColumnKind`] maps to a [`FieldConverter`]. The defaults
//! cover integer, string, boolean, enum, date, time and datetime columns;
//! anything else fails with [`MixinError::UnsupportedColumnType`] unless a
//! converter is registered for it.
//!
//! ```rust
//! use acton_mixins::forms::{convert_column, FieldType, Validator};
//! use acton_mixins::models::{ColumnDescriptor, ColumnType};
//!
//! let column = ColumnDescriptor::new("first_name", ColumnType::string(40));
//! let field = convert_column(&column)?;
//!
//! assert_eq!(field.field_type, FieldType::Text);
//! assert_eq!(field.label, "First Name");
//! assert_eq!(
//!     field.validators,
//!     [Validator::InputRequired, Validator::Length { min: None, max: Some(40) }]
//! );
//! # Ok::<(), acton_mixins::MixinError>(())
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::field::{FieldDescriptor, FieldType};
use super::validate::Validator;
use crate::error::MixinError;
use crate::models::{ColumnDescriptor, ColumnKind, ColumnType};

/// Title-case each word: first letter after a non-letter upper, rest lower
#[must_use]
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_cased = false;
    for ch in text.chars() {
        if previous_cased {
            out.extend(ch.to_lowercase());
        } else {
            out.extend(ch.to_uppercase());
        }
        previous_cased = ch.is_alphabetic();
    }
    out
}

/// Human label for an attribute name: `publish_on` becomes `Publish On`
#[must_use]
pub fn label_for(name: &str) -> String {
    title_case(&name.replace('_', " "))
}

/// Field with the label, description and pre-validator every converter shares
#[must_use]
pub fn base_field(column: &ColumnDescriptor, field_type: FieldType) -> FieldDescriptor {
    let presence = if column.is_nullable() {
        Validator::Optional
    } else {
        Validator::InputRequired
    };
    FieldDescriptor::new(column.name(), field_type)
        .description(column.doc_string().unwrap_or_default())
        .validator(presence)
}

/// Produces a form field for one kind of column
pub trait FieldConverter: Send + Sync {
    /// Build the field
    ///
    /// # Errors
    ///
    /// Returns [`MixinError::UnsupportedColumnType`] if the column's type
    /// is not the one this converter handles.
    fn convert(&self, column: &ColumnDescriptor) -> Result<FieldDescriptor, MixinError>;
}

fn unsupported(column: &ColumnDescriptor) -> MixinError {
    MixinError::UnsupportedColumnType {
        column: column.name().to_string(),
        column_type: column.column_type().kind().to_string(),
    }
}

/// Integer columns to number inputs
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerConverter;

impl FieldConverter for IntegerConverter {
    fn convert(&self, column: &ColumnDescriptor) -> Result<FieldDescriptor, MixinError> {
        match column.column_type() {
            ColumnType::Integer => Ok(base_field(column, FieldType::Integer)),
            _ => Err(unsupported(column)),
        }
    }
}

/// String columns to text inputs, bounded by their max length
#[derive(Debug, Clone, Copy, Default)]
pub struct StringConverter;

impl FieldConverter for StringConverter {
    fn convert(&self, column: &ColumnDescriptor) -> Result<FieldDescriptor, MixinError> {
        let ColumnType::String { max_length } = column.column_type() else {
            return Err(unsupported(column));
        };
        let field = base_field(column, FieldType::Text);
        Ok(match max_length {
            Some(max) => field.validator(Validator::Length {
                min: None,
                max: Some(*max),
            }),
            None => field,
        })
    }
}

/// Boolean columns to checkboxes
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanConverter;

impl FieldConverter for BooleanConverter {
    fn convert(&self, column: &ColumnDescriptor) -> Result<FieldDescriptor, MixinError> {
        match column.column_type() {
            ColumnType::Boolean => Ok(base_field(column, FieldType::Boolean)),
            _ => Err(unsupported(column)),
        }
    }
}

/// Enum columns to selects labelled with title-cased choices
#[derive(Debug, Clone, Copy, Default)]
pub struct EnumConverter;

impl FieldConverter for EnumConverter {
    fn convert(&self, column: &ColumnDescriptor) -> Result<FieldDescriptor, MixinError> {
        let ColumnType::Enum { choices } = column.column_type() else {
            return Err(unsupported(column));
        };
        Ok(choices
            .iter()
            .fold(base_field(column, FieldType::Select), |field, choice| {
                field.choice(choice.clone(), title_case(choice))
            }))
    }
}

/// Date, time and datetime columns to the matching inputs
#[derive(Debug, Clone, Copy, Default)]
pub struct TemporalConverter;

impl FieldConverter for TemporalConverter {
    fn convert(&self, column: &ColumnDescriptor) -> Result<FieldDescriptor, MixinError> {
        let field_type = match column.column_type() {
            ColumnType::Date => FieldType::Date,
            ColumnType::Time => FieldType::Time,
            ColumnType::DateTime => FieldType::DateTime,
            _ => return Err(unsupported(column)),
        };
        Ok(base_field(column, field_type))
    }
}

/// Converter lookup by column kind
///
/// # Examples
///
/// ```rust
/// use acton_mixins::forms::{base_field, Converters, FieldConverter, FieldDescriptor, FieldType};
/// use acton_mixins::models::{ColumnDescriptor, ColumnKind, ColumnType};
/// use acton_mixins::MixinError;
///
/// struct NotesAsText;
///
/// impl FieldConverter for NotesAsText {
///     fn convert(&self, column: &ColumnDescriptor) -> Result<FieldDescriptor, MixinError> {
///         Ok(base_field(column, FieldType::Text))
///     }
/// }
///
/// let converters = Converters::default().register(ColumnKind::Text, NotesAsText);
/// let notes = ColumnDescriptor::new("notes", ColumnType::Text).nullable();
/// assert_eq!(converters.convert(&notes)?.field_type, FieldType::Text);
/// # Ok::<(), MixinError>(())
/// ```
#[derive(Clone)]
pub struct Converters {
    by_kind: HashMap<ColumnKind, Arc<dyn FieldConverter>>,
}

impl Converters {
    /// A registry with no converters
    #[must_use]
    pub fn empty() -> Self {
        Self {
            by_kind: HashMap::new(),
        }
    }

    /// Add or replace the converter for `kind`
    #[must_use]
    pub fn register(mut self, kind: ColumnKind, converter: impl FieldConverter + 'static) -> Self {
        self.by_kind.insert(kind, Arc::new(converter));
        self
    }

    /// Whether `kind` has a converter
    #[must_use]
    pub fn supports(&self, kind: ColumnKind) -> bool {
        self.by_kind.contains_key(&kind)
    }

    /// Convert a column with the converter registered for its kind
    ///
    /// # Errors
    ///
    /// Returns [`MixinError::UnsupportedColumnType`] when no converter is
    /// registered.
    pub fn convert(&self, column: &ColumnDescriptor) -> Result<FieldDescriptor, MixinError> {
        self.by_kind
            .get(&column.column_type().kind())
            .ok_or_else(|| unsupported(column))?
            .convert(column)
    }
}

impl Default for Converters {
    fn default() -> Self {
        Self::empty()
            .register(ColumnKind::Integer, IntegerConverter)
            .register(ColumnKind::String, StringConverter)
            .register(ColumnKind::Boolean, BooleanConverter)
            .register(ColumnKind::Enum, EnumConverter)
            .register(ColumnKind::Date, TemporalConverter)
            .register(ColumnKind::Time, TemporalConverter)
            .register(ColumnKind::DateTime, TemporalConverter)
    }
}

impl fmt::Debug for Converters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.by_kind.keys().map(ColumnKind::as_str).collect();
        kinds.sort_unstable();
        f.debug_struct("Converters").field("kinds", &kinds).finish()
    }
}

/// Convert a column with the default converters
///
/// # Errors
///
/// Returns [`MixinError::UnsupportedColumnType`] for float, text and binary
/// columns.
pub fn convert_column(column: &ColumnDescriptor) -> Result<FieldDescriptor, MixinError> {
    Converters::default().convert(column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::field::{DATETIME_FORMAT, DATE_FORMAT, TIME_FORMAT};
    use crate::forms::SelectOption;
    use proptest::prelude::*;

    #[test]
    fn test_title_case_matches_word_rules() {
        assert_eq!(title_case("hello world"), "Hello World");
        assert_eq!(title_case("HELLO"), "Hello");
        assert_eq!(title_case("they're here"), "They'Re Here");
        assert_eq!(title_case("2nd place"), "2Nd Place");
        assert_eq!(label_for("first_name"), "First Name");
    }

    #[test]
    fn test_integer_column() {
        let field = convert_column(&ColumnDescriptor::new("age", ColumnType::Integer)).unwrap();
        assert_eq!(field.field_type, FieldType::Integer);
        assert_eq!(field.label, "Age");
        assert_eq!(field.description, "");
        assert_eq!(field.validators, [Validator::InputRequired]);
    }

    #[test]
    fn test_nullable_string_without_length() {
        let column = ColumnDescriptor::new("nickname", ColumnType::String { max_length: None })
            .nullable()
            .doc("What friends call you");
        let field = convert_column(&column).unwrap();
        assert_eq!(field.validators, [Validator::Optional]);
        assert_eq!(field.description, "What friends call you");
    }

    #[test]
    fn test_enum_choices_are_title_cased() {
        let column = ColumnDescriptor::new("status", ColumnType::enumeration(["draft", "in_review"]));
        let field = convert_column(&column).unwrap();
        assert_eq!(field.field_type, FieldType::Select);
        assert_eq!(
            field.choices,
            [
                SelectOption::new("draft", "Draft"),
                SelectOption::new("in_review", "In_Review"),
            ]
        );
    }

    #[test]
    fn test_temporal_formats() {
        let date = convert_column(&ColumnDescriptor::new("d", ColumnType::Date)).unwrap();
        let time = convert_column(&ColumnDescriptor::new("t", ColumnType::Time)).unwrap();
        let stamp = convert_column(&ColumnDescriptor::new("s", ColumnType::DateTime)).unwrap();
        assert_eq!(date.format.as_deref(), Some(DATE_FORMAT));
        assert_eq!(time.format.as_deref(), Some(TIME_FORMAT));
        assert_eq!(stamp.format.as_deref(), Some(DATETIME_FORMAT));
        assert_eq!(stamp.field_type, FieldType::DateTime);
    }

    #[test]
    fn test_unsupported_types_fail() {
        for column_type in [ColumnType::Float, ColumnType::Text, ColumnType::Binary] {
            let column = ColumnDescriptor::new("blob", column_type);
            let err = convert_column(&column).unwrap_err();
            assert!(matches!(err, MixinError::UnsupportedColumnType { ref column, .. } if column == "blob"));
        }
    }

    #[test]
    fn test_registered_converter_replaces_default() {
        struct Hidden;
        impl FieldConverter for Hidden {
            fn convert(&self, column: &ColumnDescriptor) -> Result<FieldDescriptor, MixinError> {
                Ok(base_field(column, FieldType::Text).label("Secret"))
            }
        }

        let converters = Converters::default().register(ColumnKind::Integer, Hidden);
        let field = converters
            .convert(&ColumnDescriptor::new("pin", ColumnType::Integer))
            .unwrap();
        assert_eq!(field.label, "Secret");
    }

    #[test]
    fn test_empty_registry_supports_nothing() {
        let converters = Converters::empty();
        assert!(!converters.supports(ColumnKind::Integer));
        assert!(converters
            .convert(&ColumnDescriptor::new("id", ColumnType::Integer))
            .is_err());
    }

    fn supported_type() -> impl Strategy<Value = ColumnType> {
        prop_oneof![
            Just(ColumnType::Integer),
            (1u64..500).prop_map(ColumnType::string),
            Just(ColumnType::Boolean),
            Just(ColumnType::enumeration(["a", "b"])),
            Just(ColumnType::Date),
            Just(ColumnType::Time),
            Just(ColumnType::DateTime),
        ]
    }

    proptest! {
        #[test]
        fn prop_exactly_one_presence_validator_first(
            name in "[a-z][a-z_]{0,12}",
            column_type in supported_type(),
            nullable in any::<bool>(),
        ) {
            let mut column = ColumnDescriptor::new(name.clone(), column_type);
            if nullable {
                column = column.nullable();
            }
            let field = convert_column(&column).unwrap();

            let presence: Vec<_> = field.validators.iter().filter(|v| v.is_pre_validator()).collect();
            prop_assert_eq!(presence.len(), 1);
            let expected = if nullable { Validator::Optional } else { Validator::InputRequired };
            prop_assert_eq!(&field.validators[0], &expected);
            prop_assert_eq!(field.label, label_for(&name));
        }
    }
}
