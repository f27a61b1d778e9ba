//! Form classes and per-request form instances

use std::collections::HashMap;

use serde::Serialize;

use super::convert::Converters;
use super::csrf::{CsrfContext, CsrfSettings, CSRF_FIELD};
use super::error::{FieldError, ValidationErrors};
use super::field::{FieldDescriptor, FieldType, InputType, SelectOption};
use super::render::FormRenderer;
use super::validate::{PreCheck, Validator};
use crate::error::MixinError;
use crate::models::{fill, Attributes, Model, Record, Value};

/// Submitted form data as ordered name/value pairs
pub type FormData = Vec<(String, String)>;

/// An ordered set of fields with optional CSRF protection
///
/// Classes are cheap to clone and are usually built once and shared.
///
/// # Examples
///
/// ```rust
/// use acton_mixins::forms::{FieldDescriptor, FieldType, FormClass, Validator};
///
/// let contact = FormClass::new("ContactForm")
///     .field(FieldDescriptor::new("email", FieldType::Text).validator(Validator::InputRequired))
///     .with_submit("Send");
///
/// let mut form = contact.construct(Some(vec![("email".into(), String::new())]), None)?;
/// assert!(!form.validate());
/// assert_eq!(form.errors().for_field("email")[0].message, "This field is required.");
/// # Ok::<(), acton_mixins::MixinError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct FormClass {
    name: String,
    fields: Vec<FieldDescriptor>,
    csrf: Option<CsrfSettings>,
    converters: Converters,
    submit_label: Option<String>,
}

impl FormClass {
    /// Empty class with the default converters
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Require a valid CSRF token on submission
    #[must_use]
    pub fn with_csrf(mut self, settings: CsrfSettings) -> Self {
        self.csrf = Some(settings);
        self
    }

    /// Converters used by [`FormClass::model_form`]
    #[must_use]
    pub fn with_converters(mut self, converters: Converters) -> Self {
        self.converters = converters;
        self
    }

    /// Render a submit button with this label
    #[must_use]
    pub fn with_submit(mut self, label: impl Into<String>) -> Self {
        self.submit_label = Some(label.into());
        self
    }

    /// Add a field, replacing any existing field of the same name in place
    #[must_use]
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
        self
    }

    /// Class name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in order
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Field by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// CSRF settings, if protected
    #[must_use]
    pub const fn csrf(&self) -> Option<&CsrfSettings> {
        self.csrf.as_ref()
    }

    /// Submit button label
    #[must_use]
    pub fn submit_label(&self) -> Option<&str> {
        self.submit_label.as_deref()
    }

    /// Derive a class with one generated field per named column of `M`
    ///
    /// Fields are appended in the order given, after the receiver's own
    /// fields; CSRF settings and converters carry over. The receiver is not
    /// modified.
    ///
    /// # Errors
    ///
    /// [`MixinError::UnknownColumn`] for a name `M` does not declare,
    /// [`MixinError::UnsupportedColumnType`] for a column without a
    /// converter.
    pub fn model_form<M: Model>(&self, field_names: &[&str]) -> Result<Self, MixinError> {
        let schema = M::schema()?;
        let mut derived = self.clone();
        derived.name = format!("{}Form", schema.type_name());
        for name in field_names {
            let column = schema
                .column(name)
                .ok_or_else(|| MixinError::UnknownColumn {
                    column: (*name).to_string(),
                    model: schema.type_name().to_string(),
                })?;
            derived = derived.field(self.converters.convert(column)?);
        }
        tracing::debug!(form = %derived.name, fields = derived.fields.len(), "derived model form");
        Ok(derived)
    }

    /// Derive a class from every non-key column of `M` except `exclude`
    ///
    /// # Errors
    ///
    /// See [`FormClass::model_form`].
    pub fn model_form_excluding<M: Model>(&self, exclude: &[&str]) -> Result<Self, MixinError> {
        let schema = M::schema()?;
        let names: Vec<&str> = schema
            .columns()
            .iter()
            .filter(|c| !c.is_primary_key() && !exclude.contains(&c.name()))
            .map(|c| c.name())
            .collect();
        self.model_form::<M>(&names)
    }

    /// Instantiate for one request
    ///
    /// `data` is `None` for a form that has not been submitted. A CSRF
    /// protected class issues its token here.
    ///
    /// # Errors
    ///
    /// Returns [`MixinError::MissingCsrfContext`] when the class is CSRF
    /// protected and `csrf` is `None`.
    pub fn construct(
        &self,
        data: Option<FormData>,
        csrf: Option<&mut dyn CsrfContext>,
    ) -> Result<FormInstance, MixinError> {
        let mut instance = FormInstance {
            class: self.clone(),
            submitted: data.is_some(),
            raw: HashMap::new(),
            values: HashMap::new(),
            errors: ValidationErrors::new(),
            csrf_token: None,
            csrf_failure: None,
            validated: false,
        };
        for (name, value) in data.unwrap_or_default() {
            instance.raw.entry(name).or_insert(value);
        }

        if let Some(settings) = &self.csrf {
            let context = csrf.ok_or_else(|| MixinError::MissingCsrfContext {
                form: self.name.clone(),
            })?;
            if instance.submitted {
                instance.csrf_failure = settings
                    .validate_token(&*context, instance.raw(CSRF_FIELD))
                    .err()
                    .map(|failure| failure.message());
            }
            instance.csrf_token = Some(settings.generate_token(context)?);
        }

        Ok(instance)
    }
}

/// One form bound to one request's data
#[derive(Debug, Clone)]
pub struct FormInstance {
    class: FormClass,
    submitted: bool,
    raw: HashMap<String, String>,
    values: HashMap<String, Value>,
    errors: ValidationErrors,
    csrf_token: Option<String>,
    csrf_failure: Option<&'static str>,
    validated: bool,
}

impl FormInstance {
    /// The class this instance was built from
    #[must_use]
    pub const fn class(&self) -> &FormClass {
        &self.class
    }

    /// Whether data was submitted
    #[must_use]
    pub const fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// Raw submitted string of `name`; the first if repeated
    #[must_use]
    pub fn raw(&self, name: &str) -> Option<&str> {
        self.raw.get(name).map(String::as_str)
    }

    /// Processed value of `name`, available after [`FormInstance::validate`]
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Errors found by the last validation
    #[must_use]
    pub const fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Token to embed in the rendered form
    #[must_use]
    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf_token.as_deref()
    }

    /// Whether the last validation passed
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validated && !self.errors.has_errors()
    }

    /// Validate submitted data, recording values and errors
    ///
    /// Each field runs its pre-validators on the raw input, is parsed by
    /// type, then checked by the remaining validators. A failing step stops
    /// that field's chain. An unsubmitted form is never valid.
    pub fn validate(&mut self) -> bool {
        self.errors.clear();
        self.values.clear();
        self.validated = true;

        if !self.submitted {
            return false;
        }

        if let Some(message) = self.csrf_failure {
            self.errors.push(CSRF_FIELD, FieldError::with_code(message, "csrf"));
        }

        for field in &self.class.fields {
            let raw = self.raw.get(&field.name).map(String::as_str);
            match validate_field(field, raw) {
                Ok(Some(value)) => {
                    self.values.insert(field.name.clone(), value);
                }
                Ok(None) => {
                    let empty = if field.field_type == FieldType::Boolean {
                        Value::Boolean(false)
                    } else {
                        Value::Null
                    };
                    self.values.insert(field.name.clone(), empty);
                }
                Err(error) => self.errors.push(field.name.clone(), error),
            }
        }

        let valid = !self.errors.has_errors();
        tracing::debug!(form = %self.class.name, valid, "validated form");
        valid
    }

    /// Processed values in field order
    #[must_use]
    pub fn values(&self) -> Vec<(String, Value)> {
        self.class
            .fields
            .iter()
            .filter_map(|f| self.values.get(&f.name).map(|v| (f.name.clone(), v.clone())))
            .collect()
    }

    /// Assign every processed value to the attribute of the same name
    ///
    /// # Errors
    ///
    /// See [`fill`]; `target` is unchanged on error.
    pub fn populate<T: Attributes + Clone>(&self, target: &mut T) -> Result<(), MixinError> {
        fill(target, self.values())
    }

    /// Prefill unsubmitted fields from a record
    #[must_use]
    pub fn initial(mut self, record: &Record) -> Self {
        for field in &self.class.fields {
            if self.raw.contains_key(&field.name) {
                continue;
            }
            if let Some(text) = record.get(&field.name).and_then(|v| field.format_value(v)) {
                self.raw.insert(field.name.clone(), text);
            }
        }
        self
    }

    /// HTML for the whole form
    #[must_use]
    pub fn render(&self) -> String {
        FormRenderer::render(self)
    }
}

fn validate_field(field: &FieldDescriptor, raw: Option<&str>) -> Result<Option<Value>, FieldError> {
    for validator in field.validators.iter().filter(|v| v.is_pre_validator()) {
        match validator.pre_check(raw) {
            PreCheck::Proceed => {}
            PreCheck::Empty => return Ok(None),
            PreCheck::Failed(error) => return Err(error),
        }
    }

    let value = field
        .parse(raw)
        .map_err(|message| FieldError::with_code(message, "invalid"))?;

    for validator in field.validators.iter().filter(|v| !v.is_pre_validator()) {
        validator.check(&value)?;
    }
    Ok(Some(value))
}

#[derive(Serialize)]
struct FieldContext<'a> {
    name: &'a str,
    label: &'a str,
    description: &'a str,
    kind: FieldType,
    input_type: Option<InputType>,
    value: Option<&'a str>,
    required: bool,
    max_length: Option<u64>,
    choices: &'a [SelectOption],
    validators: &'a [Validator],
    errors: Vec<&'a str>,
}

#[derive(Serialize)]
struct FormContext<'a> {
    name: &'a str,
    fields: Vec<FieldContext<'a>>,
    errors: &'a ValidationErrors,
    csrf_field: &'static str,
    csrf_token: Option<&'a str>,
    submitted: bool,
    valid: bool,
    html: minijinja::Value,
}

impl Serialize for FormInstance {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = self
            .class
            .fields
            .iter()
            .map(|field| FieldContext {
                name: &field.name,
                label: &field.label,
                description: &field.description,
                kind: field.field_type,
                input_type: field.field_type.input_type(),
                value: self.raw(&field.name),
                required: field.is_required(),
                max_length: field.max_length(),
                choices: &field.choices,
                validators: &field.validators,
                errors: self
                    .errors
                    .for_field(&field.name)
                    .iter()
                    .map(|e| e.message.as_str())
                    .collect(),
            })
            .collect();

        FormContext {
            name: &self.class.name,
            fields,
            errors: &self.errors,
            csrf_field: CSRF_FIELD,
            csrf_token: self.csrf_token(),
            submitted: self.submitted,
            valid: self.is_valid(),
            html: minijinja::Value::from_safe_string(self.render()),
        }
        .serialize(serializer)
    }
}
