//! Bulk assignment of named values onto an object

use super::Value;
use crate::error::MixinError;

/// Named, dynamically addressable attributes
///
/// Implemented by entity types (usually by matching on the attribute name)
/// so that forms, filters and [`fill`] can address fields by string.
///
/// # Examples
///
/// ```rust
/// use acton_mixins::models::{Attributes, Value};
/// use acton_mixins::MixinError;
///
/// #[derive(Clone, Default)]
/// struct Tag {
///     label: String,
/// }
///
/// impl Attributes for Tag {
///     fn get_attribute(&self, name: &str) -> Option<Value> {
///         match name {
///             "label" => Some(self.label.clone().into()),
///             _ => None,
///         }
///     }
///
///     fn set_attribute(&mut self, name: &str, value: Value) -> Result<(), MixinError> {
///         match name {
///             "label" => self.label = value.extract(name)?,
///             _ => return Err(MixinError::unknown_attribute::<Self>(name)),
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Attributes {
    /// Current value of `name`, or `None` if the type has no such attribute
    fn get_attribute(&self, name: &str) -> Option<Value>;

    /// Assign `value` to `name`
    ///
    /// # Errors
    ///
    /// [`MixinError::UnknownAttribute`] for an undeclared name,
    /// [`MixinError::InvalidValue`] for a type mismatch.
    fn set_attribute(&mut self, name: &str, value: Value) -> Result<(), MixinError>;

    /// Whether `name` is a declared attribute
    fn has_attribute(&self, name: &str) -> bool {
        self.get_attribute(name).is_some()
    }

    /// Short name of the implementing type
    fn type_name(&self) -> &'static str {
        super::short_type_name::<Self>()
    }
}

/// Assign each `(name, value)` pair to the attribute of the same name
///
/// Names are checked first, in order; the first undeclared one fails with
/// [`MixinError::UnknownAttribute`]. Assignments are staged on a clone, so
/// on any error `target` is left exactly as it was. An empty sequence is a
/// no-op.
///
/// # Errors
///
/// See [`Attributes::set_attribute`].
pub fn fill<T, I, K>(target: &mut T, pairs: I) -> Result<(), MixinError>
where
    T: Attributes + Clone,
    I: IntoIterator<Item = (K, Value)>,
    K: AsRef<str>,
{
    let pairs: Vec<(K, Value)> = pairs.into_iter().collect();
    if pairs.is_empty() {
        return Ok(());
    }

    if let Some((name, _)) = pairs.iter().find(|(name, _)| !target.has_attribute(name.as_ref())) {
        return Err(MixinError::UnknownAttribute {
            attribute: name.as_ref().to_string(),
            type_name: target.type_name().to_string(),
        });
    }

    let mut staged = target.clone();
    for (name, value) in pairs {
        staged.set_attribute(name.as_ref(), value)?;
    }
    *target = staged;
    Ok(())
}
