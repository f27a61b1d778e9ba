//! Forms generated from model columns
//!
//! A [`FormClass`] is an ordered list of [`FieldDescriptor`]s, built by hand
//! or derived from a model's columns with [`FormClass::model_form`]. Each
//! request constructs a [`FormInstance`] from the class, validates the
//! submitted data and copies the processed values onto a model.
//!
//! # Example
//!
//! ```rust,ignore
//! let class = FormClass::new("PostForm")
//!     .with_csrf(CsrfSettings::new(secret))
//!     .model_form::<Post>(&["title", "status", "published"])?
//!     .with_submit("Save");
//!
//! let mut form = class.construct(Some(submitted), Some(&mut session))?;
//! if form.validate() {
//!     let mut post = Post::default();
//!     form.populate(&mut post)?;
//! }
//! ```

pub mod convert;
pub mod csrf;
pub mod error;
pub mod field;
pub mod form;
pub mod render;
pub mod validate;

pub use convert::{
    base_field, convert_column, label_for, title_case, BooleanConverter, Converters,
    EnumConverter, FieldConverter, IntegerConverter, StringConverter, TemporalConverter,
};
pub use csrf::{CsrfContext, CsrfFailure, CsrfSettings, MemoryCsrfContext, CSRF_FIELD};
pub use error::{FieldError, ValidationErrors};
pub use field::{FieldDescriptor, FieldType, InputType, SelectOption};
pub use form::{FormClass, FormData, FormInstance};
pub use render::{FormRenderOptions, FormRenderer};
pub use validate::Validator;
