//! Error types and error handling

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Library error type
#[derive(Debug, Error)]
pub enum MixinError {
    /// A fill or filter named an attribute the target does not declare
    #[error("an instance of `{type_name}` has no attribute `{attribute}`")]
    UnknownAttribute {
        /// The offending attribute name
        attribute: String,
        /// Short name of the target type
        type_name: String,
    },

    /// A model form named a column the model does not declare
    #[error("the model `{model}` has no column named `{column}`")]
    UnknownColumn {
        /// The requested column name
        column: String,
        /// Short name of the model type
        model: String,
    },

    /// No converter is registered for the column's type
    #[error("column `{column}` of type `{column_type}` has no form field converter")]
    UnsupportedColumnType {
        /// Column name
        column: String,
        /// Column type tag
        column_type: String,
    },

    /// A value of the wrong type was assigned to an attribute
    #[error("attribute `{attribute}` expects {expected}, got {found}")]
    InvalidValue {
        /// Attribute name
        attribute: String,
        /// Expected value type
        expected: &'static str,
        /// Actual value type
        found: &'static str,
    },

    /// The primary key of a persisted instance cannot change
    #[error("the primary key `{attribute}` of a persisted `{type_name}` cannot be changed")]
    ImmutablePrimaryKey {
        /// Primary key column name
        attribute: String,
        /// Short name of the model type
        type_name: String,
    },

    /// A model's column declaration is malformed
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// A CSRF protected form was constructed without a token source
    #[error("form `{form}` is CSRF protected but no CSRF context was supplied")]
    MissingCsrfContext {
        /// Form class name
        form: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session error raised by a `Session` implementation
    #[error("Session error: {0}")]
    Session(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Template error
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),
}

impl MixinError {
    /// Build an [`MixinError::UnknownAttribute`] for the type `T`
    #[must_use]
    pub fn unknown_attribute<T: ?Sized>(attribute: impl Into<String>) -> Self {
        Self::UnknownAttribute {
            attribute: attribute.into(),
            type_name: crate::models::short_type_name::<T>().to_string(),
        }
    }
}

impl IntoResponse for MixinError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}
