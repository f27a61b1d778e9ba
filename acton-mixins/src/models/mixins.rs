//! Common columns and opt-in persistence behaviour
//!
//! Declare the shared columns with the [`columns`] helpers, then opt into
//! behaviour with an empty impl:
//!
//! ```rust,ignore
//! impl SaveModel for Post {}
//! impl SoftDeleteModel for Post {}
//! ```

use async_trait::async_trait;
use chrono::NaiveDateTime;

use super::{persist, primary_key_of, EntitySchema, Model, Value};
use crate::error::MixinError;
use crate::session::{RowDelete, Session};

/// Name of the creation timestamp column
pub const CREATED_AT: &str = "created_at";
/// Name of the modification timestamp column
pub const UPDATED_AT: &str = "updated_at";
/// Name of the soft delete timestamp column
pub const DELETED_AT: &str = "deleted_at";

/// Descriptors for the shared columns
pub mod columns {
    use super::{CREATED_AT, DELETED_AT, UPDATED_AT};
    use crate::models::{ColumnDescriptor, ColumnType};

    /// Integer primary key `id`, assigned by the store on first save
    #[must_use]
    pub fn id() -> ColumnDescriptor {
        ColumnDescriptor::new("id", ColumnType::Integer).primary_key()
    }

    /// `created_at`, set once on first save
    #[must_use]
    pub fn created_at() -> ColumnDescriptor {
        ColumnDescriptor::new(CREATED_AT, ColumnType::DateTime).nullable()
    }

    /// `updated_at`, refreshed on every save
    #[must_use]
    pub fn updated_at() -> ColumnDescriptor {
        ColumnDescriptor::new(UPDATED_AT, ColumnType::DateTime).nullable()
    }

    /// `deleted_at`, set by [`SoftDeleteModel::soft_delete`](super::SoftDeleteModel::soft_delete)
    #[must_use]
    pub fn deleted_at() -> ColumnDescriptor {
        ColumnDescriptor::new(DELETED_AT, ColumnType::DateTime).nullable()
    }
}

/// Apply timestamp conventions for the columns `schema` declares
pub(crate) fn stamp_timestamps<M: Model>(
    instance: &mut M,
    schema: &EntitySchema,
    now: NaiveDateTime,
) -> Result<(), MixinError> {
    if schema.column(CREATED_AT).is_some()
        && instance
            .get_attribute(CREATED_AT)
            .is_none_or(|value| value.is_null())
    {
        instance.set_attribute(CREATED_AT, Value::DateTime(now))?;
    }
    if schema.column(UPDATED_AT).is_some() {
        instance.set_attribute(UPDATED_AT, Value::DateTime(now))?;
    }
    Ok(())
}

/// Persist an instance with [`SaveModel::save`]
#[async_trait]
pub trait SaveModel: Model {
    /// Stage the instance, assign its primary key and commit
    ///
    /// # Errors
    ///
    /// Propagates session and attribute errors.
    async fn save(&mut self, session: &mut dyn Session) -> Result<(), MixinError> {
        persist(self, session).await
    }
}

/// Flag rows as deleted instead of removing them
///
/// Requires a [`columns::deleted_at`] column. Soft-deleted rows are still
/// returned by reads unless the caller filters on `deleted_at` being `Null`.
#[async_trait]
pub trait SoftDeleteModel: Model {
    /// Set `deleted_at` to now, persist and commit
    ///
    /// # Errors
    ///
    /// Returns [`MixinError::UnknownAttribute`] without a `deleted_at`
    /// column; otherwise propagates session errors.
    async fn soft_delete(&mut self, session: &mut dyn Session) -> Result<(), MixinError> {
        let schema = Self::schema()?;
        if schema.column(DELETED_AT).is_none() {
            return Err(MixinError::unknown_attribute::<Self>(DELETED_AT));
        }
        self.set_attribute(
            DELETED_AT,
            Value::DateTime(chrono::Utc::now().naive_utc()),
        )?;
        persist(self, session).await
    }

    /// Whether `deleted_at` is set
    fn is_deleted(&self) -> bool {
        self.get_attribute(DELETED_AT)
            .is_some_and(|value| !value.is_null())
    }
}

/// Remove rows from storage
#[async_trait]
pub trait HardDeleteModel: Model {
    /// Delete the row by primary key and commit
    ///
    /// A transient instance (no primary key yet) has no row; nothing is
    /// staged and only the commit runs.
    ///
    /// # Errors
    ///
    /// Propagates session errors.
    async fn hard_delete(&self, session: &mut dyn Session) -> Result<(), MixinError> {
        remove(self, session).await
    }
}

pub(crate) async fn remove<M: Model>(
    instance: &M,
    session: &mut dyn Session,
) -> Result<(), MixinError> {
    let schema = M::schema()?;
    if let Some(key) = primary_key_of(instance, &schema)? {
        session
            .delete(RowDelete {
                table: schema.table_name().to_string(),
                primary_key: schema.primary_key().name().to_string(),
                key,
            })
            .await?;
        tracing::debug!(model = schema.type_name(), id = key, "deleted instance");
    }
    session.commit().await
}
