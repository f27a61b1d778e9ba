//! Persistent entities
//!
//! An entity is a plain struct implementing [`Attributes`] (string addressed
//! fields) and [`Model`] (column declarations). Behaviour is opted into by
//! implementing the marker-style traits in [`mixins`] and [`crud`], whose
//! methods are all provided.
//!
//! # Examples
//!
//! ```rust,no_run
//! use acton_mixins::models::{columns, Attributes, ColumnDescriptor, ColumnType, CrudModel, Model, Value};
//! use acton_mixins::session::SqliteSession;
//! use acton_mixins::MixinError;
//!
//! #[derive(Debug, Clone, Default)]
//! struct Post {
//!     id: Option<i64>,
//!     title: String,
//! }
//!
//! impl Attributes for Post {
//!     fn get_attribute(&self, name: &str) -> Option<Value> {
//!         match name {
//!             "id" => Some(self.id.into()),
//!             "title" => Some(self.title.clone().into()),
//!             _ => None,
//!         }
//!     }
//!
//!     fn set_attribute(&mut self, name: &str, value: Value) -> Result<(), MixinError> {
//!         match name {
//!             "id" => self.id = value.extract(name)?,
//!             "title" => self.title = value.extract(name)?,
//!             _ => return Err(MixinError::unknown_attribute::<Self>(name)),
//!         }
//!         Ok(())
//!     }
//! }
//!
//! impl Model for Post {
//!     fn columns() -> Vec<ColumnDescriptor> {
//!         vec![columns::id(), ColumnDescriptor::new("title", ColumnType::string(80))]
//!     }
//! }
//!
//! impl CrudModel for Post {}
//!
//! # async fn example(pool: sqlx::SqlitePool) -> Result<(), MixinError> {
//! let mut session = SqliteSession::new(pool);
//! let post = Post::create(&mut session, [("title", Value::from("Hello"))]).await?;
//! assert!(post.id.is_some());
//! # Ok(())
//! # }
//! ```

pub mod crud;
pub mod fill;
pub mod mixins;
pub mod schema;
pub mod value;

use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};

pub use crud::CrudModel;
pub use fill::{fill, Attributes};
pub use mixins::{columns, HardDeleteModel, SaveModel, SoftDeleteModel};
pub use schema::{schema_of, ColumnDescriptor, ColumnKind, ColumnType, EntitySchema};
pub use value::{FromValue, Value};

use crate::error::MixinError;
use crate::session::{RowWrite, Session};

/// A persistent entity type
pub trait Model: Attributes + Clone + Default + Send + Sync + 'static {
    /// Declared columns, in storage order
    fn columns() -> Vec<ColumnDescriptor>;

    /// Storage table name; the type's own short name unless overridden
    #[must_use]
    fn table_name() -> String {
        short_type_name::<Self>().to_string()
    }

    /// Cached schema for this type
    ///
    /// # Errors
    ///
    /// Returns [`MixinError::InvalidSchema`] if the declaration is malformed.
    fn schema() -> Result<Arc<EntitySchema>, MixinError> {
        schema_of::<Self>()
    }
}

/// Last path segment of `T`'s type name, without generic arguments
#[must_use]
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// An ordered row of column values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    values: Vec<(String, Value)>,
}

impl Record {
    /// Empty record
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column value
    pub fn push(&mut self, column: impl Into<String>, value: Value) {
        self.values.push((column.into(), value));
    }

    /// Value of `column`
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Iterate column/value pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of columns
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the record has no columns
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Snapshot every declared column of `instance`
    ///
    /// # Errors
    ///
    /// Returns [`MixinError::UnknownAttribute`] when the type's
    /// [`Attributes`] impl does not expose one of its declared columns.
    pub fn from_model<M: Model>(instance: &M) -> Result<Self, MixinError> {
        let schema = M::schema()?;
        let mut record = Self::new();
        for column in schema.columns() {
            let value = instance
                .get_attribute(column.name())
                .ok_or_else(|| MixinError::unknown_attribute::<M>(column.name()))?;
            record.push(column.name(), value);
        }
        Ok(record)
    }

    /// Build an instance of `M` from the record's values
    ///
    /// # Errors
    ///
    /// Propagates [`fill`] errors.
    pub fn into_model<M: Model>(self) -> Result<M, MixinError> {
        let mut instance = M::default();
        fill(&mut instance, self.values)?;
        Ok(instance)
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in &self.values {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Primary key of a (possibly transient) instance
pub(crate) fn primary_key_of<M: Model>(
    instance: &M,
    schema: &EntitySchema,
) -> Result<Option<i64>, MixinError> {
    let name = schema.primary_key().name();
    instance
        .get_attribute(name)
        .ok_or_else(|| MixinError::unknown_attribute::<M>(name))?
        .extract(name)
}

/// Flush `instance` into `session`, assign its primary key and commit
pub(crate) async fn persist<M: Model>(
    instance: &mut M,
    session: &mut dyn Session,
) -> Result<(), MixinError> {
    let schema = M::schema()?;
    mixins::stamp_timestamps(instance, &schema, chrono::Utc::now().naive_utc())?;

    let key = primary_key_of(instance, &schema)?;
    let mut values = Vec::with_capacity(schema.columns().len());
    for column in schema.columns().iter().filter(|c| !c.is_primary_key()) {
        let value = instance
            .get_attribute(column.name())
            .ok_or_else(|| MixinError::unknown_attribute::<M>(column.name()))?;
        values.push((column.name().to_string(), value));
    }

    let write = RowWrite {
        table: schema.table_name().to_string(),
        primary_key: schema.primary_key().name().to_string(),
        key,
        values,
    };
    let assigned = session.add(write).await?;
    instance.set_attribute(schema.primary_key().name(), Value::Integer(assigned))?;
    session.commit().await?;

    tracing::debug!(model = schema.type_name(), id = assigned, "persisted instance");
    Ok(())
}
