//! Column metadata and the per-type schema registry

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use super::Model;
use crate::error::MixinError;

/// Storage type of a column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    /// 64-bit integer
    Integer,
    /// Floating point number
    Float,
    /// Bounded or unbounded short text
    String {
        /// Maximum length in characters
        max_length: Option<u64>,
    },
    /// Long text
    Text,
    /// Boolean
    Boolean,
    /// One of a fixed set of string values
    Enum {
        /// Raw choice values, in declaration order
        choices: Vec<String>,
    },
    /// Calendar date
    Date,
    /// Wall clock time
    Time,
    /// Naive UTC timestamp
    DateTime,
    /// Binary blob
    Binary,
}

impl ColumnType {
    /// Shorthand for a length-bounded string column
    #[must_use]
    pub const fn string(max_length: u64) -> Self {
        Self::String {
            max_length: Some(max_length),
        }
    }

    /// Shorthand for an enum column
    #[must_use]
    pub fn enumeration<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enum {
            choices: choices.into_iter().map(Into::into).collect(),
        }
    }

    /// The type's discriminant
    #[must_use]
    pub const fn kind(&self) -> ColumnKind {
        match self {
            Self::Integer => ColumnKind::Integer,
            Self::Float => ColumnKind::Float,
            Self::String { .. } => ColumnKind::String,
            Self::Text => ColumnKind::Text,
            Self::Boolean => ColumnKind::Boolean,
            Self::Enum { .. } => ColumnKind::Enum,
            Self::Date => ColumnKind::Date,
            Self::Time => ColumnKind::Time,
            Self::DateTime => ColumnKind::DateTime,
            Self::Binary => ColumnKind::Binary,
        }
    }
}

/// Payload-free [`ColumnType`] tag, used to key converters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    /// See [`ColumnType::Integer`]
    Integer,
    /// See [`ColumnType::Float`]
    Float,
    /// See [`ColumnType::String`]
    String,
    /// See [`ColumnType::Text`]
    Text,
    /// See [`ColumnType::Boolean`]
    Boolean,
    /// See [`ColumnType::Enum`]
    Enum,
    /// See [`ColumnType::Date`]
    Date,
    /// See [`ColumnType::Time`]
    Time,
    /// See [`ColumnType::DateTime`]
    DateTime,
    /// See [`ColumnType::Binary`]
    Binary,
}

impl ColumnKind {
    /// Lowercase tag
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::Enum => "enum",
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "datetime",
            Self::Binary => "binary",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared metadata of one persistent column
///
/// # Examples
///
/// ```rust
/// use acton_mixins::models::{ColumnDescriptor, ColumnType};
///
/// let title = ColumnDescriptor::new("title", ColumnType::string(80))
///     .doc("Shown in the page header");
/// assert!(!title.is_nullable());
/// assert_eq!(title.doc_string(), Some("Shown in the page header"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    name: String,
    column_type: ColumnType,
    nullable: bool,
    primary_key: bool,
    doc: Option<String>,
}

impl ColumnDescriptor {
    /// A non-nullable column
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: false,
            primary_key: false,
            doc: None,
        }
    }

    /// Allow `NULL`
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Mark as the primary key
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Attach a documentation string
    #[must_use]
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Column name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column type
    #[must_use]
    pub const fn column_type(&self) -> &ColumnType {
        &self.column_type
    }

    /// Whether `NULL` is allowed
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Whether this is the primary key
    #[must_use]
    pub const fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    /// Documentation string, if any
    #[must_use]
    pub fn doc_string(&self) -> Option<&str> {
        self.doc.as_deref()
    }
}

/// Resolved column layout of one entity type
#[derive(Debug, Clone)]
pub struct EntitySchema {
    type_name: String,
    table_name: String,
    columns: Vec<ColumnDescriptor>,
    primary_key: usize,
}

impl EntitySchema {
    /// Build and check a schema
    ///
    /// # Errors
    ///
    /// Returns [`MixinError::InvalidSchema`] unless there is exactly one
    /// primary key and column names are unique.
    pub fn new(
        type_name: impl Into<String>,
        table_name: impl Into<String>,
        columns: Vec<ColumnDescriptor>,
    ) -> Result<Self, MixinError> {
        let type_name = type_name.into();

        let mut seen = HashSet::new();
        if let Some(duplicate) = columns.iter().find(|c| !seen.insert(c.name())) {
            return Err(MixinError::InvalidSchema(format!(
                "`{type_name}` declares column `{}` more than once",
                duplicate.name()
            )));
        }

        let keys: Vec<usize> = columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_primary_key())
            .map(|(i, _)| i)
            .collect();
        let [primary_key] = keys[..] else {
            return Err(MixinError::InvalidSchema(format!(
                "`{type_name}` must declare exactly one primary key column, found {}",
                keys.len()
            )));
        };
        if columns[primary_key].column_type() != &ColumnType::Integer {
            return Err(MixinError::InvalidSchema(format!(
                "the primary key of `{type_name}` must be an integer column"
            )));
        }

        Ok(Self {
            type_name,
            table_name: table_name.into(),
            columns,
            primary_key,
        })
    }

    /// Short type name of the entity
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Storage table name
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Columns in declaration order
    #[must_use]
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Look up a column by name
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// The primary key column
    #[must_use]
    pub fn primary_key(&self) -> &ColumnDescriptor {
        &self.columns[self.primary_key]
    }
}

static SCHEMAS: Lazy<RwLock<HashMap<TypeId, Arc<EntitySchema>>>> = Lazy::new(Default::default);

/// Schema of `M`, built on first use and cached for the process lifetime
///
/// # Errors
///
/// Returns [`MixinError::InvalidSchema`] if `M`'s declaration is malformed.
pub fn schema_of<M: Model>() -> Result<Arc<EntitySchema>, MixinError> {
    let key = TypeId::of::<M>();
    if let Some(schema) = SCHEMAS.read().get(&key) {
        return Ok(Arc::clone(schema));
    }

    let schema = Arc::new(EntitySchema::new(
        super::short_type_name::<M>(),
        M::table_name(),
        M::columns(),
    )?);
    tracing::debug!(
        model = schema.type_name(),
        table = schema.table_name(),
        columns = schema.columns().len(),
        "registered model schema"
    );

    Ok(Arc::clone(SCHEMAS.write().entry(key).or_insert(schema)))
}
