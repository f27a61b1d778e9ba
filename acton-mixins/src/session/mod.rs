//! Unit-of-work persistence seam
//!
//! Every model operation talks to storage through a `&mut dyn Session`
//! owned by the host, typically one per request. Writes are staged with
//! [`Session::add`] / [`Session::delete`] and made durable by
//! [`Session::commit`]; reads go through [`Session::fetch`].

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteSession;

use async_trait::async_trait;

use crate::error::MixinError;
use crate::models::{ColumnDescriptor, Record, Value};

/// One row insert or update
#[derive(Debug, Clone, PartialEq)]
pub struct RowWrite {
    /// Target table
    pub table: String,
    /// Primary key column name
    pub primary_key: String,
    /// Existing key; `None` lets the store assign one
    pub key: Option<i64>,
    /// Non-key column values
    pub values: Vec<(String, Value)>,
}

/// One row removal by primary key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowDelete {
    /// Target table
    pub table: String,
    /// Primary key column name
    pub primary_key: String,
    /// Key of the row to remove
    pub key: i64,
}

/// An equality-filtered query over one table
///
/// A `Null` filter value matches `NULL` cells. Rows come back ordered by
/// `order_by` when set.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    /// Source table
    pub table: String,
    /// Columns to load; also drives decoding
    pub columns: Vec<ColumnDescriptor>,
    /// `column = value` conditions, all of which must hold
    pub filters: Vec<(String, Value)>,
    /// Ordering column
    pub order_by: Option<String>,
    /// Maximum number of rows
    pub limit: Option<u32>,
}

/// Host-owned unit of work
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Session: Send {
    /// Stage an insert or update and return the row's primary key
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write.
    async fn add(&mut self, write: RowWrite) -> Result<i64, MixinError>;

    /// Stage the removal of a row
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the delete.
    async fn delete(&mut self, target: RowDelete) -> Result<(), MixinError>;

    /// Make staged writes durable
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails; staged writes are then lost.
    async fn commit(&mut self) -> Result<(), MixinError>;

    /// Run a query
    ///
    /// # Errors
    ///
    /// Returns an error if the query or row decoding fails.
    async fn fetch(&mut self, select: Select) -> Result<Vec<Record>, MixinError>;
}
