//! `SQLite` backed [`Session`]
//!
//! Writes run inside a transaction opened on the first write and closed by
//! [`Session::commit`]. Dropping the session with an open transaction rolls
//! it back.

use std::fmt::Write as _;

use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, Transaction};

use super::{RowDelete, RowWrite, Select, Session};
use crate::config::DatabaseSettings;
use crate::error::MixinError;
use crate::models::{ColumnDescriptor, ColumnType, EntitySchema, Record, Value};

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// A unit of work over a `SQLite` pool
///
/// # Examples
///
/// ```rust,no_run
/// use acton_mixins::config::DatabaseSettings;
/// use acton_mixins::session::{Session, SqliteSession};
///
/// # async fn example() -> Result<(), acton_mixins::MixinError> {
/// let mut session = SqliteSession::connect_with(&DatabaseSettings::default()).await?;
/// session.commit().await?;
/// # Ok(())
/// # }
/// ```
pub struct SqliteSession {
    pool: SqlitePool,
    tx: Option<Transaction<'static, Sqlite>>,
}

impl std::fmt::Debug for SqliteSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSession")
            .field("pool", &self.pool)
            .field("in_transaction", &self.tx.is_some())
            .finish()
    }
}

impl SqliteSession {
    /// Session over an existing pool
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool, tx: None }
    }

    /// Open a pool from configuration and wrap it
    ///
    /// # Errors
    ///
    /// Returns [`MixinError::Database`] if the database cannot be opened.
    pub async fn connect_with(settings: &DatabaseSettings) -> Result<Self, MixinError> {
        let mut options = SqlitePoolOptions::new().max_connections(settings.max_connections);
        if settings.url.contains(":memory:") {
            // An in-memory database lives only as long as its connection.
            options = options.idle_timeout(None).max_lifetime(None);
        }
        let pool = options.connect(&settings.url).await?;
        tracing::debug!(url = %settings.url, "opened sqlite pool");
        Ok(Self::new(pool))
    }

    /// Underlying pool
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the table for `schema` if it does not exist
    ///
    /// # Errors
    ///
    /// Returns [`MixinError::Database`] if the DDL fails.
    pub async fn create_table(&self, schema: &EntitySchema) -> Result<(), MixinError> {
        let sql = create_table_sql(schema);
        tracing::debug!(table = schema.table_name(), "creating table");
        sqlx::query::<Sqlite>(&sql).execute(&self.pool).await?;
        Ok(())
    }

    /// Discard staged writes
    ///
    /// # Errors
    ///
    /// Returns [`MixinError::Database`] if the rollback fails.
    pub async fn rollback(&mut self) -> Result<(), MixinError> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
        }
        Ok(())
    }

    async fn transaction(&mut self) -> Result<&mut Transaction<'static, Sqlite>, MixinError> {
        if self.tx.is_none() {
            self.tx = Some(self.pool.begin().await?);
        }
        self.tx
            .as_mut()
            .ok_or_else(|| MixinError::Session("transaction was not opened".into()))
    }
}

#[async_trait]
impl Session for SqliteSession {
    async fn add(&mut self, write: RowWrite) -> Result<i64, MixinError> {
        let (sql, params) = upsert_statement(&write);
        let tx = self.transaction().await?;
        let result = bind_all(sqlx::query::<Sqlite>(&sql), &params)
            .execute(&mut **tx)
            .await?;
        let key = write.key.unwrap_or_else(|| result.last_insert_rowid());
        tracing::debug!(table = %write.table, key, "staged row write");
        Ok(key)
    }

    async fn delete(&mut self, target: RowDelete) -> Result<(), MixinError> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?",
            quote_ident(&target.table),
            quote_ident(&target.primary_key)
        );
        let tx = self.transaction().await?;
        sqlx::query::<Sqlite>(&sql)
            .bind(target.key)
            .execute(&mut **tx)
            .await?;
        tracing::debug!(table = %target.table, key = target.key, "staged row delete");
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), MixinError> {
        match self.tx.take() {
            Some(tx) => {
                tx.commit().await?;
                tracing::debug!("committed session");
            }
            None => tracing::debug!("commit with nothing staged"),
        }
        Ok(())
    }

    async fn fetch(&mut self, select: Select) -> Result<Vec<Record>, MixinError> {
        let (sql, params) = select_statement(&select);
        let query = bind_all(sqlx::query::<Sqlite>(&sql), &params);
        let rows = match self.tx.as_mut() {
            Some(tx) => query.fetch_all(&mut **tx).await?,
            None => query.fetch_all(&self.pool).await?,
        };
        tracing::debug!(table = %select.table, rows = rows.len(), "fetched rows");

        rows.iter()
            .map(|row| decode_row(row, &select.columns))
            .collect()
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn column_list<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.map(quote_ident).collect::<Vec<_>>().join(", ")
}

/// Insert when the key is unset, otherwise insert-or-update on the key
fn upsert_statement(write: &RowWrite) -> (String, Vec<Value>) {
    let table = quote_ident(&write.table);
    let mut names: Vec<&str> = Vec::with_capacity(write.values.len() + 1);
    let mut params = Vec::with_capacity(write.values.len() + 1);

    if let Some(key) = write.key {
        names.push(&write.primary_key);
        params.push(Value::Integer(key));
    }
    for (name, value) in &write.values {
        names.push(name);
        params.push(value.clone());
    }

    if names.is_empty() {
        return (format!("INSERT INTO {table} DEFAULT VALUES"), params);
    }

    let placeholders = vec!["?"; names.len()].join(", ");
    let mut sql = format!(
        "INSERT INTO {table} ({}) VALUES ({placeholders})",
        column_list(names.iter().copied())
    );

    if write.key.is_some() {
        let key = quote_ident(&write.primary_key);
        if write.values.is_empty() {
            let _ = write!(sql, " ON CONFLICT({key}) DO NOTHING");
        } else {
            let assignments = write
                .values
                .iter()
                .map(|(name, _)| {
                    let column = quote_ident(name);
                    format!("{column} = excluded.{column}")
                })
                .collect::<Vec<_>>()
                .join(", ");
            let _ = write!(sql, " ON CONFLICT({key}) DO UPDATE SET {assignments}");
        }
    }

    (sql, params)
}

fn select_statement(select: &Select) -> (String, Vec<Value>) {
    let mut sql = format!(
        "SELECT {} FROM {}",
        column_list(select.columns.iter().map(ColumnDescriptor::name)),
        quote_ident(&select.table)
    );
    let mut params = Vec::new();

    let conditions: Vec<String> = select
        .filters
        .iter()
        .map(|(name, value)| {
            if value.is_null() {
                format!("{} IS NULL", quote_ident(name))
            } else {
                params.push(value.clone());
                format!("{} = ?", quote_ident(name))
            }
        })
        .collect();
    if !conditions.is_empty() {
        let _ = write!(sql, " WHERE {}", conditions.join(" AND "));
    }
    if let Some(order_by) = &select.order_by {
        let _ = write!(sql, " ORDER BY {}", quote_ident(order_by));
    }
    if let Some(limit) = select.limit {
        let _ = write!(sql, " LIMIT {limit}");
    }

    (sql, params)
}

/// `CREATE TABLE` DDL for `schema`
#[must_use]
pub fn create_table_sql(schema: &EntitySchema) -> String {
    let columns = schema
        .columns()
        .iter()
        .map(|column| {
            let sql_type = match column.column_type() {
                ColumnType::Integer => "INTEGER".to_string(),
                ColumnType::Float => "REAL".to_string(),
                ColumnType::String {
                    max_length: Some(max),
                } => format!("VARCHAR({max})"),
                ColumnType::String { max_length: None } => "VARCHAR".to_string(),
                ColumnType::Text | ColumnType::Enum { .. } => "TEXT".to_string(),
                ColumnType::Boolean => "BOOLEAN".to_string(),
                ColumnType::Date => "DATE".to_string(),
                ColumnType::Time => "TIME".to_string(),
                ColumnType::DateTime => "DATETIME".to_string(),
                ColumnType::Binary => "BLOB".to_string(),
            };
            let mut definition = format!("{} {sql_type}", quote_ident(column.name()));
            if column.is_primary_key() {
                definition.push_str(" PRIMARY KEY");
            } else if !column.is_nullable() {
                definition.push_str(" NOT NULL");
            }
            definition
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "CREATE TABLE IF NOT EXISTS {} ({columns})",
        quote_ident(schema.table_name())
    )
}

fn bind_all<'q>(query: SqliteQuery<'q>, params: &[Value]) -> SqliteQuery<'q> {
    params.iter().fold(query, bind_value)
}

fn bind_value<'q>(query: SqliteQuery<'q>, value: &Value) -> SqliteQuery<'q> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Integer(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::String(v) => query.bind(v.clone()),
        Value::Boolean(v) => query.bind(*v),
        Value::Date(v) => query.bind(*v),
        Value::Time(v) => query.bind(*v),
        Value::DateTime(v) => query.bind(*v),
        Value::Bytes(v) => query.bind(v.clone()),
    }
}

fn decode_row(row: &SqliteRow, columns: &[ColumnDescriptor]) -> Result<Record, MixinError> {
    let mut record = Record::new();
    for column in columns {
        let name = column.name();
        let value: Value = match column.column_type() {
            ColumnType::Integer => row.try_get::<Option<i64>, _>(name)?.into(),
            ColumnType::Float => row.try_get::<Option<f64>, _>(name)?.into(),
            ColumnType::String { .. } | ColumnType::Text | ColumnType::Enum { .. } => {
                row.try_get::<Option<String>, _>(name)?.into()
            }
            ColumnType::Boolean => row.try_get::<Option<bool>, _>(name)?.into(),
            ColumnType::Date => row.try_get::<Option<chrono::NaiveDate>, _>(name)?.into(),
            ColumnType::Time => row.try_get::<Option<chrono::NaiveTime>, _>(name)?.into(),
            ColumnType::DateTime => row
                .try_get::<Option<chrono::NaiveDateTime>, _>(name)?
                .into(),
            ColumnType::Binary => row.try_get::<Option<Vec<u8>>, _>(name)?.into(),
        };
        record.push(name, value);
    }
    Ok(record)
}
