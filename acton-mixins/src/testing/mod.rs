//! Shared fixtures for unit tests

use axum::response::Response;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::sqlite::SqlitePoolOptions;

use crate::error::MixinError;
use crate::models::{
    columns, Attributes, ColumnDescriptor, ColumnType, CrudModel, HardDeleteModel, Model,
    SaveModel, SoftDeleteModel, Value,
};
use crate::session::SqliteSession;

/// Blog post exercising every column kind the tests need
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: Option<i64>,
    pub title: String,
    pub status: String,
    pub published: bool,
    pub publish_on: Option<NaiveDate>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
    pub deleted_at: Option<NaiveDateTime>,
}

impl Default for Post {
    fn default() -> Self {
        Self {
            id: None,
            title: String::new(),
            status: "draft".to_string(),
            published: false,
            publish_on: None,
            created_at: None,
            updated_at: None,
            deleted_at: None,
        }
    }
}

impl Attributes for Post {
    fn get_attribute(&self, name: &str) -> Option<Value> {
        Some(match name {
            "id" => self.id.into(),
            "title" => self.title.clone().into(),
            "status" => self.status.clone().into(),
            "published" => self.published.into(),
            "publish_on" => self.publish_on.into(),
            "created_at" => self.created_at.into(),
            "updated_at" => self.updated_at.into(),
            "deleted_at" => self.deleted_at.into(),
            _ => return None,
        })
    }

    fn set_attribute(&mut self, name: &str, value: Value) -> Result<(), MixinError> {
        match name {
            "id" => self.id = value.extract(name)?,
            "title" => self.title = value.extract(name)?,
            "status" => self.status = value.extract(name)?,
            "published" => self.published = value.extract(name)?,
            "publish_on" => self.publish_on = value.extract(name)?,
            "created_at" => self.created_at = value.extract(name)?,
            "updated_at" => self.updated_at = value.extract(name)?,
            "deleted_at" => self.deleted_at = value.extract(name)?,
            _ => return Err(MixinError::unknown_attribute::<Self>(name)),
        }
        Ok(())
    }
}

impl Model for Post {
    fn columns() -> Vec<ColumnDescriptor> {
        vec![
            columns::id(),
            ColumnDescriptor::new("title", ColumnType::string(80)).doc("Headline"),
            ColumnDescriptor::new("status", ColumnType::enumeration(["draft", "live"])),
            ColumnDescriptor::new("published", ColumnType::Boolean).nullable(),
            ColumnDescriptor::new("publish_on", ColumnType::Date).nullable(),
            columns::created_at(),
            columns::updated_at(),
            columns::deleted_at(),
        ]
    }
}

impl CrudModel for Post {}
impl SaveModel for Post {}
impl SoftDeleteModel for Post {}
impl HardDeleteModel for Post {}

/// Session over a private in-memory database holding the `Post` table
pub async fn memory_session() -> SqliteSession {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    let session = SqliteSession::new(pool);
    session
        .create_table(&Post::schema().expect("post schema"))
        .await
        .expect("post table");
    session
}

/// Collect a response body as UTF-8
pub async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}
