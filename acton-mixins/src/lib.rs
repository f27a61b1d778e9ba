//! acton-mixins: composable model, form and view traits for axum applications
//!
//! Server-rendered CRUD pages repeat the same steps: declare a table,
//! derive a form from its columns, validate a submission, write the row
//! and redirect. This crate packages each step as a small trait with
//! provided methods, so an application opts into behavior by implementing
//! the traits it needs.
//!
//! - [`models`]: column declarations, attribute filling, timestamps, save,
//!   soft and hard delete, CRUD operations
//! - [`forms`]: column to field conversion, validation, CSRF tokens and
//!   HTML rendering
//! - [`views`]: template, redirect, form and model views, routed with
//!   [`views::as_view`]
//! - [`session`]: the persistence seam, with an `SQLite` implementation
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use acton_mixins::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     observability::init()?;
//!     let config = MixinsConfig::load()?;
//!
//!     let session = SqliteSession::connect_with(&config.database).await?;
//!     session.create_table(&Post::schema()?).await?;
//!
//!     let state = AppState {
//!         pool: session.pool().clone(),
//!         templates: Templates::from_config(&config.templates),
//!     };
//!     let app = axum::Router::new()
//!         .route("/posts", as_view::<PostList>())
//!         .route("/posts/new", as_view::<NewPost>())
//!         .with_state(state);
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! See `examples/blog.rs` for the complete application.
//!
//! # Features
//!
//! - `sqlite` - [`session::SqliteSession`] (default)
//! - `postgres` - enables the sqlx `PostgreSQL` driver for custom sessions

pub mod config;
pub mod error;
pub mod forms;
pub mod models;
pub mod observability;
pub mod session;
pub mod template;
pub mod views;

#[cfg(test)]
pub(crate) mod testing;

pub use error::MixinError;

pub mod prelude {
    //! Convenience re-exports for common types and traits
    //!
    //! # Examples
    //!
    //! ```rust
    //! use acton_mixins::prelude::*;
    //! ```

    pub use crate::config::MixinsConfig;
    pub use crate::error::MixinError;
    pub use crate::forms::{
        CsrfContext, CsrfSettings, FieldDescriptor, FieldType, FormClass, FormData, FormInstance,
        MemoryCsrfContext, Validator,
    };
    pub use crate::models::{
        columns, Attributes, ColumnDescriptor, ColumnType, CrudModel, HardDeleteModel, Model,
        Record, SaveModel, SoftDeleteModel, Value,
    };
    pub use crate::observability;
    pub use crate::session::Session;
    #[cfg(feature = "sqlite")]
    pub use crate::session::SqliteSession;
    pub use crate::template::{Context, Render, Templates};
    pub use crate::views::{
        as_view, CreateModelView, DeleteModelView, FormView, HookOutcome, ModelView, OneModelView,
        ReadModelView, ReadOneModelView, RedirectView, TemplateView, UpdateModelView, View,
        ViewRequest,
    };

    pub use async_trait::async_trait;
    pub use axum;
    pub use minijinja;
}
