//! A small blog built from the view traits
//!
//! Run with: cargo run --example blog
//!
//! Then visit http://localhost:3000/posts
//!
//! Configuration is read from `./config.toml` and `ACTON_*` variables; the
//! default is an in-memory database.

use std::collections::HashMap;
use std::sync::Arc;

use acton_mixins::prelude::*;
use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum::Router;
use chrono::NaiveDateTime;
use parking_lot::Mutex;
use sqlx::SqlitePool;

#[derive(Debug, Clone)]
struct Post {
    id: Option<i64>,
    title: String,
    body: Option<String>,
    status: String,
    created_at: Option<NaiveDateTime>,
    updated_at: Option<NaiveDateTime>,
    deleted_at: Option<NaiveDateTime>,
}

impl Default for Post {
    fn default() -> Self {
        Self {
            id: None,
            title: String::new(),
            body: None,
            status: "draft".to_string(),
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
            "body" => self.body.clone().into(),
            "status" => self.status.clone().into(),
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
            "body" => self.body = value.extract(name)?,
            "status" => self.status = value.extract(name)?,
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
            ColumnDescriptor::new("title", ColumnType::string(120)).doc("Shown in the post list"),
            ColumnDescriptor::new("body", ColumnType::String { max_length: None }).nullable(),
            ColumnDescriptor::new("status", ColumnType::enumeration(["draft", "published"])),
            columns::created_at(),
            columns::updated_at(),
            columns::deleted_at(),
        ]
    }

    fn table_name() -> String {
        "posts".to_string()
    }
}

impl CrudModel for Post {}
impl SoftDeleteModel for Post {}

/// Process-wide CSRF store; a real application keys this by session cookie
#[derive(Clone, Default)]
struct SharedCsrf(Arc<Mutex<HashMap<String, String>>>);

impl CsrfContext for SharedCsrf {
    fn get(&self, key: &str) -> Option<String> {
        self.0.lock().get(key).cloned()
    }

    fn insert(&mut self, key: &str, value: String) {
        self.0.lock().insert(key.to_string(), value);
    }
}

#[derive(Clone)]
struct AppState {
    pool: SqlitePool,
    templates: Templates,
    post_form: FormClass,
    confirm_form: FormClass,
    csrf: SharedCsrf,
}

/// Everything a post page needs for one request
struct PostPage {
    session: SqliteSession,
    templates: Templates,
    form: FormClass,
    csrf: SharedCsrf,
    template: &'static str,
    id: Option<i64>,
}

impl PostPage {
    async fn new(
        parts: &mut Parts,
        state: &AppState,
        template: &'static str,
        form: &FormClass,
        with_id: bool,
    ) -> Result<Self, Response> {
        let id = if with_id {
            let Path(id) = Path::<i64>::from_request_parts(parts, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Some(id)
        } else {
            None
        };
        Ok(Self {
            session: SqliteSession::new(state.pool.clone()),
            templates: state.templates.clone(),
            form: form.clone(),
            csrf: state.csrf.clone(),
            template,
            id,
        })
    }
}

impl TemplateView for PostPage {
    fn template_name(&self) -> &str {
        self.template
    }

    fn templates(&self) -> &dyn Render {
        &self.templates
    }
}

impl RedirectView for PostPage {
    fn redirect_url(&self) -> String {
        "/posts".to_string()
    }
}

#[async_trait]
impl FormView for PostPage {
    fn form_class(&self) -> &FormClass {
        &self.form
    }

    fn csrf_context(&mut self) -> Option<&mut dyn CsrfContext> {
        Some(&mut self.csrf)
    }

    /// Archiving keeps the row and hides it from the list
    async fn form_valid(&mut self, _form: &FormInstance) -> Result<HookOutcome, MixinError> {
        let Some(mut post) = self.model_instance().await? else {
            return Ok(HookOutcome::Respond(
                axum::http::StatusCode::NOT_FOUND.into_response(),
            ));
        };
        post.soft_delete(&mut self.session).await?;
        tracing::info!(id = ?post.id, "archived post");
        Ok(HookOutcome::Continue)
    }
}

impl ModelView for PostPage {
    type Model = Post;

    fn session(&mut self) -> &mut dyn Session {
        &mut self.session
    }
}

#[async_trait]
impl OneModelView for PostPage {
    async fn model_instance(&mut self) -> Result<Option<Post>, MixinError> {
        let Some(id) = self.id else {
            return Ok(None);
        };
        let post = Post::read_one(&mut self.session, [("id", Value::Integer(id))]).await?;
        Ok(post.filter(|p| !p.is_deleted()))
    }
}

#[async_trait]
impl ReadModelView for PostPage {
    async fn model_instances(&mut self) -> Result<Vec<Post>, MixinError> {
        Post::read(&mut self.session, [("deleted_at", Value::Null)]).await
    }
}

#[async_trait]
impl CreateModelView for PostPage {
    async fn model_created(&mut self, post: &Post) -> Result<HookOutcome, MixinError> {
        tracing::info!(id = ?post.id, title = %post.title, "created post");
        Ok(HookOutcome::Continue)
    }
}

#[async_trait]
impl UpdateModelView for PostPage {
    async fn before_update(
        &mut self,
        post: &mut Post,
        _form: &FormInstance,
    ) -> Result<HookOutcome, MixinError> {
        if post.body.as_deref().is_some_and(str::is_empty) {
            post.body = None;
        }
        Ok(HookOutcome::Continue)
    }
}

impl DeleteModelView for PostPage {}
impl ReadOneModelView for PostPage {}

macro_rules! page {
    ($name:ident, $template:literal, $form:ident, $with_id:literal, |$page:ident, $request:ident| $dispatch:expr) => {
        struct $name(PostPage);

        #[async_trait]
        impl View for $name {
            type State = AppState;

            async fn from_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Response> {
                PostPage::new(parts, state, $template, &state.$form, $with_id)
                    .await
                    .map(Self)
            }

            async fn dispatch(&mut self, $request: ViewRequest) -> Result<Response, MixinError> {
                let $page = &mut self.0;
                $dispatch.await
            }
        }
    };
}

page!(PostList, "list.html", post_form, false, |page, _request| page.dispatch_read());
page!(NewPost, "form.html", post_form, false, |page, request| page.dispatch_create(request));
page!(ShowPost, "show.html", post_form, true, |page, _request| page.dispatch_read_one());
page!(EditPost, "form.html", post_form, true, |page, request| page.dispatch_update(request));
page!(DeletePost, "confirm.html", confirm_form, true, |page, request| page.dispatch_delete(request));
page!(ArchivePost, "archive.html", confirm_form, true, |page, request| page.dispatch_form(request));

const LAYOUT: &str = r#"<!doctype html>
<html>
<head><script src="https://unpkg.com/htmx.org@2.0.4"></script></head>
<body hx-boost="true">
{% block content %}{% endblock %}
</body>
</html>"#;

const LIST: &str = r#"{% extends "layout.html" %}
{% block content %}
<h1>Posts</h1>
<a href="/posts/new">New post</a>
<ul>
{% for post in model_instances %}
  <li><a href="/posts/{{ post.id }}">{{ post.title }}</a> ({{ post.status }})</li>
{% else %}
  <li>Nothing yet.</li>
{% endfor %}
</ul>
{% endblock %}"#;

const SHOW: &str = r#"{% extends "layout.html" %}
{% block content %}
<h1>{{ model_instance.title }}</h1>
<p>{{ model_instance.body or "" }}</p>
<a href="/posts/{{ model_instance.id }}/edit">Edit</a>
<a href="/posts/{{ model_instance.id }}/archive">Archive</a>
<a href="/posts/{{ model_instance.id }}/delete">Delete</a>
{% endblock %}"#;

const FORM: &str = r#"{% extends "layout.html" %}
{% block content %}
<h1>{% if model_instance %}Edit {{ model_instance.title }}{% else %}New post{% endif %}</h1>
{{ form.html }}
{% endblock %}"#;

const CONFIRM: &str = r#"{% extends "layout.html" %}
{% block content %}
<p>Really remove "{{ model_instance.title }}"?</p>
{{ form.html }}
{% endblock %}"#;

const ARCHIVE: &str = r#"{% extends "layout.html" %}
{% block content %}
<p>Archive this post? It stays in the database.</p>
{{ form.html }}
{% endblock %}"#;

fn templates() -> Result<Templates, MixinError> {
    let templates = Templates::new();
    for (name, source) in [
        ("layout.html", LAYOUT),
        ("list.html", LIST),
        ("show.html", SHOW),
        ("form.html", FORM),
        ("confirm.html", CONFIRM),
        ("archive.html", ARCHIVE),
    ] {
        templates.add_template(name, source)?;
    }
    Ok(templates)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init()?;
    let config = MixinsConfig::load()?;

    let session = SqliteSession::connect_with(&config.database).await?;
    session.create_table(&*Post::schema()?).await?;

    let mut post_form = FormClass::new("Base");
    let mut confirm_form = FormClass::new("Confirm");
    if let Some(csrf) = CsrfSettings::from_config(&config.security) {
        post_form = post_form.with_csrf(csrf.clone());
        confirm_form = confirm_form.with_csrf(csrf);
    }

    let state = AppState {
        pool: session.pool().clone(),
        templates: templates()?,
        post_form: post_form
            .model_form_excluding::<Post>(&["created_at", "updated_at", "deleted_at"])?
            .with_submit("Save"),
        confirm_form: confirm_form.with_submit("Confirm"),
        csrf: SharedCsrf::default(),
    };

    let app = Router::new()
        .route("/posts", as_view::<PostList>())
        .route("/posts/new", as_view::<NewPost>())
        .route("/posts/{id}", as_view::<ShowPost>())
        .route("/posts/{id}/edit", as_view::<EditPost>())
        .route("/posts/{id}/delete", as_view::<DeletePost>())
        .route("/posts/{id}/archive", as_view::<ArchivePost>())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
