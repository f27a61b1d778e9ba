//! Request handling patterns composed from small traits
//!
//! A view is a struct built fresh for every request. It implements the
//! traits for the behavior it needs and forwards [`View::dispatch`] to the
//! matching `dispatch_*` method:
//!
//! | Trait | GET | POST |
//! |-------|-----|------|
//! | [`TemplateView`] | render | render |
//! | [`RedirectView`] | redirect | redirect |
//! | [`FormView`] | empty form | validate, then redirect or re-render |
//! | [`CreateModelView`] | empty form | validate, persist a new instance, redirect |
//! | [`UpdateModelView`] | prefilled form | validate, persist changes, redirect |
//! | [`DeleteModelView`] | confirmation | delete, redirect |
//! | [`ReadModelView`] | list | list |
//! | [`ReadOneModelView`] | one instance or 404 | one instance or 404 |
//!
//! Hooks default to [`HookOutcome::Continue`]. Returning
//! [`HookOutcome::Respond`] sends that response verbatim and skips the
//! pattern's next step.
//!
//! # Example
//!
//! ```rust,ignore
//! struct NewPost {
//!     session: SqliteSession,
//!     templates: Templates,
//!     form: FormClass,
//! }
//!
//! #[async_trait]
//! impl View for NewPost {
//!     type State = AppState;
//!
//!     async fn from_parts(_parts: &mut Parts, state: &AppState) -> Result<Self, Response> {
//!         Ok(Self {
//!             session: SqliteSession::new(state.pool.clone()),
//!             templates: state.templates.clone(),
//!             form: state.post_form.clone(),
//!         })
//!     }
//!
//!     async fn dispatch(&mut self, request: ViewRequest) -> Result<Response, MixinError> {
//!         self.dispatch_create(request).await
//!     }
//! }
//!
//! let app = Router::new().route("/posts/new", as_view::<NewPost>()).with_state(state);
//! ```

pub mod form;
pub mod model;
pub mod redirect;
pub mod template;

pub use form::{FormStep, FormView};
pub use model::{
    CreateModelView, DeleteModelView, ModelView, OneModelView, ReadModelView, ReadOneModelView,
    UpdateModelView, MODEL_INSTANCES_CONTEXT_KEY, MODEL_INSTANCE_CONTEXT_KEY,
};
pub use redirect::{redirect_response, RedirectView};
pub use template::TemplateView;

use async_trait::async_trait;
use axum::extract::{FromRequest, FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, MethodRouter};
use axum::Form;
use axum_htmx::HxRequest;

use crate::error::MixinError;
use crate::forms::FormData;
use crate::models::short_type_name;

/// Context key of the form instance
pub const FORM_CONTEXT_KEY: &str = "form";

/// Result of an extension hook
#[derive(Debug)]
pub enum HookOutcome {
    /// Carry on with the default next step
    Continue,
    /// Send this response instead
    Respond(Response),
}

impl HookOutcome {
    /// Short-circuit with any response
    pub fn respond(response: impl IntoResponse) -> Self {
        Self::Respond(response.into_response())
    }
}

impl From<Option<Response>> for HookOutcome {
    fn from(response: Option<Response>) -> Self {
        response.map_or(Self::Continue, Self::Respond)
    }
}

/// What a view needs to know about the incoming request
#[derive(Debug, Clone)]
pub struct ViewRequest {
    /// HTTP method
    pub method: Method,
    /// Submitted form fields; empty for read-only methods
    pub data: FormData,
    /// Whether htmx sent the request
    pub is_htmx: bool,
}

impl ViewRequest {
    /// A plain GET request
    #[must_use]
    pub const fn get() -> Self {
        Self {
            method: Method::GET,
            data: Vec::new(),
            is_htmx: false,
        }
    }

    /// A POST request carrying `data`
    #[must_use]
    pub fn post<K, V>(data: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            method: Method::POST,
            data: data
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            is_htmx: false,
        }
    }

    /// Mark the request as sent by htmx
    #[must_use]
    pub const fn htmx(mut self) -> Self {
        self.is_htmx = true;
        self
    }

    /// Whether the method carries a submission (anything but GET and HEAD)
    #[must_use]
    pub fn is_submission(&self) -> bool {
        !matches!(self.method, Method::GET | Method::HEAD)
    }
}

impl<S> FromRequest<S> for ViewRequest
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();
        let is_htmx = matches!(
            HxRequest::from_request_parts(&mut parts, state).await,
            Ok(HxRequest(true))
        );
        let mut request = Self {
            method: parts.method.clone(),
            data: Vec::new(),
            is_htmx,
        };

        if request.is_submission() {
            let Form(data) = Form::<FormData>::from_request(Request::from_parts(parts, body), state)
                .await
                .map_err(IntoResponse::into_response)?;
            request.data = data;
        }
        Ok(request)
    }
}

/// A view constructed per request and routed with [`as_view`]
#[async_trait]
pub trait View: Sized + Send + 'static {
    /// Router state the view is built from
    type State: Clone + Send + Sync + 'static;

    /// Build the view for one request
    ///
    /// Extract path parameters, sessions or anything else from `parts`.
    /// An `Err` response is sent as is.
    async fn from_parts(parts: &mut Parts, state: &Self::State) -> Result<Self, Response>;

    /// Handle the request
    async fn dispatch(&mut self, request: ViewRequest) -> Result<Response, MixinError>;
}

/// Route GET and POST to a fresh `V` per request
pub fn as_view<V: View>() -> MethodRouter<V::State> {
    get(handle::<V>).post(handle::<V>)
}

async fn handle<V: View>(State(state): State<V::State>, request: Request) -> Response {
    let (mut parts, body) = request.into_parts();
    let mut view = match V::from_parts(&mut parts, &state).await {
        Ok(view) => view,
        Err(response) => return response,
    };
    let request = match ViewRequest::from_request(Request::from_parts(parts, body), &state).await {
        Ok(request) => request,
        Err(response) => return response,
    };

    tracing::debug!(
        view = short_type_name::<V>(),
        method = %request.method,
        htmx = request.is_htmx,
        "dispatching view"
    );
    view.dispatch(request)
        .await
        .unwrap_or_else(IntoResponse::into_response)
}

/// Plain 404 response
#[must_use]
pub fn not_found() -> Response {
    StatusCode::NOT_FOUND.into_response()
}
