//! Views that create, read, update and delete model instances
//!
//! Instances reach templates as [`Record`]s, so a template sees every
//! column by name: `{{ model_instance.title }}`.

use async_trait::async_trait;
use axum::response::Response;

use super::{not_found, FormStep, FormView, HookOutcome, TemplateView, ViewRequest};
use crate::error::MixinError;
use crate::forms::FormInstance;
use crate::models::mixins::remove;
use crate::models::{persist, Model, Record};
use crate::session::Session;
use crate::template::Context;

/// Context key of the single instance
pub const MODEL_INSTANCE_CONTEXT_KEY: &str = "model_instance";

/// Context key of the instance list
pub const MODEL_INSTANCES_CONTEXT_KEY: &str = "model_instances";

/// A view working with one model type through a session
pub trait ModelView: Send {
    /// The model
    type Model: Model;

    /// The request's persistence session
    fn session(&mut self) -> &mut dyn Session;
}

/// A view working with one existing instance
#[async_trait]
pub trait OneModelView: ModelView {
    /// Load the instance, usually by a path parameter; `None` answers 404
    async fn model_instance(&mut self) -> Result<Option<Self::Model>, MixinError>;
}

fn instance_context<M: Model>(instance: &M) -> Result<Context, MixinError> {
    let record = Record::from_model(instance)?;
    let mut context = Context::new();
    context.insert(
        MODEL_INSTANCE_CONTEXT_KEY.to_string(),
        minijinja::Value::from_serialize(&record),
    );
    Ok(context)
}

/// Create an instance from a valid submission
///
/// The new instance is populated from the form, passed to
/// [`CreateModelView::before_create`], then added and committed.
#[async_trait]
pub trait CreateModelView: FormView + ModelView {
    /// Fresh instance to populate
    fn new_model_instance(&self) -> Self::Model {
        Self::Model::default()
    }

    /// Runs before the instance is persisted; `Respond` skips persisting
    async fn before_create(
        &mut self,
        _instance: &mut Self::Model,
        _form: &FormInstance,
    ) -> Result<HookOutcome, MixinError> {
        Ok(HookOutcome::Continue)
    }

    /// Runs after the commit, before the redirect
    async fn model_created(&mut self, _instance: &Self::Model) -> Result<HookOutcome, MixinError> {
        Ok(HookOutcome::Continue)
    }

    /// Handle one request
    ///
    /// # Errors
    ///
    /// Propagates form, fill, hook, session and rendering errors.
    async fn dispatch_create(&mut self, request: ViewRequest) -> Result<Response, MixinError> {
        if !request.is_submission() {
            let form = self.make_form(None)?;
            return self.render_form(&form, Context::new());
        }
        let form = match self.process_form(&request, Context::new()).await? {
            FormStep::Respond(response) => return Ok(response),
            FormStep::Valid(form) => form,
        };

        let mut instance = self.new_model_instance();
        form.populate(&mut instance)?;
        if let HookOutcome::Respond(response) = self.before_create(&mut instance, &form).await? {
            return Ok(response);
        }

        persist(&mut instance, self.session()).await?;
        if let HookOutcome::Respond(response) = self.model_created(&instance).await? {
            return Ok(response);
        }
        Ok(self.dispatch_redirect(&request))
    }
}

/// Edit an existing instance
///
/// GET renders the form prefilled from the instance. The template also
/// receives the instance under [`MODEL_INSTANCE_CONTEXT_KEY`].
#[async_trait]
pub trait UpdateModelView: FormView + OneModelView {
    /// Runs before the changes are persisted; `Respond` skips persisting
    async fn before_update(
        &mut self,
        _instance: &mut Self::Model,
        _form: &FormInstance,
    ) -> Result<HookOutcome, MixinError> {
        Ok(HookOutcome::Continue)
    }

    /// Handle one request
    ///
    /// # Errors
    ///
    /// Propagates form, fill, hook, session and rendering errors.
    async fn dispatch_update(&mut self, request: ViewRequest) -> Result<Response, MixinError> {
        let Some(mut instance) = self.model_instance().await? else {
            return Ok(not_found());
        };
        let extra = instance_context(&instance)?;

        if !request.is_submission() {
            let record = Record::from_model(&instance)?;
            let form = self.make_form(None)?.initial(&record);
            return self.render_form(&form, extra);
        }
        let form = match self.process_form(&request, extra).await? {
            FormStep::Respond(response) => return Ok(response),
            FormStep::Valid(form) => form,
        };

        form.populate(&mut instance)?;
        if let HookOutcome::Respond(response) = self.before_update(&mut instance, &form).await? {
            return Ok(response);
        }
        persist(&mut instance, self.session()).await?;
        Ok(self.dispatch_redirect(&request))
    }
}

/// Confirm and delete an existing instance
///
/// GET renders a confirmation with the instance under
/// [`MODEL_INSTANCE_CONTEXT_KEY`]; a valid submission hard-deletes it.
#[async_trait]
pub trait DeleteModelView: FormView + OneModelView {
    /// Runs before the row is deleted; `Respond` keeps it
    async fn before_delete(
        &mut self,
        _instance: &Self::Model,
        _form: &FormInstance,
    ) -> Result<HookOutcome, MixinError> {
        Ok(HookOutcome::Continue)
    }

    /// Handle one request
    ///
    /// # Errors
    ///
    /// Propagates form, hook, session and rendering errors.
    async fn dispatch_delete(&mut self, request: ViewRequest) -> Result<Response, MixinError> {
        let Some(instance) = self.model_instance().await? else {
            return Ok(not_found());
        };
        let extra = instance_context(&instance)?;

        if !request.is_submission() {
            let form = self.make_form(None)?;
            return self.render_form(&form, extra);
        }
        let form = match self.process_form(&request, extra).await? {
            FormStep::Respond(response) => return Ok(response),
            FormStep::Valid(form) => form,
        };

        if let HookOutcome::Respond(response) = self.before_delete(&instance, &form).await? {
            return Ok(response);
        }
        remove(&instance, self.session()).await?;
        Ok(self.dispatch_redirect(&request))
    }
}

/// List instances
#[async_trait]
pub trait ReadModelView: TemplateView + ModelView {
    /// Instances to list
    async fn model_instances(&mut self) -> Result<Vec<Self::Model>, MixinError>;

    /// Render the template with the instances under [`MODEL_INSTANCES_CONTEXT_KEY`]
    ///
    /// # Errors
    ///
    /// Propagates hook and rendering errors.
    async fn dispatch_read(&mut self) -> Result<Response, MixinError> {
        let records = self
            .model_instances()
            .await?
            .iter()
            .map(Record::from_model)
            .collect::<Result<Vec<_>, _>>()?;

        let mut context = self.template_context();
        context.insert(
            MODEL_INSTANCES_CONTEXT_KEY.to_string(),
            minijinja::Value::from_serialize(&records),
        );
        self.render_template(&context)
    }
}

/// Show one instance
#[async_trait]
pub trait ReadOneModelView: TemplateView + OneModelView {
    /// Render the template with the instance, or 404 when there is none
    ///
    /// # Errors
    ///
    /// Propagates hook and rendering errors.
    async fn dispatch_read_one(&mut self) -> Result<Response, MixinError> {
        let Some(instance) = self.model_instance().await? else {
            return Ok(not_found());
        };
        let mut context = self.template_context();
        context.extend(instance_context(&instance)?);
        self.render_template(&context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::FormClass;
    use crate::models::{CrudModel, Value};
    use crate::session::{MockSession, SqliteSession};
    use crate::template::{Render, Templates};
    use crate::testing::{body_string, memory_session, Post};
    use crate::views::RedirectView;
    use axum::http::StatusCode;

    const FORM_TEMPLATE: &str = "{% if model_instance %}{{ model_instance.title }}{% endif %}|{% for field in form.fields %}\
        {{ field.name }}={{ field.value or \"\" }}{% for e in field.errors %}!{{ e }}{% endfor %};{% endfor %}";
    const LIST_TEMPLATE: &str =
        "{% for post in model_instances %}{{ post.id }}:{{ post.title }};{% endfor %}";
    const SHOW_TEMPLATE: &str = "{{ model_instance.title }} ({{ model_instance.status }})";

    fn templates() -> Templates {
        let templates = Templates::new();
        templates.add_template("form.txt", FORM_TEMPLATE).unwrap();
        templates.add_template("list.txt", LIST_TEMPLATE).unwrap();
        templates.add_template("show.txt", SHOW_TEMPLATE).unwrap();
        templates
    }

    struct PostView {
        session: SqliteSession,
        templates: Templates,
        form: FormClass,
        template: &'static str,
        id: i64,
        created: Option<i64>,
        hold: bool,
    }

    impl PostView {
        async fn new(template: &'static str) -> Self {
            Self {
                session: memory_session().await,
                templates: templates(),
                form: FormClass::new("Base")
                    .model_form::<Post>(&["title", "status"])
                    .unwrap(),
                template,
                id: 1,
                created: None,
                hold: false,
            }
        }

        async fn seed(&mut self, titles: &[&str]) {
            for title in titles {
                Post::create(&mut self.session, [("title", Value::from(*title))])
                    .await
                    .unwrap();
            }
        }

        async fn titles(&mut self) -> Vec<String> {
            Post::read(&mut self.session, Vec::<(&str, Value)>::new())
                .await
                .unwrap()
                .into_iter()
                .map(|p| p.title)
                .collect()
        }
    }

    impl TemplateView for PostView {
        fn template_name(&self) -> &str {
            self.template
        }

        fn templates(&self) -> &dyn Render {
            &self.templates
        }
    }

    impl RedirectView for PostView {
        fn redirect_url(&self) -> String {
            self.created
                .map_or_else(|| "/posts".to_string(), |id| format!("/posts/{id}"))
        }
    }

    impl FormView for PostView {
        fn form_class(&self) -> &FormClass {
            &self.form
        }
    }

    impl ModelView for PostView {
        type Model = Post;

        fn session(&mut self) -> &mut dyn Session {
            &mut self.session
        }
    }

    #[async_trait]
    impl OneModelView for PostView {
        async fn model_instance(&mut self) -> Result<Option<Post>, MixinError> {
            Post::read_one(&mut self.session, [("id", Value::Integer(self.id))]).await
        }
    }

    #[async_trait]
    impl CreateModelView for PostView {
        async fn before_create(
            &mut self,
            instance: &mut Post,
            _form: &FormInstance,
        ) -> Result<HookOutcome, MixinError> {
            if self.hold {
                return Ok(HookOutcome::respond(StatusCode::ACCEPTED));
            }
            instance.title = instance.title.trim().to_string();
            Ok(HookOutcome::Continue)
        }

        async fn model_created(&mut self, instance: &Post) -> Result<HookOutcome, MixinError> {
            self.created = instance.id;
            Ok(HookOutcome::Continue)
        }
    }

    #[async_trait]
    impl UpdateModelView for PostView {}

    #[async_trait]
    impl DeleteModelView for PostView {
        async fn before_delete(
            &mut self,
            instance: &Post,
            _form: &FormInstance,
        ) -> Result<HookOutcome, MixinError> {
            if instance.status == "live" {
                return Ok(HookOutcome::respond(StatusCode::CONFLICT));
            }
            Ok(HookOutcome::Continue)
        }
    }

    #[async_trait]
    impl ReadModelView for PostView {
        async fn model_instances(&mut self) -> Result<Vec<Post>, MixinError> {
            Post::read(&mut self.session, [("status", Value::from("draft"))]).await
        }
    }

    #[async_trait]
    impl ReadOneModelView for PostView {}

    #[tokio::test]
    async fn test_create_persists_and_redirects() {
        let mut view = PostView::new("form.txt").await;
        let response = view
            .dispatch_create(ViewRequest::post([("title", "  Hello  "), ("status", "live")]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/posts/1");
        let post = Post::read_one(&mut view.session, [("id", Value::Integer(1))])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(post.title, "Hello");
        assert_eq!(post.status, "live");
        assert!(post.created_at.is_some());
    }

    #[tokio::test]
    async fn test_create_get_renders_empty_form() {
        let mut view = PostView::new("form.txt").await;
        let response = view.dispatch_create(ViewRequest::get()).await.unwrap();
        assert_eq!(body_string(response).await, "|title=;status=;");
    }

    #[tokio::test]
    async fn test_create_invalid_does_not_touch_session() {
        let mut view = PostView::new("form.txt").await;
        let response = view
            .dispatch_create(ViewRequest::post([("title", ""), ("status", "draft")]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_string(response).await,
            "|title=!This field is required.;status=draft;"
        );
        assert!(view.titles().await.is_empty());
    }

    #[tokio::test]
    async fn test_before_create_respond_skips_persist() {
        let mut view = PostView::new("form.txt").await;
        view.hold = true;
        let response = view
            .dispatch_create(ViewRequest::post([("title", "Held"), ("status", "draft")]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert!(view.titles().await.is_empty());
        assert_eq!(view.created, None);
    }

    #[tokio::test]
    async fn test_create_commit_failure_propagates() {
        struct Failing {
            session: MockSession,
            inner: PostView,
        }

        impl TemplateView for Failing {
            fn template_name(&self) -> &str {
                self.inner.template_name()
            }

            fn templates(&self) -> &dyn Render {
                self.inner.templates()
            }
        }

        impl RedirectView for Failing {
            fn redirect_url(&self) -> String {
                self.inner.redirect_url()
            }
        }

        impl FormView for Failing {
            fn form_class(&self) -> &FormClass {
                self.inner.form_class()
            }
        }

        impl ModelView for Failing {
            type Model = Post;

            fn session(&mut self) -> &mut dyn Session {
                &mut self.session
            }
        }

        #[async_trait]
        impl CreateModelView for Failing {}

        let mut session = MockSession::new();
        session.expect_add().times(1).returning(|_| Ok(9));
        session
            .expect_commit()
            .times(1)
            .returning(|| Err(MixinError::Session("disk full".into())));

        let mut view = Failing {
            session,
            inner: PostView::new("form.txt").await,
        };
        let err = view
            .dispatch_create(ViewRequest::post([("title", "Doomed"), ("status", "draft")]))
            .await
            .unwrap_err();
        assert!(matches!(err, MixinError::Session(ref m) if m == "disk full"));
    }

    #[tokio::test]
    async fn test_update_prefills_and_saves() {
        let mut view = PostView::new("form.txt").await;
        view.seed(&["Original"]).await;

        let page = view.dispatch_update(ViewRequest::get()).await.unwrap();
        assert_eq!(
            body_string(page).await,
            "Original|title=Original;status=draft;"
        );

        let response = view
            .dispatch_update(ViewRequest::post([("title", "Edited"), ("status", "live")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/posts");

        let post = view.model_instance().await.unwrap().unwrap();
        assert_eq!(post.id, Some(1));
        assert_eq!(post.title, "Edited");
        assert_eq!(post.status, "live");
        assert_eq!(view.titles().await, ["Edited"]);
    }

    #[tokio::test]
    async fn test_update_invalid_keeps_instance_in_context() {
        let mut view = PostView::new("form.txt").await;
        view.seed(&["Original"]).await;

        let response = view
            .dispatch_update(ViewRequest::post([("title", "Edited"), ("status", "gone")]))
            .await
            .unwrap();
        assert_eq!(
            body_string(response).await,
            "Original|title=Edited;status=gone!Not a valid choice.;"
        );
        assert_eq!(view.titles().await, ["Original"]);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let mut view = PostView::new("form.txt").await;
        let response = view.dispatch_update(ViewRequest::get()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_confirms_then_removes() {
        let mut view = PostView::new("form.txt").await;
        view.form = FormClass::new("Confirm");
        view.seed(&["Doomed", "Kept"]).await;

        let page = view.dispatch_delete(ViewRequest::get()).await.unwrap();
        assert_eq!(body_string(page).await, "Doomed|");
        assert_eq!(view.titles().await.len(), 2);

        let response = view
            .dispatch_delete(ViewRequest::post([("confirm", "y")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(view.titles().await, ["Kept"]);

        let again = view.dispatch_delete(ViewRequest::post([("confirm", "y")])).await.unwrap();
        assert_eq!(again.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_before_delete_can_refuse() {
        let mut view = PostView::new("form.txt").await;
        view.form = FormClass::new("Confirm");
        Post::create(
            &mut view.session,
            [("title", Value::from("Public")), ("status", Value::from("live"))],
        )
        .await
        .unwrap();

        let response = view
            .dispatch_delete(ViewRequest::post([("confirm", "y")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(view.titles().await, ["Public"]);
    }

    #[tokio::test]
    async fn test_read_lists_instances() {
        let mut view = PostView::new("list.txt").await;
        view.seed(&["First", "Second"]).await;
        Post::create(
            &mut view.session,
            [("title", Value::from("Hidden")), ("status", Value::from("live"))],
        )
        .await
        .unwrap();

        let response = view.dispatch_read().await.unwrap();
        assert_eq!(body_string(response).await, "1:First;2:Second;");
    }

    #[tokio::test]
    async fn test_read_empty_list() {
        let mut view = PostView::new("list.txt").await;
        let response = view.dispatch_read().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "");
    }

    #[tokio::test]
    async fn test_read_one_found_and_missing() {
        let mut view = PostView::new("show.txt").await;
        view.seed(&["Only"]).await;

        let found = view.dispatch_read_one().await.unwrap();
        assert_eq!(body_string(found).await, "Only (draft)");

        view.id = 42;
        let missing = view.dispatch_read_one().await.unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
