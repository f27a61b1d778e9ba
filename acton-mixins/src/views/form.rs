//! Render a form and act on its submission

use async_trait::async_trait;
use axum::response::Response;

use super::{HookOutcome, RedirectView, TemplateView, ViewRequest, FORM_CONTEXT_KEY};
use crate::error::MixinError;
use crate::forms::{CsrfContext, FormClass, FormData, FormInstance};
use crate::template::Context;

/// Where a processed submission goes next
#[derive(Debug)]
pub enum FormStep {
    /// The submission is finished with this response
    Respond(Response),
    /// The form validated
    Valid(FormInstance),
}

/// A view that renders a form and processes its submission
///
/// Read-only requests render the template with an empty form under
/// [`FORM_CONTEXT_KEY`]. A valid submission runs
/// [`FormView::form_valid`] and redirects. An invalid one runs
/// [`FormView::form_invalid`] and re-renders the template with the
/// submitted form and its errors.
#[async_trait]
pub trait FormView: TemplateView + RedirectView {
    /// Class the per-request form is built from
    fn form_class(&self) -> &FormClass;

    /// Session store for CSRF protected classes
    fn csrf_context(&mut self) -> Option<&mut dyn CsrfContext> {
        None
    }

    /// Build the form for this request; `data` is `None` when nothing was submitted
    ///
    /// # Errors
    ///
    /// See [`FormClass::construct`].
    fn make_form(&mut self, data: Option<FormData>) -> Result<FormInstance, MixinError> {
        let class = self.form_class().clone();
        class.construct(data, self.csrf_context())
    }

    /// Template context with the form added
    fn form_context(&self, form: &FormInstance) -> Context {
        let mut context = self.template_context();
        context.insert(
            FORM_CONTEXT_KEY.to_string(),
            minijinja::Value::from_serialize(form),
        );
        context
    }

    /// Runs after a submission validates
    async fn form_valid(&mut self, _form: &FormInstance) -> Result<HookOutcome, MixinError> {
        Ok(HookOutcome::Continue)
    }

    /// Runs after a submission fails validation
    async fn form_invalid(&mut self, _form: &FormInstance) -> Result<HookOutcome, MixinError> {
        Ok(HookOutcome::Continue)
    }

    /// Render `form` with the base context, `extra` and the form itself
    ///
    /// # Errors
    ///
    /// Propagates rendering errors.
    fn render_form(&self, form: &FormInstance, extra: Context) -> Result<Response, MixinError> {
        let mut context = self.form_context(form);
        context.extend(extra);
        self.render_template(&context)
    }

    /// Validate the submission; an invalid form is answered here
    ///
    /// The re-rendered template also receives `extra`.
    ///
    /// # Errors
    ///
    /// Propagates construction, hook and rendering errors.
    async fn process_form(
        &mut self,
        request: &ViewRequest,
        extra: Context,
    ) -> Result<FormStep, MixinError> {
        let mut form = self.make_form(Some(request.data.clone()))?;
        if form.validate() {
            return Ok(FormStep::Valid(form));
        }

        tracing::debug!(
            form = form.class().name(),
            errors = form.errors().count(),
            "rejected submission"
        );
        if let HookOutcome::Respond(response) = self.form_invalid(&form).await? {
            return Ok(FormStep::Respond(response));
        }
        self.render_form(&form, extra).map(FormStep::Respond)
    }

    /// Handle one request
    ///
    /// # Errors
    ///
    /// Propagates construction, hook and rendering errors.
    async fn dispatch_form(&mut self, request: ViewRequest) -> Result<Response, MixinError> {
        if !request.is_submission() {
            let form = self.make_form(None)?;
            return self.render_form(&form, Context::new());
        }

        match self.process_form(&request, Context::new()).await? {
            FormStep::Respond(response) => Ok(response),
            FormStep::Valid(form) => match self.form_valid(&form).await? {
                HookOutcome::Respond(response) => Ok(response),
                HookOutcome::Continue => Ok(self.dispatch_redirect(&request)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::{
        CsrfSettings, FieldDescriptor, FieldType, MemoryCsrfContext, Validator, CSRF_FIELD,
    };
    use crate::models::Value;
    use crate::template::{Render, Templates};
    use crate::testing::body_string;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    const TEMPLATE: &str = "{% for field in form.fields %}{{ field.name }}={{ field.value or \"\" }}\
        {% for e in field.errors %}!{{ e }}{% endfor %};{% endfor %}";

    struct Subscribe {
        templates: Templates,
        class: FormClass,
        csrf: MemoryCsrfContext,
        accepted: Vec<Value>,
        veto: bool,
    }

    impl Subscribe {
        fn new(class: FormClass) -> Self {
            let templates = Templates::new();
            templates.add_template("subscribe.txt", TEMPLATE).unwrap();
            Self {
                templates,
                class,
                csrf: MemoryCsrfContext::new(),
                accepted: Vec::new(),
                veto: false,
            }
        }
    }

    impl TemplateView for Subscribe {
        fn template_name(&self) -> &str {
            "subscribe.txt"
        }

        fn templates(&self) -> &dyn Render {
            &self.templates
        }
    }

    impl RedirectView for Subscribe {
        fn redirect_url(&self) -> String {
            "/thanks".into()
        }
    }

    #[async_trait]
    impl FormView for Subscribe {
        fn form_class(&self) -> &FormClass {
            &self.class
        }

        fn csrf_context(&mut self) -> Option<&mut dyn CsrfContext> {
            Some(&mut self.csrf)
        }

        async fn form_valid(&mut self, form: &FormInstance) -> Result<HookOutcome, MixinError> {
            if self.veto {
                return Ok(HookOutcome::respond((StatusCode::ACCEPTED, "held")));
            }
            self.accepted.extend(form.value("email").cloned());
            Ok(HookOutcome::Continue)
        }
    }

    fn email_form() -> FormClass {
        FormClass::new("Subscribe").field(
            FieldDescriptor::new("email", FieldType::Text)
                .validator(Validator::InputRequired)
                .validator(Validator::Length {
                    min: Some(3),
                    max: None,
                }),
        )
    }

    #[tokio::test]
    async fn test_get_renders_empty_form() {
        let mut view = Subscribe::new(email_form());
        let response = view.dispatch_form(ViewRequest::get()).await.unwrap();
        assert_eq!(body_string(response).await, "email=;");
        assert!(view.accepted.is_empty());
    }

    #[tokio::test]
    async fn test_valid_submission_redirects() {
        let mut view = Subscribe::new(email_form());
        let response = view
            .dispatch_form(ViewRequest::post([("email", "ada@example.com")]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/thanks");
        assert_eq!(view.accepted, vec![Value::from("ada@example.com")]);
    }

    #[tokio::test]
    async fn test_invalid_submission_rerenders_with_errors() {
        let mut view = Subscribe::new(email_form());
        let response = view
            .dispatch_form(ViewRequest::post([("email", "a")]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_string(response).await,
            "email=a!Field must be at least 3 character(s) long.;"
        );
        assert!(view.accepted.is_empty());
    }

    #[tokio::test]
    async fn test_form_valid_hook_short_circuits() {
        let mut view = Subscribe::new(email_form());
        view.veto = true;
        let response = view
            .dispatch_form(ViewRequest::post([("email", "ada@example.com")]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(body_string(response).await, "held");
    }

    #[tokio::test]
    async fn test_csrf_protected_round_trip() {
        let mut view = Subscribe::new(email_form().with_csrf(CsrfSettings::new("secret")));

        let form = view.make_form(None).unwrap();
        let token = form.csrf_token().unwrap().to_string();

        let rejected = view
            .dispatch_form(ViewRequest::post([("email", "ada@example.com")]))
            .await
            .unwrap();
        assert_eq!(rejected.status(), StatusCode::OK);
        assert!(view.accepted.is_empty());

        let accepted = view
            .dispatch_form(ViewRequest::post([
                ("email", "ada@example.com"),
                (CSRF_FIELD, token.as_str()),
            ]))
            .await
            .unwrap();
        assert_eq!(accepted.status(), StatusCode::SEE_OTHER);
        assert_eq!(view.accepted.len(), 1);
    }

    #[tokio::test]
    async fn test_form_invalid_hook_responds() {
        struct Strict(Subscribe);

        impl TemplateView for Strict {
            fn template_name(&self) -> &str {
                self.0.template_name()
            }

            fn templates(&self) -> &dyn Render {
                self.0.templates()
            }
        }

        impl RedirectView for Strict {
            fn redirect_url(&self) -> String {
                self.0.redirect_url()
            }
        }

        #[async_trait]
        impl FormView for Strict {
            fn form_class(&self) -> &FormClass {
                &self.0.class
            }

            async fn form_invalid(
                &mut self,
                _form: &FormInstance,
            ) -> Result<HookOutcome, MixinError> {
                Ok(HookOutcome::Respond(
                    StatusCode::UNPROCESSABLE_ENTITY.into_response(),
                ))
            }
        }

        let mut view = Strict(Subscribe::new(email_form()));
        let response = view
            .dispatch_form(ViewRequest::post([("email", "")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
