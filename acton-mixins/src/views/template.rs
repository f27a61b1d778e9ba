//! Render a named template

use async_trait::async_trait;
use axum::response::{Html, IntoResponse, Response};

use crate::error::MixinError;
use crate::template::{Context, Render};

/// A view that renders one template
#[async_trait]
pub trait TemplateView: Send {
    /// Template to render
    fn template_name(&self) -> &str;

    /// Renderer holding the template
    fn templates(&self) -> &dyn Render;

    /// Base context; other view traits add their own keys on top
    fn template_context(&self) -> Context {
        Context::new()
    }

    /// Render the template with `context` into an HTML response
    ///
    /// # Errors
    ///
    /// Propagates rendering errors.
    fn render_template(&self, context: &Context) -> Result<Response, MixinError> {
        let html = self.templates().render(self.template_name(), context)?;
        Ok(Html(html).into_response())
    }

    /// Render the template with [`TemplateView::template_context`]
    ///
    /// # Errors
    ///
    /// Propagates rendering errors.
    async fn dispatch_template(&mut self) -> Result<Response, MixinError> {
        let context = self.template_context();
        self.render_template(&context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::Templates;
    use crate::testing::body_string;
    use axum::http::StatusCode;

    struct Greeting {
        templates: Templates,
        name: &'static str,
    }

    impl TemplateView for Greeting {
        fn template_name(&self) -> &str {
            "greeting.html"
        }

        fn templates(&self) -> &dyn Render {
            &self.templates
        }

        fn template_context(&self) -> Context {
            let mut context = Context::new();
            context.insert("name".into(), self.name.into());
            context
        }
    }

    #[tokio::test]
    async fn test_dispatch_renders_context() {
        let templates = Templates::new();
        templates
            .add_template("greeting.html", "Hello {{ name }}")
            .unwrap();
        let mut view = Greeting {
            templates,
            name: "Ada",
        };

        let response = view.dispatch_template().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "text/html; charset=utf-8"
        );
        assert_eq!(body_string(response).await, "Hello Ada");
    }

    #[tokio::test]
    async fn test_missing_template_propagates() {
        let mut view = Greeting {
            templates: Templates::new(),
            name: "Ada",
        };
        assert!(matches!(
            view.dispatch_template().await,
            Err(MixinError::Template(_))
        ));
    }
}
