//! Template rendering for views
//!
//! Views render through the [`Render`] trait so hosts can plug in any
//! engine. [`Templates`] is the bundled minijinja implementation: templates
//! are registered from strings or loaded lazily from a directory.
//!
//! # Example
//!
//! ```rust
//! use acton_mixins::template::{Context, Render, Templates};
//!
//! let templates = Templates::new();
//! templates.add_template("hello.html", "Hello {{ name }}!")?;
//!
//! let mut context = Context::new();
//! context.insert("name".into(), "world".into());
//! assert_eq!(templates.render("hello.html", &context)?, "Hello world!");
//! # Ok::<(), acton_mixins::MixinError>(())
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use minijinja::{path_loader, Environment};
use parking_lot::RwLock;

use crate::config::TemplateSettings;
use crate::error::MixinError;

/// Variables passed to a template
pub type Context = BTreeMap<String, minijinja::Value>;

/// Renders a named template with a context
pub trait Render: Send + Sync {
    /// Render `name`
    ///
    /// # Errors
    ///
    /// Returns an error if the template is missing or fails to render.
    fn render(&self, name: &str, context: &Context) -> Result<String, MixinError>;
}

/// Shared minijinja environment
///
/// Cloning is cheap; clones share the same environment.
#[derive(Clone)]
pub struct Templates {
    env: Arc<RwLock<Environment<'static>>>,
    from_disk: bool,
    auto_reload: bool,
}

impl fmt::Debug for Templates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Templates")
            .field("from_disk", &self.from_disk)
            .field("auto_reload", &self.auto_reload)
            .finish_non_exhaustive()
    }
}

impl Default for Templates {
    fn default() -> Self {
        Self::new()
    }
}

impl Templates {
    /// Empty environment; register templates with [`Templates::add_template`]
    #[must_use]
    pub fn new() -> Self {
        Self::with_environment(Self::environment(), false, false)
    }

    /// Load templates from `dir` on first use
    #[must_use]
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let mut env = Self::environment();
        env.set_loader(path_loader(dir.as_ref()));
        Self::with_environment(env, true, false)
    }

    /// Directory environment configured by [`TemplateSettings`]
    #[must_use]
    pub fn from_config(settings: &TemplateSettings) -> Self {
        let mut templates = Self::from_dir(&settings.template_dir);
        templates.auto_reload = settings.auto_reload;
        tracing::debug!(
            dir = %settings.template_dir.display(),
            auto_reload = settings.auto_reload,
            "configured template directory"
        );
        templates
    }

    fn with_environment(env: Environment<'static>, from_disk: bool, auto_reload: bool) -> Self {
        Self {
            env: Arc::new(RwLock::new(env)),
            from_disk,
            auto_reload,
        }
    }

    fn environment() -> Environment<'static> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env
    }

    /// Register a template from source
    ///
    /// # Errors
    ///
    /// Returns an error if the source does not parse.
    pub fn add_template(
        &self,
        name: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<(), MixinError> {
        self.env
            .write()
            .add_template_owned(name.into(), source.into())
            .map_err(Into::into)
    }

    /// Drop cached templates so the next render reads them from disk again
    pub fn reload(&self) {
        if self.from_disk {
            self.env.write().clear_templates();
            tracing::debug!("cleared cached templates");
        }
    }
}

impl Render for Templates {
    fn render(&self, name: &str, context: &Context) -> Result<String, MixinError> {
        if self.auto_reload {
            self.reload();
        }
        let html = self
            .env
            .read()
            .get_template(name)
            .and_then(|tmpl| tmpl.render(context))?;
        tracing::debug!(template = name, bytes = html.len(), "rendered template");
        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn context(pairs: &[(&str, &str)]) -> Context {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), minijinja::Value::from(*v)))
            .collect()
    }

    #[test]
    fn test_render_registered_template() {
        let templates = Templates::new();
        templates
            .add_template("post.html", "{% if title %}<h1>{{ title }}</h1>{% endif %}")
            .unwrap();

        let html = templates
            .render("post.html", &context(&[("title", "<b>")]))
            .unwrap();
        assert_eq!(html, "<h1>&lt;b&gt;</h1>");
    }

    #[test]
    fn test_missing_template_is_error() {
        let err = Templates::new().render("absent.html", &Context::new()).unwrap_err();
        assert!(matches!(err, MixinError::Template(_)));
    }

    #[test]
    fn test_syntax_error_on_add() {
        assert!(Templates::new().add_template("bad.html", "{% if %}").is_err());
    }

    #[test]
    fn test_from_config_reloads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("page.html"), "first").unwrap();

        let templates = Templates::from_config(&TemplateSettings {
            template_dir: dir.path().to_path_buf(),
            auto_reload: true,
        });
        assert_eq!(templates.render("page.html", &Context::new()).unwrap(), "first");

        fs::write(dir.path().join("page.html"), "second").unwrap();
        assert_eq!(templates.render("page.html", &Context::new()).unwrap(), "second");
    }
}
