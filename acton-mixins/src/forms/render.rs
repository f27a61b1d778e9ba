//! Form rendering to HTML
//!
//! Renders form instances to HTML strings with proper escaping
//! and validation error display.

use std::fmt::Write;

use super::csrf::CSRF_FIELD;
use super::field::{FieldDescriptor, FieldType, InputType};
use super::form::FormInstance;
use super::ValidationErrors;

/// Options for customizing form rendering
#[derive(Debug, Clone)]
pub struct FormRenderOptions {
    /// Form `action`; omitted to post back to the current URL
    pub action: Option<String>,
    /// CSS class for form groups (wrapper around label + input + errors)
    pub group_class: String,
    /// CSS class for labels
    pub label_class: String,
    /// CSS class for input elements
    pub input_class: String,
    /// CSS class for error messages
    pub error_class: String,
    /// CSS class for help text
    pub help_class: String,
    /// CSS class for submit button
    pub submit_class: String,
    /// CSS class applied to inputs with errors
    pub input_error_class: String,
}

impl Default for FormRenderOptions {
    fn default() -> Self {
        Self {
            action: None,
            group_class: "form-group".into(),
            label_class: "form-label".into(),
            input_class: "form-input".into(),
            error_class: "form-error".into(),
            help_class: "form-help".into(),
            submit_class: "form-submit".into(),
            input_error_class: "form-input-error".into(),
        }
    }
}

/// Renders forms to HTML
pub struct FormRenderer;

impl FormRenderer {
    /// Render a form to HTML string
    #[must_use]
    pub fn render(form: &FormInstance) -> String {
        Self::render_with_options(form, &FormRenderOptions::default())
    }

    /// Render a form with custom options
    #[must_use]
    pub fn render_with_options(form: &FormInstance, options: &FormRenderOptions) -> String {
        let mut html = String::with_capacity(1024);

        html.push_str("<form");
        if let Some(ref action) = options.action {
            Self::write_attr(&mut html, "action", action);
        }
        Self::write_attr(&mut html, "method", "post");
        html.push_str(">\n");

        // CSRF token
        if let Some(token) = form.csrf_token() {
            let _ = writeln!(
                html,
                r#"  <input type="hidden" name="{CSRF_FIELD}" value="{}">"#,
                Self::escape_attr(token)
            );
        }
        for error in form.errors().for_field(CSRF_FIELD) {
            let _ = writeln!(
                html,
                r#"  <span class="{}">{}</span>"#,
                Self::escape_attr(&options.error_class),
                Self::escape_html(&error.message)
            );
        }

        for field in form.class().fields() {
            html.push_str(&Self::render_field(
                field,
                form.raw(&field.name),
                form.errors(),
                options,
            ));
        }

        if let Some(text) = form.class().submit_label() {
            let _ = writeln!(
                html,
                r#"  <button type="submit" class="{}">{}</button>"#,
                Self::escape_attr(&options.submit_class),
                Self::escape_html(text)
            );
        }

        html.push_str("</form>");
        html
    }

    fn render_field(
        field: &FieldDescriptor,
        value: Option<&str>,
        errors: &ValidationErrors,
        options: &FormRenderOptions,
    ) -> String {
        let mut html = String::with_capacity(256);
        let field_errors = errors.for_field(&field.name);
        let has_errors = !field_errors.is_empty();
        let is_checkbox = field.field_type == FieldType::Boolean;

        let _ = writeln!(
            html,
            r#"  <div class="{}">"#,
            Self::escape_attr(&options.group_class)
        );

        if !is_checkbox {
            Self::write_label(&mut html, field, options);
            html.push('\n');
        }

        let input_html = match field.field_type.input_type() {
            Some(InputType::Checkbox) => Self::render_checkbox(field, value, has_errors, options),
            Some(input_type) => Self::render_input(field, input_type, value, has_errors, options),
            None => Self::render_select(field, value, has_errors, options),
        };
        html.push_str(&input_html);

        // Checkbox label comes after input
        if is_checkbox {
            html.push(' ');
            Self::write_label(&mut html, field, options);
            html.push('\n');
        }

        for error in field_errors {
            let _ = writeln!(
                html,
                r#"    <span class="{}">{}</span>"#,
                Self::escape_attr(&options.error_class),
                Self::escape_html(&error.message)
            );
        }

        if !field.description.is_empty() {
            let _ = writeln!(
                html,
                r#"    <span class="{}">{}</span>"#,
                Self::escape_attr(&options.help_class),
                Self::escape_html(&field.description)
            );
        }

        html.push_str("  </div>\n");
        html
    }

    fn write_label(html: &mut String, field: &FieldDescriptor, options: &FormRenderOptions) {
        let _ = write!(
            html,
            r#"    <label for="{}" class="{}">{}</label>"#,
            Self::escape_attr(&field.name),
            Self::escape_attr(&options.label_class),
            Self::escape_html(&field.label)
        );
    }

    fn render_input(
        field: &FieldDescriptor,
        input_type: InputType,
        value: Option<&str>,
        has_errors: bool,
        options: &FormRenderOptions,
    ) -> String {
        let mut html = String::with_capacity(128);
        html.push_str("    <input");
        Self::write_attr(&mut html, "type", input_type.as_str());
        Self::write_attr(&mut html, "name", &field.name);
        Self::write_attr(&mut html, "id", &field.name);
        Self::write_attr(&mut html, "class", &Self::input_class(has_errors, options));
        if let Some(value) = value {
            Self::write_attr(&mut html, "value", value);
        }
        if let Some(max) = field.max_length() {
            Self::write_attr(&mut html, "maxlength", &max.to_string());
        }
        if field.is_required() {
            html.push_str(" required");
        }
        html.push_str(">\n");
        html
    }

    fn render_checkbox(
        field: &FieldDescriptor,
        value: Option<&str>,
        has_errors: bool,
        options: &FormRenderOptions,
    ) -> String {
        let mut html = String::with_capacity(128);
        html.push_str("    <input");
        Self::write_attr(&mut html, "type", "checkbox");
        Self::write_attr(&mut html, "name", &field.name);
        Self::write_attr(&mut html, "id", &field.name);
        Self::write_attr(&mut html, "value", "y");
        Self::write_attr(&mut html, "class", &Self::input_class(has_errors, options));
        if !matches!(value, None | Some("" | "false")) {
            html.push_str(" checked");
        }
        if field.is_required() {
            html.push_str(" required");
        }
        html.push('>');
        html
    }

    fn render_select(
        field: &FieldDescriptor,
        value: Option<&str>,
        has_errors: bool,
        options: &FormRenderOptions,
    ) -> String {
        let mut html = String::with_capacity(256);
        html.push_str("    <select");
        Self::write_attr(&mut html, "name", &field.name);
        Self::write_attr(&mut html, "id", &field.name);
        Self::write_attr(&mut html, "class", &Self::input_class(has_errors, options));
        if field.is_required() {
            html.push_str(" required");
        }
        html.push_str(">\n");

        for choice in &field.choices {
            html.push_str("      <option");
            Self::write_attr(&mut html, "value", &choice.value);
            if value == Some(choice.value.as_str()) {
                html.push_str(" selected");
            }
            html.push('>');
            html.push_str(&Self::escape_html(&choice.label));
            html.push_str("</option>\n");
        }

        html.push_str("    </select>\n");
        html
    }

    fn input_class(has_errors: bool, options: &FormRenderOptions) -> String {
        if has_errors {
            format!("{} {}", options.input_class, options.input_error_class)
        } else {
            options.input_class.clone()
        }
    }

    fn write_attr(html: &mut String, name: &str, value: &str) {
        let _ = write!(html, r#" {name}="{}""#, Self::escape_attr(value));
    }

    /// Escape a string for use in an HTML attribute
    fn escape_attr(s: &str) -> String {
        s.replace('&', "&amp;")
            .replace('"', "&quot;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
    }

    /// Escape a string for use in HTML content
    fn escape_html(s: &str) -> String {
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
    }
}
