//! Form glue: bound fields, validation chains and HTML rendering.
//!
//! An [`ExtendedForm`] owns its fields, binds submitted data to them under
//! an optional prefix, runs each field's validators and then an optional
//! whole-form `clean` hook, and renders itself through tera: the built-in
//! table form or a template file. Templates see `form.fields`,
//! `form.errors`, `form.enctype`, `action`, `submit_text` and `args`.

pub mod field;
pub mod validators;
pub mod widget;

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tera::{Context, Tera};
use thiserror::Error;

use crate::config::AuthConfig;
use crate::i18n::Translator;
use crate::request::RequestContext;

pub use field::{Field, FieldData, FieldKind, UploadedFile};
pub use validators::{
    Email, EqualTo, FileRequired, FormView, Length, Regexp, Required, ValidationError, Validator,
};
pub use widget::{StyledWidget, Widget};

/// Key of the errors produced by the `clean` hook.
pub const WHOLE_FORM: &str = "whole_form";

const MULTIPART: &str = "multipart/form-data";
const URLENCODED: &str = "application/x-www-form-urlencoded";

// Names end in `.html` so tera autoescapes values.
const TABLE_FORM_NAME: &str = "table_form.html";
const CUSTOM_FORM_NAME: &str = "form.html";

const TABLE_FORM: &str = r#"<form action="{{ action }}" method="post" enctype="{{ form.enctype | safe }}">
{% for field in form.fields %}{% if field.hidden %}{{ field.widget | safe }}
{% endif %}{% endfor %}<table>
{% if form.errors %}<tr><td colspan="2"><ul class="errors">{% for error in form.errors %}<li>{{ error }}</li>{% endfor %}</ul></td></tr>
{% endif %}{% for field in form.fields %}{% if not field.hidden %}<tr><th><label for="{{ field.name }}">{{ field.label }}</label></th><td>{{ field.widget | safe }}{% if field.description %}<br><small>{{ field.description }}</small>{% endif %}{% if field.errors %}<ul class="errors">{% for error in field.errors %}<li>{{ error }}</li>{% endfor %}</ul>{% endif %}</td></tr>
{% endif %}{% endfor %}<tr><td></td><td><input type="submit" value="{{ submit_text }}"></td></tr>
</table>
</form>"#;

fn table_form() -> &'static Tera {
    static TERA: OnceLock<Tera> = OnceLock::new();
    TERA.get_or_init(|| {
        let mut tera = Tera::default();
        tera.add_raw_template(TABLE_FORM_NAME, TABLE_FORM)
            .expect("Invalid form template");
        tera
    })
}

#[derive(Debug, Error)]
pub enum FormError {
    #[error("Failed to load form template {path}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: tera::Error,
    },

    #[error("Failed to render form: {0}")]
    Render(#[from] tera::Error),
}

/// What a template sees as `form`.
#[derive(Debug, Serialize)]
struct FormContext {
    enctype: &'static str,
    fields: Vec<FieldContext>,
    errors: Vec<String>,
}

#[derive(Debug, Serialize)]
struct FieldContext {
    name: String,
    label: String,
    /// Pre-rendered input element; print it with `| safe`.
    widget: String,
    description: Option<String>,
    errors: Vec<String>,
    hidden: bool,
}

/// Submitted request data, keyed by the bound (prefixed) field name.
#[derive(Debug, Clone, Default)]
pub struct FormData {
    pub values: BTreeMap<String, String>,
    pub files: BTreeMap<String, UploadedFile>,
}

impl FormData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn file(mut self, name: impl Into<String>, file: UploadedFile) -> Self {
        self.files.insert(name.into(), file);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.files.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub action: String,
    /// Defaults to the translated "Submit".
    pub submit_text: Option<String>,
    /// Overrides the configured template.
    pub template: Option<PathBuf>,
    /// Extra values, available to templates as `args`.
    pub args: BTreeMap<String, String>,
}

impl RenderOptions {
    #[must_use]
    pub fn action(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn submit_text(mut self, text: impl Into<String>) -> Self {
        self.submit_text = Some(text.into());
        self
    }

    #[must_use]
    pub fn template(mut self, path: impl Into<PathBuf>) -> Self {
        self.template = Some(path.into());
        self
    }

    #[must_use]
    pub fn arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }
}

type CleanHook = Box<dyn Fn(&ExtendedForm) -> Vec<String> + Send + Sync>;

pub struct ExtendedForm {
    prefix: String,
    fields: Vec<Field>,
    ctx: RequestContext,
    clean: Option<CleanHook>,
    form_errors: Vec<String>,
    template: Option<PathBuf>,
}

impl ExtendedForm {
    #[must_use]
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            prefix: String::new(),
            fields,
            ctx: RequestContext::detached(),
            clean: None,
            form_errors: Vec::new(),
            template: None,
        }
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Messages are translated with the context's localizer.
    #[must_use]
    pub fn with_context(mut self, ctx: RequestContext) -> Self {
        self.ctx = ctx;
        self
    }

    /// Whole-form check, run only when every field validated. Returned
    /// messages become the form's errors under [`WHOLE_FORM`].
    #[must_use]
    pub fn with_clean<F>(mut self, clean: F) -> Self
    where
        F: Fn(&Self) -> Vec<String> + Send + Sync + 'static,
    {
        self.clean = Some(Box::new(clean));
        self
    }

    #[must_use]
    pub fn with_config(mut self, auth: &AuthConfig) -> Self {
        self.template.clone_from(&auth.form_template);
        self
    }

    /// Sets a field's data directly, like a keyword default.
    #[must_use]
    pub fn with_data(mut self, name: &str, value: impl Into<String>) -> Self {
        if let Some(field) = self.field_mut(name) {
            field.data = FieldData::Text(value.into());
        }
        self
    }

    /// True when any field is an upload field.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.fields.iter().any(Field::is_file)
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|field| field.name == name)
    }

    #[must_use]
    pub fn translator(&self) -> Translator {
        self.ctx.translator()
    }

    /// Name a field is submitted under. A prefix that does not already end
    /// in a separator gets a `-` appended.
    #[must_use]
    pub fn bound_name(&self, field: &Field) -> String {
        if self.prefix.is_empty() {
            return field.name.clone();
        }
        if self.prefix.ends_with(['-', '_', ';', ':', '/', '.']) {
            format!("{}{}", self.prefix, field.name)
        } else {
            format!("{}-{}", self.prefix, field.name)
        }
    }

    /// Binds submitted data. An empty submission changes nothing. Otherwise
    /// every field missing from it is emptied, so defaults and object data
    /// only survive a form that was not posted.
    pub fn process(&mut self, formdata: &FormData) {
        if formdata.is_empty() {
            return;
        }

        let names: Vec<String> = self.fields.iter().map(|f| self.bound_name(f)).collect();
        for (field, name) in self.fields.iter_mut().zip(names) {
            if field.is_file() {
                if let Some(file) = formdata.files.get(&name) {
                    field.data = FieldData::File(file.clone());
                    continue;
                }
            }

            field.data = formdata
                .values
                .get(&name)
                .map_or(FieldData::Empty, |value| FieldData::Text(value.clone()));
        }
    }

    /// Fills fields from the same-named keys of a JSON object.
    pub fn process_obj(&mut self, obj: &serde_json::Value) {
        let Some(map) = obj.as_object() else {
            return;
        };

        for field in &mut self.fields {
            let value = match map.get(&field.name) {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(serde_json::Value::Bool(true)) => "y".to_string(),
                Some(serde_json::Value::Number(n)) => n.to_string(),
                _ => continue,
            };
            field.data = FieldData::Text(value);
        }
    }

    /// Runs every field's validators, then the `clean` hook if they all
    /// passed. Previous errors are discarded.
    pub fn validate(&mut self) -> bool {
        let tr = self.translator();
        self.form_errors.clear();

        let mut valid = true;
        for index in 0..self.fields.len() {
            let errors = validators::run_chain(&self.fields, index, &tr);
            valid &= errors.is_empty();
            self.fields[index].errors = errors;
        }

        if !valid {
            return false;
        }

        let errors = match &self.clean {
            Some(clean) => clean(&*self),
            None => Vec::new(),
        };
        if errors.is_empty() {
            return true;
        }

        self.form_errors = errors;
        false
    }

    /// Field name to messages. Whole-form errors are under [`WHOLE_FORM`].
    #[must_use]
    pub fn errors(&self) -> BTreeMap<String, Vec<String>> {
        let mut errors: BTreeMap<String, Vec<String>> = self
            .fields
            .iter()
            .filter(|field| !field.errors.is_empty())
            .map(|field| (field.name.clone(), field.errors.clone()))
            .collect();

        if !self.form_errors.is_empty() {
            errors.insert(WHOLE_FORM.to_string(), self.form_errors.clone());
        }

        errors
    }

    /// Text values by (unprefixed) field name.
    #[must_use]
    pub fn data(&self) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .filter_map(|field| field.value().map(|v| (field.name.clone(), v.to_string())))
            .collect()
    }

    /// Renders the form. The template is taken from `options`, then from
    /// the config, and falls back to the built-in table form.
    pub fn render(&self, options: &RenderOptions) -> Result<String, FormError> {
        let context = self.template_context(options);

        match options.template.as_deref().or(self.template.as_deref()) {
            Some(path) => render_file(path, &context),
            None => Ok(table_form().render(TABLE_FORM_NAME, &context)?),
        }
    }

    fn enctype(&self) -> &'static str {
        if self.is_multipart() {
            MULTIPART
        } else {
            URLENCODED
        }
    }

    fn template_context(&self, options: &RenderOptions) -> Context {
        let submit_text = options
            .submit_text
            .clone()
            .unwrap_or_else(|| self.translator().gettext("Submit"));

        let fields = self
            .fields
            .iter()
            .map(|field| {
                let name = self.bound_name(field);
                FieldContext {
                    widget: field.render_widget(&name, &BTreeMap::new()),
                    name,
                    label: field.label.clone(),
                    description: field.description.clone(),
                    errors: field.errors.clone(),
                    hidden: field.is_hidden(),
                }
            })
            .collect();

        let form = FormContext {
            enctype: self.enctype(),
            fields,
            errors: self.form_errors.clone(),
        };

        let mut context = Context::new();
        context.insert("form", &form);
        context.insert("action", &options.action);
        context.insert("submit_text", &submit_text);
        context.insert("args", &options.args);
        context
    }
}

fn render_file(path: &Path, context: &Context) -> Result<String, FormError> {
    let mut tera = Tera::default();
    tera.add_template_file(path, Some(CUSTOM_FORM_NAME))
        .map_err(|source| FormError::Template {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(tera.render(CUSTOM_FORM_NAME, context)?)
}

impl std::fmt::Debug for ExtendedForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtendedForm")
            .field("prefix", &self.prefix)
            .field("fields", &self.fields)
            .field("form_errors", &self.form_errors)
            .field("template", &self.template)
            .finish_non_exhaustive()
    }
}
