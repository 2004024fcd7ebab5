use std::collections::BTreeMap;

use crate::forms::validators::Validator;
use crate::forms::widget::{StyledWidget, Widget};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Password,
    Email,
    TextArea,
    Hidden,
    Checkbox,
    /// `(value, label)` pairs.
    Select(Vec<(String, String)>),
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldData {
    #[default]
    Empty,
    Text(String),
    File(UploadedFile),
}

impl FieldData {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Empty, or text that is only whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(text) => text.trim().is_empty(),
            Self::File(_) => false,
        }
    }
}

pub struct Field {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub data: FieldData,
    pub errors: Vec<String>,
    pub description: Option<String>,
    pub widget: Option<StyledWidget>,
    pub(crate) validators: Vec<Box<dyn Validator>>,
}

impl Field {
    /// The label defaults to the name with underscores turned into spaces
    /// and the first letter capitalized.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        let label = default_label(&name);
        Self {
            name,
            label,
            kind,
            data: FieldData::Empty,
            errors: Vec::new(),
            description: None,
            widget: None,
            validators: Vec::new(),
        }
    }

    #[must_use]
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    #[must_use]
    pub fn password(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Password)
    }

    #[must_use]
    pub fn file(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::File)
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    #[must_use]
    pub fn widget(mut self, widget: StyledWidget) -> Self {
        self.widget = Some(widget);
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.data = FieldData::Text(value.into());
        self
    }

    #[must_use]
    pub const fn is_file(&self) -> bool {
        matches!(self.kind, FieldKind::File)
    }

    #[must_use]
    pub const fn is_hidden(&self) -> bool {
        matches!(self.kind, FieldKind::Hidden)
    }

    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.data.as_text()
    }

    /// Renders the input element under its bound (prefixed) `name`.
    #[must_use]
    pub fn render_widget(&self, name: &str, attrs: &BTreeMap<String, String>) -> String {
        match &self.widget {
            Some(styled) => styled.render(self, name, attrs),
            None => Widget::for_kind(&self.kind).render(self, name, attrs),
        }
    }
}

impl std::fmt::Debug for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("data", &self.data)
            .field("errors", &self.errors)
            .field("validators", &self.validators.len())
            .finish_non_exhaustive()
    }
}

fn default_label(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let mut chars = spaced.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
