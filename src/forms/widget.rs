//! HTML input widgets.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::forms::field::{Field, FieldKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Widget {
    TextInput,
    /// Never echoes the submitted value back.
    PasswordInput,
    EmailInput,
    TextArea,
    HiddenInput,
    CheckboxInput,
    Select,
    FileInput,
}

impl Widget {
    #[must_use]
    pub const fn for_kind(kind: &FieldKind) -> Self {
        match kind {
            FieldKind::Text => Self::TextInput,
            FieldKind::Password => Self::PasswordInput,
            FieldKind::Email => Self::EmailInput,
            FieldKind::TextArea => Self::TextArea,
            FieldKind::Hidden => Self::HiddenInput,
            FieldKind::Checkbox => Self::CheckboxInput,
            FieldKind::Select(_) => Self::Select,
            FieldKind::File => Self::FileInput,
        }
    }

    #[must_use]
    pub fn render(self, field: &Field, name: &str, attrs: &BTreeMap<String, String>) -> String {
        let value = field.value().unwrap_or_default();

        match self {
            Self::TextInput => input("text", name, Some(value), attrs),
            Self::PasswordInput => input("password", name, None, attrs),
            Self::EmailInput => input("email", name, Some(value), attrs),
            Self::HiddenInput => input("hidden", name, Some(value), attrs),
            Self::FileInput => input("file", name, None, attrs),
            Self::CheckboxInput => {
                let mut attrs = attrs.clone();
                if is_checked(value) {
                    attrs.insert("checked".to_string(), "checked".to_string());
                }
                input("checkbox", name, Some("y"), &attrs)
            }
            Self::TextArea => format!(
                "<textarea id=\"{id}\" name=\"{id}\"{attrs}>{text}</textarea>",
                id = encode_double_quoted_attribute(name),
                attrs = render_attrs(attrs),
                text = encode_text(value),
            ),
            Self::Select => {
                let choices = match &field.kind {
                    FieldKind::Select(choices) => choices.as_slice(),
                    _ => &[],
                };
                let mut html = format!(
                    "<select id=\"{id}\" name=\"{id}\"{attrs}>",
                    id = encode_double_quoted_attribute(name),
                    attrs = render_attrs(attrs),
                );
                for (choice, label) in choices {
                    let selected = if choice == value { " selected" } else { "" };
                    let _ = write!(
                        html,
                        "<option value=\"{}\"{selected}>{}</option>",
                        encode_double_quoted_attribute(choice),
                        encode_text(label),
                    );
                }
                html.push_str("</select>");
                html
            }
        }
    }
}

fn is_checked(value: &str) -> bool {
    matches!(value, "y" | "on" | "true" | "1")
}

fn input(kind: &str, name: &str, value: Option<&str>, attrs: &BTreeMap<String, String>) -> String {
    let value = value
        .filter(|v| !v.is_empty())
        .map(|v| format!(" value=\"{}\"", encode_double_quoted_attribute(v)))
        .unwrap_or_default();

    format!(
        "<input type=\"{kind}\" id=\"{id}\" name=\"{id}\"{value}{attrs}>",
        id = encode_double_quoted_attribute(name),
        attrs = render_attrs(attrs),
    )
}

/// ` key="value"` pairs in key order. `class_` is written as `class`.
fn render_attrs(attrs: &BTreeMap<String, String>) -> String {
    attrs.iter().fold(String::new(), |mut out, (key, value)| {
        let key = key.strip_suffix('_').unwrap_or(key);
        let _ = write!(
            out,
            " {}=\"{}\"",
            encode_double_quoted_attribute(key),
            encode_double_quoted_attribute(value)
        );
        out
    })
}

/// A widget with preset HTML attributes, e.g. a CSS class for one field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyledWidget {
    pub widget: Option<Widget>,
    pub attrs: BTreeMap<String, String>,
}

impl StyledWidget {
    #[must_use]
    pub const fn new(widget: Option<Widget>) -> Self {
        Self {
            widget,
            attrs: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// Call-time `attrs` win over the preset ones.
    #[must_use]
    pub fn render(&self, field: &Field, name: &str, attrs: &BTreeMap<String, String>) -> String {
        let widget = self.widget.unwrap_or_else(|| Widget::for_kind(&field.kind));
        let mut merged = self.attrs.clone();
        merged.extend(attrs.iter().map(|(k, v)| (k.clone(), v.clone())));
        widget.render(field, name, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn password_input_hides_value() {
        let field = Field::password("password").default_value("hunter22");
        let html = field.render_widget("password", &BTreeMap::new());
        assert_eq!(html, r#"<input type="password" id="password" name="password">"#);
    }

    #[test]
    fn text_input_escapes_value() {
        let field = Field::text("login").default_value(r#""><script>"#);
        let html = field.render_widget("login", &BTreeMap::new());
        assert!(html.contains("&quot;"), "{html}");
        assert!(html.contains("&lt;script"), "{html}");
        assert!(!html.contains("<script>"), "{html}");
    }

    #[test]
    fn styled_widget_call_attrs_override() {
        let styled = StyledWidget::new(None)
            .attr("class_", "wide")
            .attr("size", "40");
        let field = Field::text("login").widget(styled);

        let html = field.render_widget("login", &attrs(&[("size", "10")]));
        assert_eq!(
            html,
            r#"<input type="text" id="login" name="login" class="wide" size="10">"#
        );
    }

    #[test]
    fn styled_widget_explicit_widget_wins_over_kind() {
        let styled = StyledWidget::new(Some(Widget::TextArea));
        let field = Field::text("bio").default_value("a < b").widget(styled);
        assert_eq!(
            field.render_widget("bio", &BTreeMap::new()),
            r#"<textarea id="bio" name="bio">a &lt; b</textarea>"#
        );
    }

    #[test]
    fn select_marks_current_choice() {
        let field = Field::new(
            "status",
            FieldKind::Select(vec![
                ("Y".to_string(), "Active".to_string()),
                ("N".to_string(), "Inactive".to_string()),
            ]),
        )
        .default_value("N");

        let html = field.render_widget("status", &BTreeMap::new());
        assert!(html.contains(r#"<option value="N" selected>Inactive</option>"#));
        assert!(html.contains(r#"<option value="Y">Active</option>"#));
    }
}
