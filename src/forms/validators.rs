//! Field validators.
//!
//! A validator either lets the field through, records an error and lets
//! the chain continue ([`ValidationError::Invalid`]), or stops the chain
//! ([`ValidationError::Stop`]): earlier errors on the field are dropped and
//! only the stop message is kept.

use regex::Regex;
use std::sync::OnceLock;

use crate::forms::field::{Field, FieldData};
use crate::i18n::{Translator, interpolate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Invalid(String),
    Stop(String),
}

/// Read access to the sibling fields of the form being validated.
#[derive(Clone, Copy)]
pub struct FormView<'a> {
    fields: &'a [Field],
}

impl<'a> FormView<'a> {
    #[must_use]
    pub const fn new(fields: &'a [Field]) -> Self {
        Self { fields }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&'a Field> {
        self.fields.iter().find(|field| field.name == name)
    }
}

pub trait Validator: Send + Sync {
    fn validate(
        &self,
        field: &Field,
        form: &FormView<'_>,
        tr: &Translator,
    ) -> Result<(), ValidationError>;
}

const REQUIRED_MESSAGE: &str = "This field is required.";

/// Field must hold non-blank data.
#[derive(Debug, Clone, Default)]
pub struct Required {
    pub message: Option<String>,
}

impl Required {
    #[must_use]
    pub const fn new() -> Self {
        Self { message: None }
    }
}

impl Validator for Required {
    fn validate(
        &self,
        field: &Field,
        _form: &FormView<'_>,
        tr: &Translator,
    ) -> Result<(), ValidationError> {
        if field.data.is_blank() {
            let message = self
                .message
                .clone()
                .unwrap_or_else(|| tr.gettext(REQUIRED_MESSAGE));
            return Err(ValidationError::Stop(message));
        }
        Ok(())
    }
}

/// Upload fields are never "blank" text, so [`Required`] cannot be used
/// for them: this checks that an actual file was submitted.
#[derive(Debug, Clone, Default)]
pub struct FileRequired {
    pub message: Option<String>,
}

impl FileRequired {
    #[must_use]
    pub const fn new() -> Self {
        Self { message: None }
    }
}

impl Validator for FileRequired {
    fn validate(
        &self,
        field: &Field,
        _form: &FormView<'_>,
        tr: &Translator,
    ) -> Result<(), ValidationError> {
        match &field.data {
            FieldData::File(file) if !file.filename.is_empty() => Ok(()),
            _ => Err(ValidationError::Stop(
                self.message
                    .clone()
                    .unwrap_or_else(|| tr.gettext(REQUIRED_MESSAGE)),
            )),
        }
    }
}

/// Character count bounds. Blank data passes; combine with [`Required`].
#[derive(Debug, Clone, Default)]
pub struct Length {
    pub min: Option<usize>,
    pub max: Option<usize>,
    pub message: Option<String>,
}

impl Length {
    #[must_use]
    pub const fn between(min: usize, max: usize) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            message: None,
        }
    }

    #[must_use]
    pub const fn at_least(min: usize) -> Self {
        Self {
            min: Some(min),
            max: None,
            message: None,
        }
    }

    #[must_use]
    pub const fn at_most(max: usize) -> Self {
        Self {
            min: None,
            max: Some(max),
            message: None,
        }
    }
}

impl Validator for Length {
    fn validate(
        &self,
        field: &Field,
        _form: &FormView<'_>,
        tr: &Translator,
    ) -> Result<(), ValidationError> {
        let Some(text) = field.data.as_text() else {
            return Ok(());
        };
        let len = text.chars().count();

        let too_short = self.min.is_some_and(|min| len < min);
        let too_long = self.max.is_some_and(|max| len > max);
        if !too_short && !too_long {
            return Ok(());
        }

        if let Some(message) = &self.message {
            return Err(ValidationError::Invalid(message.clone()));
        }

        let min = self.min.map(|m| m.to_string()).unwrap_or_default();
        let max = self.max.map(|m| m.to_string()).unwrap_or_default();
        let template = match (self.min, self.max) {
            (Some(_), Some(_)) => "Field must be between ${min} and ${max} characters long.",
            (Some(_), None) => "Field must be at least ${min} characters long.",
            _ => "Field cannot be longer than ${max} characters.",
        };

        Err(ValidationError::Invalid(interpolate(
            &tr.gettext(template),
            &[("min", min.as_str()), ("max", max.as_str())],
        )))
    }
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").expect("Invalid regex"))
}

#[derive(Debug, Clone, Default)]
pub struct Email {
    pub message: Option<String>,
}

impl Validator for Email {
    fn validate(
        &self,
        field: &Field,
        _form: &FormView<'_>,
        tr: &Translator,
    ) -> Result<(), ValidationError> {
        let text = field.data.as_text().unwrap_or_default();
        if email_regex().is_match(text.trim()) {
            return Ok(());
        }

        Err(ValidationError::Invalid(
            self.message
                .clone()
                .unwrap_or_else(|| tr.gettext("Invalid email address.")),
        ))
    }
}

/// Field must match another field, e.g. password confirmation.
#[derive(Debug, Clone)]
pub struct EqualTo {
    pub other: String,
    pub message: Option<String>,
}

impl EqualTo {
    #[must_use]
    pub fn field(other: impl Into<String>) -> Self {
        Self {
            other: other.into(),
            message: None,
        }
    }
}

impl Validator for EqualTo {
    fn validate(
        &self,
        field: &Field,
        form: &FormView<'_>,
        tr: &Translator,
    ) -> Result<(), ValidationError> {
        let Some(other) = form.get(&self.other) else {
            return Err(ValidationError::Invalid(interpolate(
                &tr.gettext("Invalid field name '${name}'."),
                &[("name", self.other.as_str())],
            )));
        };

        if other.data == field.data {
            return Ok(());
        }

        Err(ValidationError::Invalid(self.message.clone().unwrap_or_else(
            || {
                interpolate(
                    &tr.gettext("Field must be equal to ${other}."),
                    &[("other", self.other.as_str())],
                )
            },
        )))
    }
}

#[derive(Debug, Clone)]
pub struct Regexp {
    pub pattern: Regex,
    pub message: Option<String>,
}

impl Regexp {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            message: None,
        })
    }
}

impl Validator for Regexp {
    fn validate(
        &self,
        field: &Field,
        _form: &FormView<'_>,
        tr: &Translator,
    ) -> Result<(), ValidationError> {
        let text = field.data.as_text().unwrap_or_default();
        if self.pattern.is_match(text) {
            return Ok(());
        }

        Err(ValidationError::Invalid(
            self.message
                .clone()
                .unwrap_or_else(|| tr.gettext("Invalid input.")),
        ))
    }
}

/// Runs the validator chain of `fields[index]` and returns its errors.
pub(crate) fn run_chain(fields: &[Field], index: usize, tr: &Translator) -> Vec<String> {
    let field = &fields[index];
    let view = FormView::new(fields);
    let mut errors = Vec::new();

    for validator in &field.validators {
        match validator.validate(field, &view, tr) {
            Ok(()) => {}
            Err(ValidationError::Invalid(message)) => errors.push(message),
            Err(ValidationError::Stop(message)) => {
                errors.clear();
                errors.push(message);
                break;
            }
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::field::UploadedFile;

    fn check(field: &Field) -> Vec<String> {
        run_chain(std::slice::from_ref(field), 0, &Translator::default())
    }

    #[test]
    fn required_stops_the_chain() {
        let field = Field::text("name")
            .validator(Length::at_least(3))
            .validator(Required::new())
            .validator(Length::at_most(1));

        assert_eq!(check(&field), vec!["This field is required."]);
    }

    #[test]
    fn invalid_errors_accumulate() {
        let field = Field::text("email")
            .default_value("ab")
            .validator(Length::at_least(3))
            .validator(Email::default());

        assert_eq!(
            check(&field),
            vec![
                "Field must be at least 3 characters long.",
                "Invalid email address."
            ]
        );
    }

    #[test]
    fn length_between_message() {
        let field = Field::text("code")
            .default_value("toolong")
            .validator(Length::between(2, 4));
        assert_eq!(
            check(&field),
            vec!["Field must be between 2 and 4 characters long."]
        );
    }

    #[test]
    fn email_accepts_plain_addresses() {
        let field = Field::text("email")
            .default_value("email@address.com")
            .validator(Email::default());
        assert!(check(&field).is_empty());
    }

    #[test]
    fn file_required_rejects_text_and_empty() {
        let text = Field::file("upload")
            .default_value("not-a-file")
            .validator(FileRequired::new());
        assert_eq!(check(&text), vec!["This field is required."]);

        let mut uploaded = Field::file("upload").validator(FileRequired::new());
        uploaded.data = FieldData::File(UploadedFile {
            filename: "avatar.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: vec![1, 2, 3],
        });
        assert!(check(&uploaded).is_empty());
    }

    #[test]
    fn equal_to_compares_sibling() {
        let fields = vec![
            Field::password("password").default_value("secret-pw"),
            Field::password("confirm")
                .default_value("other-pw")
                .validator(EqualTo::field("password")),
        ];
        assert_eq!(
            run_chain(&fields, 1, &Translator::default()),
            vec!["Field must be equal to password."]
        );
    }

    #[test]
    fn regexp_with_custom_message() {
        let mut validator = Regexp::new(r"^[a-z]+$").unwrap();
        validator.message = Some("Lowercase only".to_string());
        let field = Field::text("slug").default_value("ABC").validator(validator);
        assert_eq!(check(&field), vec!["Lowercase only"]);
    }
}
