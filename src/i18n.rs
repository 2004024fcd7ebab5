//! Message translation.
//!
//! A [`Localizer`] is whatever the host application uses to look up
//! messages for the current request. [`Translator`] adapts it to the
//! `gettext`/`ngettext` pair that validators and flash messages call.

use anyhow::{Context, Result};
use regex::{Captures, Regex};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};

pub trait Localizer: Send + Sync {
    fn translate(&self, message: &str) -> String;

    fn pluralize(&self, singular: &str, plural: &str, n: u64) -> String;
}

/// Returns messages unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityLocalizer;

impl Localizer for IdentityLocalizer {
    fn translate(&self, message: &str) -> String {
        message.to_string()
    }

    fn pluralize(&self, singular: &str, plural: &str, n: u64) -> String {
        if n == 1 { singular } else { plural }.to_string()
    }
}

/// Localizer backed by a TOML catalog:
///
/// ```toml
/// [messages]
/// "This field is required." = "Ce champ est obligatoire."
///
/// [plurals."${n} user"]
/// one = "${n} utilisateur"
/// other = "${n} utilisateurs"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogLocalizer {
    #[serde(default)]
    messages: HashMap<String, String>,
    #[serde(default)]
    plurals: HashMap<String, PluralForms>,
}

#[derive(Debug, Clone, Deserialize)]
struct PluralForms {
    one: String,
    other: String,
}

impl CatalogLocalizer {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse message catalog")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read message catalog: {}", path.display()))?;
        Self::from_toml_str(&content)
    }
}

impl Localizer for CatalogLocalizer {
    fn translate(&self, message: &str) -> String {
        self.messages
            .get(message)
            .cloned()
            .unwrap_or_else(|| message.to_string())
    }

    fn pluralize(&self, singular: &str, plural: &str, n: u64) -> String {
        match self.plurals.get(singular) {
            Some(forms) if n == 1 => forms.one.clone(),
            Some(forms) => forms.other.clone(),
            None => IdentityLocalizer.pluralize(singular, plural, n),
        }
    }
}

/// `gettext`-style facade over a [`Localizer`].
#[derive(Clone)]
pub struct Translator {
    localizer: Arc<dyn Localizer>,
}

impl Translator {
    #[must_use]
    pub fn new(localizer: Arc<dyn Localizer>) -> Self {
        Self { localizer }
    }

    #[must_use]
    pub fn gettext(&self, message: &str) -> String {
        self.localizer.translate(message)
    }

    #[must_use]
    pub fn ngettext(&self, singular: &str, plural: &str, n: u64) -> String {
        self.localizer.pluralize(singular, plural, n)
    }
}

impl Default for Translator {
    fn default() -> Self {
        Self::new(Arc::new(IdentityLocalizer))
    }
}

impl std::fmt::Debug for Translator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Translator").finish_non_exhaustive()
    }
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{(\w+)\}").expect("Invalid regex"))
}

/// Replaces `${name}` placeholders in one pass, so substituted values are
/// never expanded again. Unknown placeholders are left as is.
#[must_use]
pub fn interpolate(template: &str, values: &[(&str, &str)]) -> String {
    placeholder_regex()
        .replace_all(template, |caps: &Captures<'_>| {
            values
                .iter()
                .find(|(name, _)| *name == &caps[1])
                .map_or_else(|| caps[0].to_string(), |(_, value)| (*value).to_string())
        })
        .into_owned()
}
