//! Localization settings shared by every entity.

use serde::{Deserialize, Serialize};

/// Configured locales. When present, localized fields store one value per
/// locale under `<field>.<locale>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizationConfig {
    /// Locale codes, e.g. `["en", "es"]`.
    pub locales: Vec<String>,
    /// Locale used when a request does not name one.
    pub default_locale: String,
}

impl LocalizationConfig {
    /// Create a localization config. The first locale is the default.
    pub fn new(locales: &[&str]) -> Self {
        Self {
            locales: locales.iter().map(|l| l.to_string()).collect(),
            default_locale: locales.first().map(|l| l.to_string()).unwrap_or_default(),
        }
    }

    /// Override the default locale.
    pub fn with_default(mut self, locale: impl Into<String>) -> Self {
        self.default_locale = locale.into();
        self
    }

    /// Check whether a locale code is configured.
    pub fn contains(&self, locale: &str) -> bool {
        self.locales.iter().any(|l| l == locale)
    }
}
