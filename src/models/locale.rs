//! Supported interface languages and trilingual text triplets.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Fr,
    Ar,
    En,
}

impl Locale {
    /// Parse a language tag such as `ar`, `en-US` or `fr_FR`; unknown tags yield `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let primary = tag
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match primary.as_str() {
            "fr" => Some(Locale::Fr),
            "ar" => Some(Locale::Ar),
            "en" => Some(Locale::En),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::Fr => "fr",
            Locale::Ar => "ar",
            Locale::En => "en",
        }
    }
}

/// The same text in every supported language.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalizedText {
    pub fr: String,
    pub ar: String,
    pub en: String,
}

impl LocalizedText {
    pub fn new(fr: impl Into<String>, ar: impl Into<String>, en: impl Into<String>) -> Self {
        Self {
            fr: fr.into(),
            ar: ar.into(),
            en: en.into(),
        }
    }

    pub fn get(&self, locale: Locale) -> &str {
        match locale {
            Locale::Fr => &self.fr,
            Locale::Ar => &self.ar,
            Locale::En => &self.en,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_tag_accepts_region_suffixes() {
        assert_eq!(Locale::from_tag("en-US"), Some(Locale::En));
        assert_eq!(Locale::from_tag("fr_FR"), Some(Locale::Fr));
        assert_eq!(Locale::from_tag("AR"), Some(Locale::Ar));
        assert_eq!(Locale::from_tag("de"), None);
        assert_eq!(Locale::from_tag(""), None);
    }

    #[test]
    fn localized_text_lookup() {
        let text = LocalizedText::new("Bonjour", "مرحبا", "Hello");
        assert_eq!(text.get(Locale::Fr), "Bonjour");
        assert_eq!(text.get(Locale::Ar), "مرحبا");
        assert_eq!(text.get(Locale::En), "Hello");
    }

    #[test]
    fn default_locale_is_french() {
        assert_eq!(Locale::default(), Locale::Fr);
    }
}
