//! Static language reference data
//!
//! The language table is fixed and shared by every user. Lookups accept the
//! ISO 639-1 code or the English name, case-insensitively, because stored
//! translation records have carried both over time.

use serde::Serialize;

/// A language offered in the source and target selectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Language {
    /// ISO 639-1 code, e.g. "en"
    pub code: &'static str,
    /// English display name, also used when prompting the translation model
    pub name: &'static str,
}

impl Language {
    const fn new(code: &'static str, name: &'static str) -> Self {
        Self { code, name }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

/// All selectable languages. The first entry is the default target and the
/// second the default source.
pub const LANGUAGES: &[Language] = &[
    Language::new("en", "English"),
    Language::new("he", "Hebrew"),
    Language::new("ar", "Arabic"),
    Language::new("es", "Spanish"),
    Language::new("fr", "French"),
    Language::new("de", "German"),
    Language::new("it", "Italian"),
    Language::new("pt", "Portuguese"),
    Language::new("nl", "Dutch"),
    Language::new("pl", "Polish"),
    Language::new("ru", "Russian"),
    Language::new("uk", "Ukrainian"),
    Language::new("tr", "Turkish"),
    Language::new("hi", "Hindi"),
    Language::new("zh", "Chinese"),
    Language::new("ja", "Japanese"),
    Language::new("ko", "Korean"),
];

/// Find a language by code or name
pub fn find(query: &str) -> Option<Language> {
    let query = query.trim();
    LANGUAGES
        .iter()
        .find(|lang| lang.code.eq_ignore_ascii_case(query) || lang.name.eq_ignore_ascii_case(query))
        .copied()
}

/// Language preselected as the translation source
pub fn default_source() -> Language {
    LANGUAGES[1]
}

/// Language preselected as the translation target
pub fn default_target() -> Language {
    LANGUAGES[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_by_code_and_name() {
        assert_eq!(find("he").map(|l| l.name), Some("Hebrew"));
        assert_eq!(find("Hebrew").map(|l| l.code), Some("he"));
        assert_eq!(find("  FRENCH ").map(|l| l.code), Some("fr"));
        assert_eq!(find("EN").map(|l| l.name), Some("English"));
    }

    #[test]
    fn test_find_unknown() {
        assert!(find("klingon").is_none());
        assert!(find("").is_none());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(default_target().code, "en");
        assert_eq!(default_source().code, "he");
        assert_ne!(default_source(), default_target());
    }

    #[test]
    fn test_codes_are_unique() {
        let mut codes: Vec<_> = LANGUAGES.iter().map(|l| l.code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), LANGUAGES.len());
    }
}
