//! UI message catalogs
//!
//! Messages are looked up by key with a fallback chain of requested locale,
//! its base language (`pt-br` → `pt`), the default locale, and finally the key
//! itself. `$1`, `$2`... placeholders are replaced positionally.

mod loader;

pub use loader::{load_all_messages_from_dir, load_messages_from_file, parse_messages};

use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\d+)").expect("placeholder pattern is valid"));

const BUILTIN: &[(&str, &str)] = &[
    ("en", include_str!("messages/en.json")),
    ("he", include_str!("messages/he.json")),
];

/// Errors raised while loading catalogs
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocaleError {
    #[error("failed to read '{path}': {message}")]
    Io { path: String, message: String },
    #[error("failed to parse catalog '{origin}': {message}")]
    Parse { origin: String, message: String },
}

/// Messages of a single locale, keyed by message key
#[derive(Debug, Clone, Default)]
pub struct LocalizedMessages(pub HashMap<String, String>);

impl LocalizedMessages {
    pub fn new() -> Self {
        LocalizedMessages(HashMap::new())
    }
    pub fn with_message(&mut self, key: &str, message: &str) -> &mut Self {
        self.0.insert(key.to_owned(), message.to_owned());
        self
    }
    pub fn get_message(&self, key: &str) -> Option<&String> {
        self.0.get(key)
    }
    pub fn get(&self, key: &str) -> String {
        self.0.get(key).cloned().unwrap_or_else(|| key.to_string())
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    /// Overlay `other` onto these messages
    pub fn merge(&mut self, other: LocalizedMessages) {
        self.0.extend(other.0);
    }
}

/// All loaded catalogs plus the default locale
#[derive(Debug, Clone)]
pub struct Catalog {
    // Keyed by locale and then by message key
    // e.g. messages["en"]["tolk-copy"] = "Copy"
    //      messages["he"]["tolk-copy"] = "העתקה"
    messages: HashMap<String, LocalizedMessages>,
    default_locale: String,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    /// An empty catalog with `en` as default locale
    pub fn new() -> Self {
        Catalog {
            messages: HashMap::new(),
            default_locale: "en".to_string(),
        }
    }

    /// The catalogs compiled into the crate
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for (locale, content) in BUILTIN {
            // Built-in catalogs are covered by tests, a parse failure is a build defect.
            let messages = parse_messages(content, &format!("builtin:{locale}"))
                .unwrap_or_default();
            catalog.with_messages_for_locale(locale, messages);
        }
        catalog
    }

    /// Built-in catalogs overlaid with the `*.json` files in `dir`
    pub fn builtin_with_dir(dir: &Path) -> Result<Self, LocaleError> {
        let mut catalog = Self::builtin();
        for (locale, messages) in load_all_messages_from_dir(dir)? {
            debug!(%locale, count = messages.len(), "loaded catalog override");
            catalog
                .messages
                .entry(locale)
                .or_insert_with(LocalizedMessages::new)
                .merge(messages);
        }
        Ok(catalog)
    }

    pub fn with_locale(&mut self, locale: &str) -> &mut Self {
        self.default_locale = locale.to_lowercase();
        self
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    pub fn with_messages_for_locale(
        &mut self,
        locale: &str,
        messages: LocalizedMessages,
    ) -> &mut Self {
        self.messages.insert(locale.to_lowercase(), messages);
        self
    }

    /// Locales with at least one message, sorted
    pub fn locales(&self) -> Vec<&str> {
        let mut locales: Vec<&str> = self.messages.keys().map(String::as_str).collect();
        locales.sort_unstable();
        locales
    }

    pub fn has_locale(&self, locale: &str) -> bool {
        self.messages.contains_key(&locale.to_lowercase())
    }

    fn fallback_chain(&self, locale: &str) -> Vec<String> {
        let locale = locale.to_lowercase();
        let mut chain = vec![locale.clone()];
        if let Some((base, _)) = locale.split_once('-') {
            chain.push(base.to_string());
        }
        if !chain.contains(&self.default_locale) {
            chain.push(self.default_locale.clone());
        }
        chain
    }

    /// Raw message text for `key`, following the fallback chain
    pub fn get_message(&self, locale: &str, key: &str) -> String {
        for candidate in self.fallback_chain(locale) {
            if let Some(message) = self
                .messages
                .get(&candidate)
                .and_then(|messages| messages.get_message(key))
            {
                return message.clone();
            }
        }
        debug!(%locale, %key, "no message in any fallback locale");
        key.to_string()
    }

    /// Message text with `$n` placeholders replaced by `values[n - 1]`
    ///
    /// Placeholders without a matching value are left as they are.
    pub fn localize(&self, locale: &str, key: &str, values: &[&str]) -> String {
        let message = self.get_message(locale, key);
        PLACEHOLDER
            .replace_all(&message, |caps: &regex::Captures<'_>| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| values.get(i))
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    /// Every message visible from `locale`, with fallbacks already applied
    ///
    /// This is what a client needs to render the whole interface.
    pub fn resolved_messages(&self, locale: &str) -> BTreeMap<String, String> {
        let mut resolved = BTreeMap::new();
        for candidate in self.fallback_chain(locale).iter().rev() {
            if let Some(messages) = self.messages.get(candidate) {
                resolved.extend(messages.0.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        resolved
    }
}
