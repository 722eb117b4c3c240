//! Translation records as stored in history and saved collections

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A completed translation, owned by the document store
///
/// Records are immutable once created. A saved entry is a copy of a history
/// entry and keeps its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRecord {
    pub id: String,
    pub source_text: String,
    pub translated_text: String,
    /// Source language name (older records may carry a code)
    pub source_language: String,
    /// Target language name (older records may carry a code)
    pub target_language: String,
    pub created_at: DateTime<Utc>,
}

impl TranslationRecord {
    /// "Hebrew → English" style label used as side panel subtitle
    pub fn language_pair(&self) -> String {
        format!("{} → {}", self.source_language, self.target_language)
    }
}

/// A translation that has not been persisted yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTranslation {
    pub source_text: String,
    pub translated_text: String,
    pub source_language: String,
    pub target_language: String,
}

impl NewTranslation {
    /// Assign an id and creation timestamp
    pub fn into_record(self) -> TranslationRecord {
        TranslationRecord {
            id: uuid::Uuid::new_v4().to_string(),
            source_text: self.source_text,
            translated_text: self.translated_text,
            source_language: self.source_language,
            target_language: self.target_language,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NewTranslation {
        NewTranslation {
            source_text: "שלום".to_string(),
            translated_text: "Hello".to_string(),
            source_language: "Hebrew".to_string(),
            target_language: "English".to_string(),
        }
    }

    #[test]
    fn test_into_record_assigns_unique_ids() {
        let a = sample().into_record();
        let b = sample().into_record();
        assert_ne!(a.id, b.id);
        assert_eq!(a.source_text, "שלום");
        assert_eq!(a.translated_text, "Hello");
    }

    #[test]
    fn test_serializes_camel_case() {
        let record = sample().into_record();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["sourceText"], "שלום");
        assert_eq!(json["targetLanguage"], "English");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("source_text").is_none());
    }

    #[test]
    fn test_language_pair() {
        assert_eq!(sample().into_record().language_pair(), "Hebrew → English");
    }
}
