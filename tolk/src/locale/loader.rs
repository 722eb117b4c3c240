use super::{LocaleError, LocalizedMessages};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Parse a message catalog from JSON text
///
/// The JSON must be an object of the following shape:
/// ```json
/// {
///     "@metadata": { ... },  // Ignored
///     "message-key": "message text",
///     "another-key": "another message"
/// }
/// ```
///
/// `origin` names the source in error messages (a path or "builtin:en").
pub fn parse_messages(content: &str, origin: &str) -> Result<LocalizedMessages, LocaleError> {
    let json: Value = serde_json::from_str(content).map_err(|e| LocaleError::Parse {
        origin: origin.to_string(),
        message: e.to_string(),
    })?;

    let obj = json.as_object().ok_or_else(|| LocaleError::Parse {
        origin: origin.to_string(),
        message: "root must be an object".to_string(),
    })?;

    let mut messages = LocalizedMessages::new();
    for (key, value) in obj {
        if key.starts_with('@') {
            continue;
        }

        if let Some(message) = value.as_str() {
            messages.with_message(key, message);
        } else {
            warn!(%origin, %key, "message is not a string, skipping");
        }
    }

    Ok(messages)
}

/// Load messages from a single JSON file
pub fn load_messages_from_file(path: &Path) -> Result<LocalizedMessages, LocaleError> {
    let content = fs::read_to_string(path).map_err(|e| LocaleError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    parse_messages(&content, &path.display().to_string())
}

/// Load all messages from a directory of JSON files
///
/// The file stem is the locale code: `en.json` → `"en"`, `pt-br.json` →
/// `"pt-br"`. Files without a `.json` extension are skipped.
pub fn load_all_messages_from_dir(
    dir: &Path,
) -> Result<HashMap<String, LocalizedMessages>, LocaleError> {
    if !dir.is_dir() {
        return Err(LocaleError::Io {
            path: dir.display().to_string(),
            message: "not a directory".to_string(),
        });
    }

    let entries = fs::read_dir(dir).map_err(|e| LocaleError::Io {
        path: dir.display().to_string(),
        message: e.to_string(),
    })?;

    let mut all_messages = HashMap::new();
    for entry in entries {
        let path = entry
            .map_err(|e| LocaleError::Io {
                path: dir.display().to_string(),
                message: e.to_string(),
            })?
            .path();

        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }

        let Some(locale) = path.file_stem().and_then(|stem| stem.to_str()) else {
            warn!(path = %path.display(), "invalid catalog filename, skipping");
            continue;
        };
        let locale = locale.to_lowercase();

        let messages = load_messages_from_file(&path)?;
        all_messages.insert(locale, messages);
    }

    if all_messages.is_empty() {
        warn!(dir = %dir.display(), "no JSON catalogs found");
    }

    Ok(all_messages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_metadata_and_non_strings() {
        let messages = parse_messages(
            r#"{"@metadata": {"authors": []}, "a": "A", "n": 3, "b": "B $1"}"#,
            "test",
        )
        .unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages.get_message("b").map(String::as_str), Some("B $1"));
        assert!(messages.get_message("@metadata").is_none());
        assert!(messages.get_message("n").is_none());
    }

    #[test]
    fn test_parse_rejects_non_object() {
        let err = parse_messages("[1, 2]", "list.json").unwrap_err();
        assert!(err.to_string().contains("list.json"));
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        assert!(matches!(
            parse_messages("{not json", "bad"),
            Err(LocaleError::Parse { .. })
        ));
    }

    #[test]
    fn test_load_dir() {
        let dir = std::env::temp_dir().join(format!("tolk-locales-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("de.json"), r#"{"tolk-copy": "Kopieren"}"#).unwrap();
        fs::write(dir.join("README.txt"), "ignored").unwrap();

        let all = load_all_messages_from_dir(&dir).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all["de"].get("tolk-copy"), "Kopieren");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_missing_dir() {
        let result = load_all_messages_from_dir(Path::new("/nonexistent/tolk/locales"));
        assert!(matches!(result, Err(LocaleError::Io { .. })));
    }
}
