use tolk::Catalog;

/// Error types for machine translation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MtError {
    /// The provider refused the request because a quota was exhausted
    #[error("Rate limited: {0}")]
    RateLimited(String),
    /// The provider failed or returned something unusable
    #[error("Translation error: {0}")]
    TranslationError(String),
    /// Missing API key, bad model name and similar
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// The request never got a response
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Invalid language: {0}")]
    InvalidLanguage(String),
}

impl MtError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, MtError::RateLimited(_))
    }

    /// Message shown to the user
    ///
    /// Rate limits get their own message; every other failure is reported
    /// as a failed translation with the error text.
    pub fn user_message(&self, catalog: &Catalog, locale: &str) -> String {
        match self {
            MtError::RateLimited(_) => catalog.localize(locale, "tolk-error-rate-limit", &[]),
            other => catalog.localize(locale, "tolk-error-translation", &[&other.to_string()]),
        }
    }
}

impl From<reqwest::Error> for MtError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            MtError::NetworkError(err.to_string())
        } else {
            MtError::TranslationError(err.to_string())
        }
    }
}

/// Result type for MT operations
pub type MtResult<T> = Result<T, MtError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_message_differs() {
        let catalog = Catalog::builtin();
        let rate_limited = MtError::RateLimited("quota".into()).user_message(&catalog, "en");
        let failed = MtError::TranslationError("boom".into()).user_message(&catalog, "en");
        assert_eq!(rate_limited, "Rate limit reached, please try again later.");
        assert_eq!(failed, "Translation failed: Translation error: boom");
        assert_ne!(rate_limited, failed);
    }

    #[test]
    fn test_is_rate_limit() {
        assert!(MtError::RateLimited(String::new()).is_rate_limit());
        assert!(!MtError::NetworkError(String::new()).is_rate_limit());
    }
}
