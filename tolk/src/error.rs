//! Error types shared by the core providers

use crate::auth::AuthError;
use crate::forms::FormErrors;
use crate::locale::{Catalog, LocaleError};
use crate::store::StoreError;

/// Errors surfaced by the auth, store and localization layers
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A submitted form is missing fields or is inconsistent
    #[error(transparent)]
    Validation(#[from] FormErrors),
    /// The identity provider rejected the request
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// The document store failed
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The operation needs a signed-in user
    #[error("not signed in")]
    NotSignedIn,
    /// A message catalog could not be loaded
    #[error(transparent)]
    Locale(#[from] LocaleError),
    /// Missing or invalid configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// User-facing messages for this error, rendered from `catalog`.
    ///
    /// Validation errors yield one message per problem, everything else a
    /// single message.
    pub fn user_messages(&self, catalog: &Catalog, locale: &str) -> Vec<String> {
        match self {
            Error::Validation(errors) => errors.messages(catalog, locale),
            Error::Auth(err) => vec![catalog.localize(locale, err.kind.message_key(), &[])],
            Error::NotSignedIn => vec![catalog.localize(locale, "tolk-error-not-signed-in", &[])],
            Error::Store(err) => vec![catalog.localize(
                locale,
                "tolk-error-storage",
                &[&err.to_string()],
            )],
            Error::Locale(_) | Error::Config(_) => {
                vec![catalog.localize(locale, "tolk-error-unknown", &[])]
            }
        }
    }
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;
