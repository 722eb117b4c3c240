//! Identity provider abstraction
//!
//! The `IdentityProvider` trait is the seam between the application and the
//! hosted identity service. `AuthService` wraps a provider, keeps the current
//! user cached, and broadcasts auth-state changes.
//!
//! # Example
//!
//! ```ignore
//! use tolk::auth::{AuthService, MemoryIdentity};
//! use tolk::store::MemoryStore;
//! use std::sync::Arc;
//!
//! let auth = AuthService::new(Arc::new(MemoryIdentity::new()), Arc::new(MemoryStore::new()));
//! auth.signup("dana@example.com", "secret1", Some("Dana")).await?;
//! assert!(auth.current_user().is_some());
//! ```

mod firebase;
mod memory;
mod service;

pub use firebase::FirebaseAuth;
pub use memory::{MemoryIdentity, SentEmail, SentEmailKind};
pub use service::AuthService;

use crate::user::{ProfileChanges, User};
use async_trait::async_trait;

/// Classified identity-provider failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    InvalidCredential,
    EmailInUse,
    WeakPassword,
    InvalidEmail,
    UserNotFound,
    UserDisabled,
    TooManyRequests,
    RequiresRecentLogin,
    Network,
    Unknown,
}

impl AuthErrorKind {
    /// Map a provider error code such as `EMAIL_EXISTS` or
    /// `WEAK_PASSWORD : Password should be at least 6 characters`
    pub fn from_provider_code(code: &str) -> Self {
        let code = code
            .split([' ', ':'])
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();
        match code.as_str() {
            "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
                AuthErrorKind::InvalidCredential
            }
            "EMAIL_EXISTS" => AuthErrorKind::EmailInUse,
            "WEAK_PASSWORD" => AuthErrorKind::WeakPassword,
            "INVALID_EMAIL" | "MISSING_EMAIL" => AuthErrorKind::InvalidEmail,
            "USER_NOT_FOUND" => AuthErrorKind::UserNotFound,
            "USER_DISABLED" => AuthErrorKind::UserDisabled,
            "TOO_MANY_ATTEMPTS_TRY_LATER" => AuthErrorKind::TooManyRequests,
            "CREDENTIAL_TOO_OLD_LOGIN_AGAIN" | "TOKEN_EXPIRED" | "INVALID_ID_TOKEN" => {
                AuthErrorKind::RequiresRecentLogin
            }
            _ => AuthErrorKind::Unknown,
        }
    }

    /// Catalog key of the message shown to the user
    pub fn message_key(self) -> &'static str {
        match self {
            AuthErrorKind::InvalidCredential => "tolk-auth-invalid-credential",
            AuthErrorKind::EmailInUse => "tolk-auth-email-in-use",
            AuthErrorKind::WeakPassword => "tolk-auth-weak-password",
            AuthErrorKind::InvalidEmail => "tolk-auth-invalid-email",
            AuthErrorKind::UserNotFound => "tolk-auth-user-not-found",
            AuthErrorKind::UserDisabled => "tolk-auth-user-disabled",
            AuthErrorKind::TooManyRequests => "tolk-auth-too-many-requests",
            AuthErrorKind::RequiresRecentLogin => "tolk-auth-requires-recent-login",
            AuthErrorKind::Network => "tolk-auth-network",
            AuthErrorKind::Unknown => "tolk-auth-unknown",
        }
    }
}

/// Error returned by identity providers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct AuthError {
    pub kind: AuthErrorKind,
    pub message: String,
}

impl AuthError {
    pub fn new(kind: AuthErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Build from a provider error code, keeping the code as message
    pub fn from_provider_code(code: &str) -> Self {
        Self::new(AuthErrorKind::from_provider_code(code), code)
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::new(AuthErrorKind::Network, err.to_string())
    }
}

/// Result type for identity-provider calls
pub type AuthResult<T> = Result<T, AuthError>;

/// A signed-in user together with the tokens that authorize further calls
#[derive(Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub user: User,
    /// Bearer token for the identity provider and the document store
    pub id_token: String,
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("user", &self.user)
            .field("id_token", &"***")
            .finish()
    }
}

/// Hosted identity service
///
/// Implementations talk to a real service (`FirebaseAuth`) or keep accounts
/// in memory (`MemoryIdentity`).
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an email/password account and sign it in
    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<AuthSession>;

    /// Sign in with email and password
    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession>;

    /// Invalidate the session
    async fn sign_out(&self, session: &AuthSession) -> AuthResult<()>;

    /// Send a password reset email
    async fn send_password_reset(&self, email: &str) -> AuthResult<()>;

    /// Send an email-address verification email to the session's user
    async fn send_email_verification(&self, session: &AuthSession) -> AuthResult<()>;

    /// Change email and/or display name
    ///
    /// Returns the session to use from now on; providers may rotate tokens.
    async fn update_profile(
        &self,
        session: &AuthSession,
        changes: &ProfileChanges,
    ) -> AuthResult<AuthSession>;

    /// Replace the password of the session's user
    async fn update_password(
        &self,
        session: &AuthSession,
        new_password: &str,
    ) -> AuthResult<AuthSession>;

    /// Fetch the current state of the session's user
    async fn reload(&self, session: &AuthSession) -> AuthResult<User>;

    /// Name used in logs
    fn provider_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AuthErrorKind::from_provider_code("INVALID_LOGIN_CREDENTIALS"),
            AuthErrorKind::InvalidCredential
        );
        assert_eq!(
            AuthErrorKind::from_provider_code("EMAIL_NOT_FOUND"),
            AuthErrorKind::InvalidCredential
        );
        assert_eq!(
            AuthErrorKind::from_provider_code("EMAIL_EXISTS"),
            AuthErrorKind::EmailInUse
        );
        assert_eq!(
            AuthErrorKind::from_provider_code(
                "WEAK_PASSWORD : Password should be at least 6 characters"
            ),
            AuthErrorKind::WeakPassword
        );
        assert_eq!(
            AuthErrorKind::from_provider_code(
                "TOO_MANY_ATTEMPTS_TRY_LATER : Access to this account has been temporarily disabled"
            ),
            AuthErrorKind::TooManyRequests
        );
        assert_eq!(
            AuthErrorKind::from_provider_code("CREDENTIAL_TOO_OLD_LOGIN_AGAIN"),
            AuthErrorKind::RequiresRecentLogin
        );
        assert_eq!(
            AuthErrorKind::from_provider_code("SOMETHING_NEW"),
            AuthErrorKind::Unknown
        );
        assert_eq!(AuthErrorKind::from_provider_code(""), AuthErrorKind::Unknown);
    }

    #[test]
    fn test_every_kind_has_a_message() {
        let catalog = crate::locale::Catalog::builtin();
        for kind in [
            AuthErrorKind::InvalidCredential,
            AuthErrorKind::EmailInUse,
            AuthErrorKind::WeakPassword,
            AuthErrorKind::InvalidEmail,
            AuthErrorKind::UserNotFound,
            AuthErrorKind::UserDisabled,
            AuthErrorKind::TooManyRequests,
            AuthErrorKind::RequiresRecentLogin,
            AuthErrorKind::Network,
            AuthErrorKind::Unknown,
        ] {
            let message = catalog.localize("en", kind.message_key(), &[]);
            assert_ne!(message, kind.message_key());
        }
    }

    #[test]
    fn test_session_debug_masks_token() {
        let session = AuthSession {
            user: User {
                id: "u1".into(),
                email: None,
                display_name: None,
                email_verified: false,
            },
            id_token: "secret-token".into(),
            refresh_token: None,
        };
        let debug = format!("{session:?}");
        assert!(debug.contains("***"));
        assert!(!debug.contains("secret-token"));
    }
}
