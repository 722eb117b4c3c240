//! In-process identity provider
//!
//! Keeps accounts in memory and records the emails it would have sent. Used
//! for local runs without a Firebase project and throughout the tests.

use super::{AuthError, AuthErrorKind, AuthResult, AuthSession, IdentityProvider};
use crate::user::{ProfileChanges, User};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentEmailKind {
    Verification,
    PasswordReset,
}

/// An email the provider would have delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub kind: SentEmailKind,
    pub to: String,
}

#[derive(Debug, Clone)]
struct Account {
    user: User,
    password_hash: String,
}

#[derive(Debug, Default)]
struct Accounts {
    // Keyed by user id
    by_id: HashMap<String, Account>,
    // Active id tokens → user id
    tokens: HashMap<String, String>,
    outbox: Vec<SentEmail>,
}

impl Accounts {
    fn id_for_email(&self, email: &str) -> Option<String> {
        self.by_id
            .values()
            .find(|a| {
                a.user
                    .email
                    .as_deref()
                    .is_some_and(|e| e.eq_ignore_ascii_case(email))
            })
            .map(|a| a.user.id.clone())
    }

    fn account_for(&mut self, session: &AuthSession) -> AuthResult<&mut Account> {
        let id = self
            .tokens
            .get(&session.id_token)
            .cloned()
            .ok_or_else(|| AuthError::from_provider_code("INVALID_ID_TOKEN"))?;
        self.by_id
            .get_mut(&id)
            .ok_or_else(|| AuthError::from_provider_code("USER_NOT_FOUND"))
    }

    fn issue(&mut self, user: User) -> AuthSession {
        let id_token = uuid::Uuid::new_v4().to_string();
        self.tokens.insert(id_token.clone(), user.id.clone());
        AuthSession {
            user,
            id_token,
            refresh_token: Some(uuid::Uuid::new_v4().to_string()),
        }
    }
}

/// Identity provider backed by a map
#[derive(Debug, Default)]
pub struct MemoryIdentity {
    accounts: RwLock<Accounts>,
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    fn hash(user_id: &str, password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(user_id.as_bytes());
        hasher.update(b":");
        hasher.update(password.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn check_email(email: &str) -> AuthResult<()> {
        let valid = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if valid {
            Ok(())
        } else {
            Err(AuthError::from_provider_code("INVALID_EMAIL"))
        }
    }

    fn check_password(password: &str) -> AuthResult<()> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::from_provider_code(
                "WEAK_PASSWORD : Password should be at least 6 characters",
            ));
        }
        Ok(())
    }

    /// Emails sent so far, oldest first
    pub async fn sent_emails(&self) -> Vec<SentEmail> {
        self.accounts.read().await.outbox.clone()
    }

    /// Mark an address as verified, as if the user followed the link
    pub async fn confirm_email(&self, email: &str) -> bool {
        let mut accounts = self.accounts.write().await;
        let Some(id) = accounts.id_for_email(email) else {
            return false;
        };
        if let Some(account) = accounts.by_id.get_mut(&id) {
            account.user.email_verified = true;
        }
        true
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        Self::check_email(email)?;
        Self::check_password(password)?;

        let mut accounts = self.accounts.write().await;
        if accounts.id_for_email(email).is_some() {
            return Err(AuthError::from_provider_code("EMAIL_EXISTS"));
        }

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: Some(email.to_string()),
            display_name: None,
            email_verified: false,
        };
        let password_hash = Self::hash(&user.id, password);
        accounts.by_id.insert(
            user.id.clone(),
            Account {
                user: user.clone(),
                password_hash,
            },
        );
        debug!(user = %user.id, "account created");
        Ok(accounts.issue(user))
    }

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .id_for_email(email)
            .and_then(|id| accounts.by_id.get(&id))
            .filter(|a| a.password_hash == Self::hash(&a.user.id, password))
            .cloned()
            .ok_or_else(|| AuthError::from_provider_code("INVALID_LOGIN_CREDENTIALS"))?;
        Ok(accounts.issue(account.user))
    }

    async fn sign_out(&self, session: &AuthSession) -> AuthResult<()> {
        self.accounts.write().await.tokens.remove(&session.id_token);
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> AuthResult<()> {
        Self::check_email(email)?;
        let mut accounts = self.accounts.write().await;
        if accounts.id_for_email(email).is_none() {
            return Err(AuthError::from_provider_code("EMAIL_NOT_FOUND"));
        }
        accounts.outbox.push(SentEmail {
            kind: SentEmailKind::PasswordReset,
            to: email.to_string(),
        });
        Ok(())
    }

    async fn send_email_verification(&self, session: &AuthSession) -> AuthResult<()> {
        let mut accounts = self.accounts.write().await;
        let email = accounts
            .account_for(session)?
            .user
            .email
            .clone()
            .ok_or_else(|| AuthError::from_provider_code("MISSING_EMAIL"))?;
        accounts.outbox.push(SentEmail {
            kind: SentEmailKind::Verification,
            to: email,
        });
        Ok(())
    }

    async fn update_profile(
        &self,
        session: &AuthSession,
        changes: &ProfileChanges,
    ) -> AuthResult<AuthSession> {
        if let Some(email) = &changes.email {
            Self::check_email(email)?;
        }

        let mut accounts = self.accounts.write().await;
        if let Some(email) = &changes.email {
            let owner = accounts.id_for_email(email);
            if owner.is_some_and(|id| id != session.user.id) {
                return Err(AuthError::from_provider_code("EMAIL_EXISTS"));
            }
        }

        let account = accounts.account_for(session)?;
        if let Some(email) = &changes.email {
            if account.user.email.as_deref() != Some(email.as_str()) {
                account.user.email = Some(email.clone());
                account.user.email_verified = false;
            }
        }
        if let Some(name) = &changes.display_name {
            account.user.display_name = Some(name.clone());
        }

        Ok(AuthSession {
            user: account.user.clone(),
            ..session.clone()
        })
    }

    async fn update_password(
        &self,
        session: &AuthSession,
        new_password: &str,
    ) -> AuthResult<AuthSession> {
        Self::check_password(new_password)?;
        let mut accounts = self.accounts.write().await;
        let account = accounts.account_for(session)?;
        account.password_hash = Self::hash(&account.user.id, new_password);
        Ok(session.clone())
    }

    async fn reload(&self, session: &AuthSession) -> AuthResult<User> {
        let mut accounts = self.accounts.write().await;
        Ok(accounts.account_for(session)?.user.clone())
    }

    fn provider_name(&self) -> &str {
        "Memory Identity"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sign_up_and_sign_in() {
        let identity = MemoryIdentity::new();
        let created = identity.sign_up("dana@example.com", "secret1").await.unwrap();
        let signed_in = identity.sign_in("DANA@example.com", "secret1").await.unwrap();
        assert_eq!(created.user.id, signed_in.user.id);
        assert_ne!(created.id_token, signed_in.id_token);
    }

    #[tokio::test]
    async fn test_sign_in_wrong_password() {
        let identity = MemoryIdentity::new();
        identity.sign_up("dana@example.com", "secret1").await.unwrap();
        let err = identity.sign_in("dana@example.com", "nope123").await.unwrap_err();
        assert_eq!(err.kind, AuthErrorKind::InvalidCredential);
        let err = identity.sign_in("nobody@example.com", "secret1").await.unwrap_err();
        assert_eq!(err.kind, AuthErrorKind::InvalidCredential);
    }

    #[tokio::test]
    async fn test_sign_up_validation() {
        let identity = MemoryIdentity::new();
        assert_eq!(
            identity.sign_up("not-an-email", "secret1").await.unwrap_err().kind,
            AuthErrorKind::InvalidEmail
        );
        assert_eq!(
            identity.sign_up("dana@example.com", "123").await.unwrap_err().kind,
            AuthErrorKind::WeakPassword
        );
        identity.sign_up("dana@example.com", "secret1").await.unwrap();
        assert_eq!(
            identity.sign_up("dana@example.com", "secret2").await.unwrap_err().kind,
            AuthErrorKind::EmailInUse
        );
    }

    #[tokio::test]
    async fn test_sign_out_invalidates_token() {
        let identity = MemoryIdentity::new();
        let session = identity.sign_up("dana@example.com", "secret1").await.unwrap();
        identity.sign_out(&session).await.unwrap();
        let err = identity.reload(&session).await.unwrap_err();
        assert_eq!(err.kind, AuthErrorKind::RequiresRecentLogin);
    }

    #[tokio::test]
    async fn test_update_profile_and_password() {
        let identity = MemoryIdentity::new();
        let session = identity.sign_up("dana@example.com", "secret1").await.unwrap();

        let session = identity
            .update_profile(&session, &ProfileChanges::display_name("Dana"))
            .await
            .unwrap();
        assert_eq!(session.user.display_name.as_deref(), Some("Dana"));

        identity.update_password(&session, "secret2").await.unwrap();
        assert!(identity.sign_in("dana@example.com", "secret1").await.is_err());
        assert!(identity.sign_in("dana@example.com", "secret2").await.is_ok());
    }

    #[tokio::test]
    async fn test_email_change_resets_verification() {
        let identity = MemoryIdentity::new();
        let session = identity.sign_up("dana@example.com", "secret1").await.unwrap();
        assert!(identity.confirm_email("dana@example.com").await);
        assert!(identity.reload(&session).await.unwrap().email_verified);

        let changes = ProfileChanges {
            email: Some("dana@example.org".into()),
            display_name: None,
        };
        let session = identity.update_profile(&session, &changes).await.unwrap();
        assert!(!session.user.email_verified);
        assert!(identity.sign_in("dana@example.org", "secret1").await.is_ok());
    }

    #[tokio::test]
    async fn test_outbox() {
        let identity = MemoryIdentity::new();
        let session = identity.sign_up("dana@example.com", "secret1").await.unwrap();
        identity.send_email_verification(&session).await.unwrap();
        identity.send_password_reset("dana@example.com").await.unwrap();
        assert_eq!(
            identity.sent_emails().await,
            vec![
                SentEmail {
                    kind: SentEmailKind::Verification,
                    to: "dana@example.com".into()
                },
                SentEmail {
                    kind: SentEmailKind::PasswordReset,
                    to: "dana@example.com".into()
                },
            ]
        );
        assert_eq!(
            identity
                .send_password_reset("nobody@example.com")
                .await
                .unwrap_err()
                .kind,
            AuthErrorKind::InvalidCredential
        );
    }

    #[test]
    fn test_provider_name() {
        assert_eq!(MemoryIdentity::new().provider_name(), "Memory Identity");
    }
}
