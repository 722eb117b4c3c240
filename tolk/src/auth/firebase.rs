//! Firebase Authentication provider
//!
//! Talks to the Identity Toolkit REST API (v1). The web API key is loaded
//! from `FIREBASE_API_KEY` by `from_env`.
//!
//! # Example
//!
//! ```ignore
//! use tolk::auth::{FirebaseAuth, IdentityProvider};
//!
//! let auth = FirebaseAuth::from_env()?;
//! let session = auth.sign_in("dana@example.com", "secret1").await?;
//! println!("{}", session.user.id);
//! ```

use super::{AuthError, AuthErrorKind, AuthResult, AuthSession, IdentityProvider};
use crate::user::{ProfileChanges, User};
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    id_token: Option<String>,
    refresh_token: Option<String>,
    #[serde(default)]
    email_verified: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    #[serde(default)]
    email_verified: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Identity Toolkit REST client
#[derive(Clone)]
pub struct FirebaseAuth {
    /// Web API key of the Firebase project
    api_key: String,
    client: reqwest::Client,
    base_url: String,
}

impl FirebaseAuth {
    pub fn new(api_key: String) -> AuthResult<Self> {
        if api_key.trim().is_empty() {
            return Err(AuthError::new(
                AuthErrorKind::Unknown,
                "Firebase API key cannot be empty",
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            api_key,
            client,
            base_url: "https://identitytoolkit.googleapis.com/v1".to_string(),
        })
    }

    /// Create from the `FIREBASE_API_KEY` environment variable
    pub fn from_env() -> AuthResult<Self> {
        let api_key = std::env::var("FIREBASE_API_KEY").map_err(|_| {
            AuthError::new(
                AuthErrorKind::Unknown,
                "FIREBASE_API_KEY environment variable not set",
            )
        })?;
        Self::new(api_key)
    }

    /// Point at another endpoint, e.g. the Auth emulator
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/accounts:{}?key={}", self.base_url, method, self.api_key)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: Value) -> AuthResult<T> {
        debug!(%method, "identity toolkit request");
        let response = self
            .client
            .post(self.endpoint(method))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let code = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("HTTP {status}"));
            return Err(AuthError::from_provider_code(&code));
        }

        response.json::<T>().await.map_err(|e| {
            AuthError::new(
                AuthErrorKind::Unknown,
                format!("invalid identity toolkit response: {e}"),
            )
        })
    }

    fn session_from(&self, response: TokenResponse, previous: Option<&AuthSession>) -> AuthResult<AuthSession> {
        let id_token = response
            .id_token
            .or_else(|| previous.map(|p| p.id_token.clone()))
            .ok_or_else(|| AuthError::new(AuthErrorKind::Unknown, "response has no idToken"))?;
        Ok(AuthSession {
            user: User {
                id: response.local_id,
                email: response.email,
                display_name: response.display_name,
                email_verified: response.email_verified,
            },
            id_token,
            refresh_token: response
                .refresh_token
                .or_else(|| previous.and_then(|p| p.refresh_token.clone())),
        })
    }
}

impl std::fmt::Debug for FirebaseAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseAuth")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl IdentityProvider for FirebaseAuth {
    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        let response: TokenResponse = self
            .call(
                "signUp",
                json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;
        self.session_from(response, None)
    }

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        let response: TokenResponse = self
            .call(
                "signInWithPassword",
                json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;
        let mut session = self.session_from(response, None)?;
        // The sign-in response does not report verification state
        session.user = self.reload(&session).await?;
        Ok(session)
    }

    async fn sign_out(&self, _session: &AuthSession) -> AuthResult<()> {
        // ID tokens are stateless; dropping the session is all there is to do.
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> AuthResult<()> {
        let _: Value = self
            .call(
                "sendOobCode",
                json!({ "requestType": "PASSWORD_RESET", "email": email }),
            )
            .await?;
        Ok(())
    }

    async fn send_email_verification(&self, session: &AuthSession) -> AuthResult<()> {
        let _: Value = self
            .call(
                "sendOobCode",
                json!({ "requestType": "VERIFY_EMAIL", "idToken": session.id_token }),
            )
            .await?;
        Ok(())
    }

    async fn update_profile(
        &self,
        session: &AuthSession,
        changes: &ProfileChanges,
    ) -> AuthResult<AuthSession> {
        let mut body = json!({ "idToken": session.id_token, "returnSecureToken": true });
        if let Some(email) = &changes.email {
            body["email"] = json!(email);
        }
        if let Some(name) = &changes.display_name {
            body["displayName"] = json!(name);
        }
        let response: TokenResponse = self.call("update", body).await?;
        self.session_from(response, Some(session))
    }

    async fn update_password(
        &self,
        session: &AuthSession,
        new_password: &str,
    ) -> AuthResult<AuthSession> {
        let response: TokenResponse = self
            .call(
                "update",
                json!({
                    "idToken": session.id_token,
                    "password": new_password,
                    "returnSecureToken": true
                }),
            )
            .await?;
        self.session_from(response, Some(session))
    }

    async fn reload(&self, session: &AuthSession) -> AuthResult<User> {
        let response: LookupResponse = self
            .call("lookup", json!({ "idToken": session.id_token }))
            .await?;
        let user = response
            .users
            .into_iter()
            .next()
            .ok_or_else(|| AuthError::from_provider_code("USER_NOT_FOUND"))?;
        Ok(User {
            id: user.local_id,
            email: user.email,
            display_name: user.display_name,
            email_verified: user.email_verified,
        })
    }

    fn provider_name(&self) -> &str {
        "Firebase Auth"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_with_empty_key() {
        assert!(FirebaseAuth::new("  ".to_string()).is_err());
    }

    #[test]
    fn test_endpoint() {
        let auth = FirebaseAuth::new("k123".to_string())
            .unwrap()
            .with_base_url("http://localhost:9099/identitytoolkit.googleapis.com/v1");
        assert_eq!(
            auth.endpoint("signUp"),
            "http://localhost:9099/identitytoolkit.googleapis.com/v1/accounts:signUp?key=k123"
        );
    }

    #[test]
    fn test_debug_masks_key() {
        let auth = FirebaseAuth::new("very-secret".to_string()).unwrap();
        let debug = format!("{auth:?}");
        assert!(debug.contains("***"));
        assert!(!debug.contains("very-secret"));
    }

    #[test]
    fn test_session_from_keeps_previous_token() {
        let auth = FirebaseAuth::new("k".to_string()).unwrap();
        let first: TokenResponse = serde_json::from_value(json!({
            "localId": "u1",
            "email": "dana@example.com",
            "idToken": "t1",
            "refreshToken": "r1"
        }))
        .unwrap();
        let session = auth.session_from(first, None).unwrap();
        assert_eq!(session.id_token, "t1");

        let update: TokenResponse = serde_json::from_value(json!({
            "localId": "u1",
            "email": "dana@example.com",
            "displayName": "Dana"
        }))
        .unwrap();
        let updated = auth.session_from(update, Some(&session)).unwrap();
        assert_eq!(updated.id_token, "t1");
        assert_eq!(updated.refresh_token.as_deref(), Some("r1"));
        assert_eq!(updated.user.display_name.as_deref(), Some("Dana"));
    }

    #[test]
    fn test_error_envelope() {
        let envelope: ErrorEnvelope = serde_json::from_str(
            r#"{"error": {"code": 400, "message": "EMAIL_EXISTS", "errors": []}}"#,
        )
        .unwrap();
        assert_eq!(
            AuthError::from_provider_code(&envelope.error.message).kind,
            AuthErrorKind::EmailInUse
        );
    }

    #[tokio::test]
    #[ignore] // Run with: cargo test --ignored
    async fn test_real_api_sign_in_rejects_unknown_user() {
        let Ok(auth) = FirebaseAuth::from_env() else {
            eprintln!("Skipping: FIREBASE_API_KEY not set");
            return;
        };
        let err = auth
            .sign_in("nobody-tolk-test@example.com", "not-a-password")
            .await
            .unwrap_err();
        assert_eq!(err.kind, AuthErrorKind::InvalidCredential);
    }
}
