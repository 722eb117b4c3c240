use super::{AuthError, AuthErrorKind, AuthSession, IdentityProvider};
use crate::error::{Error, Result};
use crate::forms::{FormErrors, FormField, FormProblem, LoginForm, PasswordChangeForm, ProfileForm, SignupForm};
use crate::store::TranslationStore;
use crate::user::{ProfileChanges, User, UserDocument};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Current-user state on top of an identity provider
///
/// Cloning is cheap and every clone shares the same state. Subscribers are
/// notified on every sign-in, sign-out and profile refresh.
#[derive(Clone)]
pub struct AuthService {
    inner: Arc<Inner>,
}

struct Inner {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn TranslationStore>,
    session: watch::Sender<Option<AuthSession>>,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("provider", &self.inner.identity.provider_name())
            .field("user", &self.current_user().map(|u| u.id))
            .finish()
    }
}

impl AuthService {
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn TranslationStore>) -> Self {
        let (session, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                identity,
                store,
                session,
            }),
        }
    }

    /// The document store user documents are written to
    pub fn store(&self) -> &Arc<dyn TranslationStore> {
        &self.inner.store
    }

    pub fn current_user(&self) -> Option<User> {
        self.inner.session.borrow().as_ref().map(|s| s.user.clone())
    }

    pub fn session(&self) -> Option<AuthSession> {
        self.inner.session.borrow().clone()
    }

    pub fn require_session(&self) -> Result<AuthSession> {
        self.session().ok_or(Error::NotSignedIn)
    }

    /// Auth-state changes; the receiver starts with the current state
    pub fn subscribe(&self) -> watch::Receiver<Option<AuthSession>> {
        self.inner.session.subscribe()
    }

    fn set_session(&self, session: Option<AuthSession>) {
        self.inner.session.send_replace(session);
    }

    /// Create an account, send the verification email and sign in
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<User> {
        let mut session = self.inner.identity.sign_up(email, password).await?;
        info!(user = %session.user.id, "account created");

        if let Err(e) = self.inner.identity.send_email_verification(&session).await {
            warn!(user = %session.user.id, error = %e, "failed to send verification email");
        }

        let document = UserDocument {
            email: Some(email.to_string()),
            display_name: display_name.map(str::to_string),
        };
        if let Some(name) = display_name {
            session = self
                .inner
                .identity
                .update_profile(&session, &ProfileChanges::display_name(name))
                .await?;
            session.user = self.inner.identity.reload(&session).await?;
        }
        self.inner.store.put_user(&session, &document).await?;

        let user = session.user.clone();
        self.set_session(Some(session));
        Ok(user)
    }

    /// Validate the signup form, then sign up
    pub async fn submit_signup(&self, form: &SignupForm) -> Result<User> {
        form.validate()?;
        self.signup(form.email.trim(), &form.password, form.display_name())
            .await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let session = self.inner.identity.sign_in(email, password).await?;
        info!(user = %session.user.id, "signed in");
        let user = session.user.clone();
        self.set_session(Some(session));
        Ok(user)
    }

    /// Validate the login form, then log in
    ///
    /// A form with missing fields never reaches the identity provider.
    pub async fn submit_login(&self, form: &LoginForm) -> Result<User> {
        form.validate()?;
        self.login(form.email.trim(), &form.password).await
    }

    pub async fn logout(&self) -> Result<()> {
        if let Some(session) = self.session() {
            if let Err(e) = self.inner.identity.sign_out(&session).await {
                warn!(user = %session.user.id, error = %e, "provider sign-out failed");
            }
            info!(user = %session.user.id, "signed out");
        }
        self.set_session(None);
        Ok(())
    }

    pub async fn reset_password(&self, email: &str) -> Result<()> {
        let email = email.trim();
        if email.is_empty() {
            return Err(FormErrors {
                problems: vec![FormProblem::Missing(FormField::Email)],
            }
            .into());
        }
        self.inner.identity.send_password_reset(email).await?;
        Ok(())
    }

    async fn reauthenticate(&self, session: &AuthSession, password: &str) -> Result<AuthSession> {
        let email = session.user.email.as_deref().ok_or_else(|| {
            AuthError::new(AuthErrorKind::RequiresRecentLogin, "account has no email")
        })?;
        debug!(user = %session.user.id, "re-authenticating");
        Ok(self.inner.identity.sign_in(email, password).await?)
    }

    /// Re-authenticate with `current_password`, then set `new_password`
    pub async fn change_password(&self, current_password: &str, new_password: &str) -> Result<()> {
        let session = self.require_session()?;
        let session = self.reauthenticate(&session, current_password).await?;
        let session = self
            .inner
            .identity
            .update_password(&session, new_password)
            .await?;
        info!(user = %session.user.id, "password changed");
        self.set_session(Some(session));
        Ok(())
    }

    pub async fn submit_password_change(&self, form: &PasswordChangeForm) -> Result<()> {
        form.validate()?;
        self.change_password(&form.current_password, &form.new_password)
            .await
    }

    /// Update email and/or display name, mirror them into the user document
    /// and refresh the cached user
    ///
    /// Changing the email re-authenticates with `password` first.
    pub async fn update_profile(
        &self,
        changes: &ProfileChanges,
        password: Option<&str>,
    ) -> Result<User> {
        let mut session = self.require_session()?;

        let applied = if changes.email.is_some() {
            let password = password
                .filter(|p| !p.trim().is_empty())
                .ok_or_else(|| FormErrors {
                    problems: vec![FormProblem::Missing(FormField::Password)],
                })?;
            session = self.reauthenticate(&session, password).await?;
            changes.clone()
        } else {
            ProfileChanges {
                email: None,
                display_name: changes.display_name.clone(),
            }
        };

        session = self
            .inner
            .identity
            .update_profile(&session, &applied)
            .await?;
        self.inner.store.put_user(&session, &applied).await?;
        session.user = self.inner.identity.reload(&session).await?;

        let user = session.user.clone();
        self.set_session(Some(session));
        Ok(user)
    }

    pub async fn submit_profile(&self, form: &ProfileForm) -> Result<User> {
        let changes = form.changes()?;
        self.update_profile(&changes, form.password.as_deref()).await
    }

    pub async fn send_email_verification(&self) -> Result<()> {
        let session = self.require_session()?;
        self.inner.identity.send_email_verification(&session).await?;
        Ok(())
    }

    /// Refresh the cached user from the provider
    pub async fn reload(&self) -> Result<User> {
        let mut session = self.require_session()?;
        session.user = self.inner.identity.reload(&session).await?;
        let user = session.user.clone();
        self.set_session(Some(session));
        Ok(user)
    }
}
