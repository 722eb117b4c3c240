//! Core of the tolk translator
//!
//! Domain types, the identity-provider and document-store wrappers, message
//! catalogs, form validation and headless UI state. Machine translation and
//! the translator session live in `tolk-mt`.

pub mod auth;
pub mod error;
pub mod forms;
pub mod language;
pub mod locale;
pub mod prefs;
pub mod record;
pub mod store;
pub mod ui;
pub mod user;

// Re-export main types for convenient access
pub use auth::{AuthError, AuthErrorKind, AuthService, AuthSession, IdentityProvider};
pub use error::{Error, Result};
pub use forms::{FormErrors, FormField, FormProblem, LoginForm, PasswordChangeForm, ProfileForm, SignupForm};
pub use language::{LANGUAGES, Language};
pub use locale::{Catalog, LocaleError, LocalizedMessages};
pub use prefs::{Preferences, Theme};
pub use record::{NewTranslation, TranslationRecord};
pub use store::{Collection, Library, StoreError, TranslationStore};
pub use ui::{Clipboard, CopyFeedback, PanelItem, PanelView, SidePanel, Tooltip, TooltipSize};
pub use user::{ProfileChanges, User, UserDocument};
