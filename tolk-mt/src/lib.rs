//! Machine translation for tolk
//!
//! This crate holds the translation providers and the translator session
//! that turns keystrokes into debounced translation requests.
//!
//! # Workflow Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tolk::{AuthService, Catalog, Library};
//! use tolk::auth::MemoryIdentity;
//! use tolk::store::MemoryStore;
//! use tolk_mt::{GeminiProvider, TranslatorSession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // 1. Wire the library to an identity provider and a store
//!     let store = Arc::new(MemoryStore::new());
//!     let auth = AuthService::new(Arc::new(MemoryIdentity::new()), store.clone());
//!     let library = Library::new(store, auth);
//!
//!     // 2. Start a session backed by Gemini
//!     let provider = GeminiProvider::from_env()?;
//!     let session = TranslatorSession::spawn(Arc::new(provider), library, Arc::new(Catalog::builtin()));
//!
//!     // 3. Type, then wait for the view to update
//!     session.input("שלום עולם")?;
//!     let mut view = session.subscribe();
//!     view.wait_for(|v| v.translated.is_some()).await?;
//!     println!("{:?}", session.view().translated);
//!     Ok(())
//! }
//! ```

pub mod debounce;
pub mod error;
pub mod gemini;
pub mod mock;
pub mod session;
pub mod translator;


// Re-export main types for convenient access
pub use debounce::Debouncer;
pub use error::{MtError, MtResult};
pub use gemini::GeminiProvider;
pub use mock::{MockMode, MockRequest, MockTranslator};
pub use session::{
    Command, DEBOUNCE_INTERVAL, ErrorKind, MAX_INPUT_CHARS, SessionClosed, SessionConfig,
    TranslatorSession, TranslatorView, ViewError,
};
pub use translator::{MachineTranslator, validate_language};
