//! Per-user document storage for translation history and saved translations
//!
//! `TranslationStore` is the seam to the document database. Every call is
//! scoped by an `AuthSession`: records live under the session user's
//! `history` and `saved` collections and the session token authorizes the
//! request.

mod firestore;
mod library;
mod memory;

pub use firestore::Firestore;
pub use library::Library;
pub use memory::MemoryStore;

use crate::auth::AuthSession;
use crate::record::TranslationRecord;
use crate::user::UserDocument;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Errors raised by document stores
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("network error: {0}")]
    Network(String),
    #[error("backend returned {status}: {message}")]
    Backend { status: u16, message: String },
    #[error("malformed document: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Network(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// The per-user collections a record can live in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    History,
    Saved,
}

impl Collection {
    /// Collection name under the user document
    pub fn path(self) -> &'static str {
        match self {
            Collection::History => "history",
            Collection::Saved => "saved",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

impl std::str::FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "history" => Ok(Collection::History),
            "saved" => Ok(Collection::Saved),
            other => Err(format!("unknown collection '{other}'")),
        }
    }
}

/// Document database holding users and their translation records
#[async_trait]
pub trait TranslationStore: Send + Sync {
    /// Create or replace the record with `record.id`
    async fn put(
        &self,
        session: &AuthSession,
        collection: Collection,
        record: &TranslationRecord,
    ) -> StoreResult<()>;

    /// All records of the collection, most recent first
    async fn list(
        &self,
        session: &AuthSession,
        collection: Collection,
    ) -> StoreResult<Vec<TranslationRecord>>;

    /// Remove a record; removing a missing record is not an error
    async fn delete(&self, session: &AuthSession, collection: Collection, id: &str)
    -> StoreResult<()>;

    /// Merge the given fields into the user document
    async fn put_user(&self, session: &AuthSession, document: &UserDocument) -> StoreResult<()>;

    /// Name used in logs
    fn backend_name(&self) -> &str;
}
