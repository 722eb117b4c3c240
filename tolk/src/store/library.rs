use super::{Collection, TranslationStore};
use crate::auth::{AuthService, AuthSession};
use crate::error::{Error, Result};
use crate::record::{NewTranslation, TranslationRecord};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Default)]
struct Shelves {
    // User the cached lists belong to
    owner: Option<String>,
    history: Vec<TranslationRecord>,
    saved: Vec<TranslationRecord>,
}

impl Shelves {
    fn list_mut(&mut self, collection: Collection) -> &mut Vec<TranslationRecord> {
        match collection {
            Collection::History => &mut self.history,
            Collection::Saved => &mut self.saved,
        }
    }

    /// Reset the cache when it belongs to someone else
    fn claim(&mut self, user_id: &str) {
        if self.owner.as_deref() != Some(user_id) {
            *self = Shelves {
                owner: Some(user_id.to_string()),
                ..Shelves::default()
            };
        }
    }
}

/// History and saved translations of the signed-in user
///
/// Keeps a cache of both collections, newest first. The cache only answers
/// for the user it was filled for; after sign-out it reads as empty.
#[derive(Clone)]
pub struct Library {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn TranslationStore>,
    auth: AuthService,
    shelves: RwLock<Shelves>,
}

impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("backend", &self.inner.store.backend_name())
            .field("auth", &self.inner.auth)
            .finish()
    }
}

impl Library {
    pub fn new(store: Arc<dyn TranslationStore>, auth: AuthService) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                auth,
                shelves: RwLock::new(Shelves::default()),
            }),
        }
    }

    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    async fn session(&self) -> Result<AuthSession> {
        match self.inner.auth.session() {
            Some(session) => Ok(session),
            None => {
                self.clear().await;
                Err(Error::NotSignedIn)
            }
        }
    }

    async fn cached(&self, collection: Collection) -> Vec<TranslationRecord> {
        let Some(user) = self.inner.auth.current_user() else {
            return Vec::new();
        };
        let mut shelves = self.inner.shelves.write().await;
        shelves.claim(&user.id);
        shelves.list_mut(collection).clone()
    }

    /// Drop everything cached
    pub async fn clear(&self) {
        *self.inner.shelves.write().await = Shelves::default();
    }

    /// Reload both collections from the store
    pub async fn refresh(&self) -> Result<()> {
        let session = self.session().await?;
        let history = self.inner.store.list(&session, Collection::History).await?;
        let saved = self.inner.store.list(&session, Collection::Saved).await?;
        debug!(
            user = %session.user.id,
            history = history.len(),
            saved = saved.len(),
            "library refreshed"
        );
        *self.inner.shelves.write().await = Shelves {
            owner: Some(session.user.id),
            history,
            saved,
        };
        Ok(())
    }

    /// Cached history, newest first
    pub async fn history(&self) -> Vec<TranslationRecord> {
        self.cached(Collection::History).await
    }

    /// Cached saved translations, newest first
    pub async fn saved(&self) -> Vec<TranslationRecord> {
        self.cached(Collection::Saved).await
    }

    /// Cached records of either collection
    pub async fn list(&self, collection: Collection) -> Vec<TranslationRecord> {
        self.cached(collection).await
    }

    /// Look a record up in history, then in saved
    pub async fn find(&self, id: &str) -> Option<TranslationRecord> {
        let shelves = self.inner.shelves.read().await;
        let user = self.inner.auth.current_user()?;
        if shelves.owner.as_deref() != Some(user.id.as_str()) {
            return None;
        }
        shelves
            .history
            .iter()
            .chain(shelves.saved.iter())
            .find(|r| r.id == id)
            .cloned()
    }

    /// Append a finished translation to the history
    pub async fn record_translation(&self, translation: NewTranslation) -> Result<TranslationRecord> {
        let session = self.session().await?;
        let record = translation.into_record();
        self.inner
            .store
            .put(&session, Collection::History, &record)
            .await?;

        let mut shelves = self.inner.shelves.write().await;
        shelves.claim(&session.user.id);
        shelves.history.insert(0, record.clone());
        debug!(user = %session.user.id, id = %record.id, "translation recorded");
        Ok(record)
    }

    pub async fn remove_from_history(&self, id: &str) -> Result<()> {
        self.remove(Collection::History, id).await
    }

    /// Add a record to the saved collection
    ///
    /// Saving an already saved record leaves a single copy.
    pub async fn save(&self, record: &TranslationRecord) -> Result<()> {
        let session = self.session().await?;
        self.inner
            .store
            .put(&session, Collection::Saved, record)
            .await?;

        let mut shelves = self.inner.shelves.write().await;
        shelves.claim(&session.user.id);
        shelves.saved.retain(|r| r.id != record.id);
        let at = shelves
            .saved
            .iter()
            .position(|r| r.created_at < record.created_at)
            .unwrap_or(shelves.saved.len());
        shelves.saved.insert(at, record.clone());
        info!(user = %session.user.id, id = %record.id, "translation saved");
        Ok(())
    }

    pub async fn unsave(&self, id: &str) -> Result<()> {
        self.remove(Collection::Saved, id).await
    }

    pub async fn is_saved(&self, id: &str) -> bool {
        self.saved().await.iter().any(|r| r.id == id)
    }

    async fn remove(&self, collection: Collection, id: &str) -> Result<()> {
        let session = self.session().await?;
        self.inner.store.delete(&session, collection, id).await?;

        let mut shelves = self.inner.shelves.write().await;
        shelves.claim(&session.user.id);
        shelves.list_mut(collection).retain(|r| r.id != id);
        debug!(user = %session.user.id, %collection, %id, "record removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryIdentity;
    use crate::store::MemoryStore;

    async fn signed_in() -> Library {
        let store = Arc::new(MemoryStore::new());
        let auth = AuthService::new(Arc::new(MemoryIdentity::new()), store.clone());
        auth.signup("dana@example.com", "secret1", None).await.unwrap();
        Library::new(store, auth)
    }

    fn translation(text: &str) -> NewTranslation {
        NewTranslation {
            source_text: text.to_string(),
            translated_text: format!("{text} (en)"),
            source_language: "Hebrew".to_string(),
            target_language: "English".to_string(),
        }
    }

    // ========== History Tests ==========

    #[tokio::test]
    async fn test_history_newest_first() {
        let library = signed_in().await;
        let first = library.record_translation(translation("אחת")).await.unwrap();
        let second = library.record_translation(translation("שתיים")).await.unwrap();

        assert_eq!(library.history().await, vec![second.clone(), first.clone()]);

        // A fresh load from the store agrees with the cache
        library.clear().await;
        library.refresh().await.unwrap();
        assert_eq!(library.history().await, vec![second, first]);
    }

    #[tokio::test]
    async fn test_remove_from_history() {
        let library = signed_in().await;
        let record = library.record_translation(translation("שלום")).await.unwrap();
        library.remove_from_history(&record.id).await.unwrap();
        assert!(library.history().await.is_empty());
        library.refresh().await.unwrap();
        assert!(library.history().await.is_empty());
    }

    // ========== Saved Tests ==========

    #[tokio::test]
    async fn test_save_is_idempotent() {
        let library = signed_in().await;
        let record = library.record_translation(translation("שלום")).await.unwrap();

        library.save(&record).await.unwrap();
        library.save(&record).await.unwrap();
        assert_eq!(library.saved().await, vec![record.clone()]);
        assert!(library.is_saved(&record.id).await);

        library.refresh().await.unwrap();
        assert_eq!(library.saved().await.len(), 1);
    }

    #[tokio::test]
    async fn test_save_then_unsave_leaves_absent() {
        let library = signed_in().await;
        let record = library.record_translation(translation("שלום")).await.unwrap();

        library.save(&record).await.unwrap();
        library.unsave(&record.id).await.unwrap();
        assert!(!library.is_saved(&record.id).await);

        library.refresh().await.unwrap();
        assert!(library.saved().await.is_empty());
        // The history entry is untouched
        assert_eq!(library.history().await, vec![record]);
    }

    #[tokio::test]
    async fn test_find() {
        let library = signed_in().await;
        let record = library.record_translation(translation("שלום")).await.unwrap();
        assert_eq!(library.find(&record.id).await, Some(record));
        assert_eq!(library.find("missing").await, None);
    }

    // ========== Auth Tests ==========

    #[tokio::test]
    async fn test_signed_out_calls_fail() {
        let store = Arc::new(MemoryStore::new());
        let auth = AuthService::new(Arc::new(MemoryIdentity::new()), store.clone());
        let library = Library::new(store, auth);

        assert!(matches!(
            library.record_translation(translation("שלום")).await,
            Err(Error::NotSignedIn)
        ));
        assert!(matches!(library.refresh().await, Err(Error::NotSignedIn)));
        assert!(matches!(library.unsave("x").await, Err(Error::NotSignedIn)));
        assert!(library.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_cache_cleared_on_sign_out() {
        let library = signed_in().await;
        library.record_translation(translation("שלום")).await.unwrap();
        assert_eq!(library.history().await.len(), 1);

        library.auth().logout().await.unwrap();
        assert!(library.history().await.is_empty());

        // Another user never sees the previous user's records
        library
            .auth()
            .signup("noa@example.com", "secret1", None)
            .await
            .unwrap();
        assert!(library.history().await.is_empty());
        library.refresh().await.unwrap();
        assert!(library.history().await.is_empty());
    }
}
