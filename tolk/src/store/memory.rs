//! In-process document store

use super::{Collection, StoreResult, TranslationStore};
use crate::auth::AuthSession;
use crate::record::TranslationRecord;
use crate::user::UserDocument;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct UserData {
    document: Option<UserDocument>,
    // (insertion sequence, record); the sequence breaks createdAt ties
    history: HashMap<String, (u64, TranslationRecord)>,
    saved: HashMap<String, (u64, TranslationRecord)>,
}

impl UserData {
    fn collection(&mut self, collection: Collection) -> &mut HashMap<String, (u64, TranslationRecord)> {
        match collection {
            Collection::History => &mut self.history,
            Collection::Saved => &mut self.saved,
        }
    }
}

#[derive(Debug, Default)]
struct Documents {
    users: HashMap<String, UserData>,
    sequence: u64,
}

/// Document store backed by maps, keyed by user id
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<Documents>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The user document as last written, if any
    pub async fn user_document(&self, user_id: &str) -> Option<UserDocument> {
        self.documents
            .read()
            .await
            .users
            .get(user_id)
            .and_then(|data| data.document.clone())
    }
}

#[async_trait]
impl TranslationStore for MemoryStore {
    async fn put(
        &self,
        session: &AuthSession,
        collection: Collection,
        record: &TranslationRecord,
    ) -> StoreResult<()> {
        let mut documents = self.documents.write().await;
        documents.sequence += 1;
        let sequence = documents.sequence;
        documents
            .users
            .entry(session.user.id.clone())
            .or_default()
            .collection(collection)
            .insert(record.id.clone(), (sequence, record.clone()));
        Ok(())
    }

    async fn list(
        &self,
        session: &AuthSession,
        collection: Collection,
    ) -> StoreResult<Vec<TranslationRecord>> {
        let documents = self.documents.read().await;
        let Some(data) = documents.users.get(&session.user.id) else {
            return Ok(Vec::new());
        };
        let entries = match collection {
            Collection::History => &data.history,
            Collection::Saved => &data.saved,
        };
        let mut records: Vec<&(u64, TranslationRecord)> = entries.values().collect();
        records.sort_by(|(seq_a, a), (seq_b, b)| {
            b.created_at.cmp(&a.created_at).then(seq_b.cmp(seq_a))
        });
        Ok(records.into_iter().map(|(_, r)| r.clone()).collect())
    }

    async fn delete(
        &self,
        session: &AuthSession,
        collection: Collection,
        id: &str,
    ) -> StoreResult<()> {
        let mut documents = self.documents.write().await;
        if let Some(data) = documents.users.get_mut(&session.user.id) {
            data.collection(collection).remove(id);
        }
        Ok(())
    }

    async fn put_user(&self, session: &AuthSession, document: &UserDocument) -> StoreResult<()> {
        let mut documents = self.documents.write().await;
        let stored = documents
            .users
            .entry(session.user.id.clone())
            .or_default()
            .document
            .get_or_insert_with(UserDocument::default);
        if let Some(email) = &document.email {
            stored.email = Some(email.clone());
        }
        if let Some(name) = &document.display_name {
            stored.display_name = Some(name.clone());
        }
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "Memory Store"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::User;
    use chrono::{Duration, Utc};

    fn session(user_id: &str) -> AuthSession {
        AuthSession {
            user: User {
                id: user_id.to_string(),
                email: Some(format!("{user_id}@example.com")),
                display_name: None,
                email_verified: true,
            },
            id_token: format!("token-{user_id}"),
            refresh_token: None,
        }
    }

    fn record(id: &str, minutes_ago: i64) -> TranslationRecord {
        TranslationRecord {
            id: id.to_string(),
            source_text: format!("source {id}"),
            translated_text: format!("target {id}"),
            source_language: "Hebrew".to_string(),
            target_language: "English".to_string(),
            created_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[tokio::test]
    async fn test_list_most_recent_first() {
        let store = MemoryStore::new();
        let dana = session("dana");
        store.put(&dana, Collection::History, &record("old", 10)).await.unwrap();
        store.put(&dana, Collection::History, &record("new", 1)).await.unwrap();
        store.put(&dana, Collection::History, &record("mid", 5)).await.unwrap();

        let ids: Vec<String> = store
            .list(&dana, Collection::History)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn test_put_is_upsert() {
        let store = MemoryStore::new();
        let dana = session("dana");
        let r = record("r1", 0);
        store.put(&dana, Collection::Saved, &r).await.unwrap();
        store.put(&dana, Collection::Saved, &r).await.unwrap();
        assert_eq!(store.list(&dana, Collection::Saved).await.unwrap(), vec![r]);
    }

    #[tokio::test]
    async fn test_users_and_collections_are_isolated() {
        let store = MemoryStore::new();
        let dana = session("dana");
        let noa = session("noa");
        store.put(&dana, Collection::History, &record("r1", 0)).await.unwrap();

        assert!(store.list(&noa, Collection::History).await.unwrap().is_empty());
        assert!(store.list(&dana, Collection::Saved).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryStore::new();
        let dana = session("dana");
        store.put(&dana, Collection::History, &record("r1", 0)).await.unwrap();
        store.delete(&dana, Collection::History, "r1").await.unwrap();
        // Deleting again is fine
        store.delete(&dana, Collection::History, "r1").await.unwrap();
        assert!(store.list(&dana, Collection::History).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_put_user_merges_fields() {
        let store = MemoryStore::new();
        let dana = session("dana");
        assert_eq!(store.user_document("dana").await, None);

        store
            .put_user(
                &dana,
                &UserDocument {
                    email: Some("dana@example.com".into()),
                    display_name: None,
                },
            )
            .await
            .unwrap();
        store
            .put_user(&dana, &UserDocument::display_name("Dana"))
            .await
            .unwrap();

        let document = store.user_document("dana").await.unwrap();
        assert_eq!(document.email.as_deref(), Some("dana@example.com"));
        assert_eq!(document.display_name.as_deref(), Some("Dana"));
    }
}
