//! Cloud Firestore document store
//!
//! Uses the Firestore REST API (v1). Records are stored as
//! `users/{uid}/{history|saved}/{id}` with typed field values; the user
//! document itself is `users/{uid}`. Requests carry the signed-in user's ID
//! token, so security rules see the same identity as the web SDK would.
//!
//! # Example
//!
//! ```ignore
//! use tolk::store::{Collection, Firestore, TranslationStore};
//!
//! let store = Firestore::from_env()?;
//! let history = store.list(&session, Collection::History).await?;
//! ```

use super::{Collection, StoreError, StoreResult, TranslationStore};
use crate::auth::AuthSession;
use crate::record::TranslationRecord;
use crate::user::UserDocument;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<Document>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Document {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

/// Firestore REST client
#[derive(Clone)]
pub struct Firestore {
    project_id: String,
    client: reqwest::Client,
    base_url: String,
}

impl Firestore {
    /// Page size used when listing a collection
    const PAGE_SIZE: usize = 100;

    pub fn new(project_id: String) -> StoreResult<Self> {
        if project_id.trim().is_empty() {
            return Err(StoreError::Backend {
                status: 0,
                message: "Firestore project id cannot be empty".to_string(),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            project_id,
            client,
            base_url: "https://firestore.googleapis.com/v1".to_string(),
        })
    }

    /// Create from the `FIREBASE_PROJECT_ID` environment variable
    pub fn from_env() -> StoreResult<Self> {
        let project_id = std::env::var("FIREBASE_PROJECT_ID").map_err(|_| StoreError::Backend {
            status: 0,
            message: "FIREBASE_PROJECT_ID environment variable not set".to_string(),
        })?;
        Self::new(project_id)
    }

    /// Point at another endpoint, e.g. the Firestore emulator
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn documents_root(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents",
            self.base_url, self.project_id
        )
    }

    fn user_url(&self, user_id: &str) -> String {
        format!(
            "{}/users/{}",
            self.documents_root(),
            urlencoding::encode(user_id)
        )
    }

    fn collection_url(&self, user_id: &str, collection: Collection) -> String {
        format!("{}/{}", self.user_url(user_id), collection.path())
    }

    fn record_url(&self, user_id: &str, collection: Collection, id: &str) -> String {
        format!(
            "{}/{}",
            self.collection_url(user_id, collection),
            urlencoding::encode(id)
        )
    }

    fn encode_record(record: &TranslationRecord) -> Value {
        json!({
            "fields": {
                "sourceText": { "stringValue": record.source_text },
                "translatedText": { "stringValue": record.translated_text },
                "sourceLanguage": { "stringValue": record.source_language },
                "targetLanguage": { "stringValue": record.target_language },
                "createdAt": { "timestampValue": record.created_at.to_rfc3339() },
            }
        })
    }

    fn string_field(fields: &Map<String, Value>, name: &str) -> StoreResult<String> {
        fields
            .get(name)
            .and_then(|v| v["stringValue"].as_str())
            .map(str::to_string)
            .ok_or_else(|| StoreError::Decode(format!("missing string field '{name}'")))
    }

    fn decode_record(document: Document) -> StoreResult<TranslationRecord> {
        let id = document
            .name
            .rsplit('/')
            .next()
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or_else(|| StoreError::Decode(format!("bad document name '{}'", document.name)))?;
        let fields = &document.fields;
        let created_at = fields
            .get("createdAt")
            .and_then(|v| v["timestampValue"].as_str())
            .ok_or_else(|| StoreError::Decode("missing timestamp field 'createdAt'".to_string()))
            .and_then(|s| {
                DateTime::parse_from_rfc3339(s)
                    .map(|t| t.with_timezone(&Utc))
                    .map_err(|e| StoreError::Decode(format!("bad createdAt '{s}': {e}")))
            })?;

        Ok(TranslationRecord {
            id,
            source_text: Self::string_field(fields, "sourceText")?,
            translated_text: Self::string_field(fields, "translatedText")?,
            source_language: Self::string_field(fields, "sourceLanguage")?,
            target_language: Self::string_field(fields, "targetLanguage")?,
            created_at,
        })
    }

    async fn check(response: reqwest::Response) -> StoreResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
            .unwrap_or(text);
        Err(StoreError::Backend {
            status: status.as_u16(),
            message,
        })
    }
}

impl std::fmt::Debug for Firestore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Firestore")
            .field("project_id", &self.project_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl TranslationStore for Firestore {
    async fn put(
        &self,
        session: &AuthSession,
        collection: Collection,
        record: &TranslationRecord,
    ) -> StoreResult<()> {
        let url = self.record_url(&session.user.id, collection, &record.id);
        debug!(%collection, id = %record.id, "firestore put");
        let response = self
            .client
            .patch(url)
            .bearer_auth(&session.id_token)
            .json(&Self::encode_record(record))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn list(
        &self,
        session: &AuthSession,
        collection: Collection,
    ) -> StoreResult<Vec<TranslationRecord>> {
        let base = format!(
            "{}?orderBy=createdAt%20desc&pageSize={}",
            self.collection_url(&session.user.id, collection),
            Self::PAGE_SIZE
        );
        let mut records = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let url = match &page_token {
                Some(token) => format!("{base}&pageToken={}", urlencoding::encode(token)),
                None => base.clone(),
            };
            let response = self
                .client
                .get(url)
                .bearer_auth(&session.id_token)
                .send()
                .await?;
            let page: ListResponse = Self::check(response)
                .await?
                .json()
                .await
                .map_err(|e| StoreError::Decode(e.to_string()))?;

            for document in page.documents {
                records.push(Self::decode_record(document)?);
            }
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(%collection, count = records.len(), "firestore list");
        Ok(records)
    }

    async fn delete(
        &self,
        session: &AuthSession,
        collection: Collection,
        id: &str,
    ) -> StoreResult<()> {
        let url = self.record_url(&session.user.id, collection, id);
        let response = self
            .client
            .delete(url)
            .bearer_auth(&session.id_token)
            .send()
            .await?;
        match Self::check(response).await {
            Ok(_) | Err(StoreError::Backend { status: 404, .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn put_user(&self, session: &AuthSession, document: &UserDocument) -> StoreResult<()> {
        let mut fields = Map::new();
        let mut mask = Vec::new();
        if let Some(email) = &document.email {
            fields.insert("email".to_string(), json!({ "stringValue": email }));
            mask.push("updateMask.fieldPaths=email");
        }
        if let Some(name) = &document.display_name {
            fields.insert("displayName".to_string(), json!({ "stringValue": name }));
            mask.push("updateMask.fieldPaths=displayName");
        }
        if mask.is_empty() {
            return Ok(());
        }

        let url = format!("{}?{}", self.user_url(&session.user.id), mask.join("&"));
        let response = self
            .client
            .patch(url)
            .bearer_auth(&session.id_token)
            .json(&json!({ "fields": fields }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "Firestore"
    }
}
