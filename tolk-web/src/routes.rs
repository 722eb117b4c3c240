//! JSON API handlers

use crate::error::{ApiError, Rejection};
use crate::extract::{AppJson, AppPath};
use crate::state::{AppState, Client};
use axum::{
    Json,
    body::Bytes,
    extract::{FromRequestParts, Query, State},
    http::{StatusCode, header, request::Parts},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tolk::{
    Collection, LANGUAGES, Language, LoginForm, NewTranslation, PasswordChangeForm, PanelView,
    Preferences, ProfileForm, SignupForm, TranslationRecord, User, language,
};
use tolk_mt::{MAX_INPUT_CHARS, MtError};
use tracing::{info, warn};

/// The registered client named by the request's session token
///
/// The token comes from `Authorization: Bearer`, or from a `token` query
/// parameter for WebSocket upgrades, which cannot carry headers from a
/// browser.
pub struct Authed {
    pub token: String,
    pub client: Arc<Client>,
}

#[derive(Deserialize)]
struct TokenQuery {
    token: String,
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

impl FromRequestParts<AppState> for Authed {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .or_else(|| {
                Query::<TokenQuery>::try_from_uri(&parts.uri)
                    .ok()
                    .map(|Query(q)| q.token)
            })
            .ok_or_else(ApiError::unknown_session)?;
        let client = state
            .client(&token)
            .await
            .ok_or_else(ApiError::unknown_session)?;
        client.touch();
        Ok(Authed { token, client })
    }
}

/// Localize a failed call in the client's locale
trait OrReject<T> {
    fn or_reject(self, client: &Client) -> Result<T, ApiError>;
}

impl<T, E: Rejection> OrReject<T> for Result<T, E> {
    fn or_reject(self, client: &Client) -> Result<T, ApiError> {
        self.map_err(|e| e.reject(client.catalog(), &client.locale()))
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ========== Session ==========

#[derive(Debug, Default, Deserialize)]
pub struct OpenSession {
    #[serde(default)]
    pub preferences: Option<Preferences>,
}

#[derive(Debug, Serialize)]
pub struct SessionOpened {
    pub token: String,
    pub preferences: Preferences,
}

pub async fn open_session(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<SessionOpened>)> {
    let request: OpenSession = if body.is_empty() {
        OpenSession::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::invalid(format!("invalid request body: {}", e)))?
    };
    let preferences = request.preferences.unwrap_or_default();
    if !state.catalog().has_locale(&preferences.locale) {
        return Err(ApiError::invalid(format!("unknown locale '{}'", preferences.locale)));
    }
    let token = state.open_client(preferences.clone()).await;
    Ok((StatusCode::CREATED, Json(SessionOpened { token, preferences })))
}

pub async fn close_session(State(state): State<AppState>, authed: Authed) -> StatusCode {
    if let Err(e) = authed.client.auth.logout().await {
        warn!(error = %e, "logout while closing session failed");
    }
    state.close_client(&authed.token).await;
    StatusCode::NO_CONTENT
}

// ========== Reference Data ==========

pub async fn languages() -> Json<&'static [Language]> {
    Json(LANGUAGES)
}

#[derive(Debug, Serialize)]
pub struct LocaleMessages {
    pub locale: String,
    pub messages: std::collections::BTreeMap<String, String>,
}

pub async fn locale_messages(
    State(state): State<AppState>,
    AppPath(code): AppPath<String>,
) -> ApiResult<Json<LocaleMessages>> {
    if !state.catalog().has_locale(&code) {
        return Err(ApiError::not_found(format!("locale '{}'", code)));
    }
    Ok(Json(LocaleMessages {
        messages: state.catalog().resolved_messages(&code),
        locale: code,
    }))
}

// ========== Auth ==========

pub async fn signup(
    authed: Authed,
    AppJson(form): AppJson<SignupForm>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let client = &authed.client;
    let user = client.auth.submit_signup(&form).await.or_reject(client)?;
    client.library.clear().await;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(authed: Authed, AppJson(form): AppJson<LoginForm>) -> ApiResult<Json<User>> {
    let client = &authed.client;
    let user = client.auth.submit_login(&form).await.or_reject(client)?;
    if let Err(e) = client.library.refresh().await {
        warn!(user = %user.id, error = %e, "failed to load library after login");
    }
    Ok(Json(user))
}

pub async fn logout(authed: Authed) -> ApiResult<StatusCode> {
    let client = &authed.client;
    client.auth.logout().await.or_reject(client)?;
    client.library.clear().await;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct PasswordReset {
    #[serde(default)]
    pub email: String,
}

pub async fn reset_password(
    authed: Authed,
    AppJson(body): AppJson<PasswordReset>,
) -> ApiResult<StatusCode> {
    let client = &authed.client;
    client.auth.reset_password(&body.email).await.or_reject(client)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn change_password(
    authed: Authed,
    AppJson(form): AppJson<PasswordChangeForm>,
) -> ApiResult<StatusCode> {
    let client = &authed.client;
    client.auth.submit_password_change(&form).await.or_reject(client)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn verify_email(authed: Authed) -> ApiResult<StatusCode> {
    let client = &authed.client;
    client.auth.send_email_verification().await.or_reject(client)?;
    Ok(StatusCode::NO_CONTENT)
}

// ========== Account ==========

pub async fn account(authed: Authed) -> ApiResult<Json<User>> {
    let client = &authed.client;
    let user = client.auth.reload().await.or_reject(client)?;
    Ok(Json(user))
}

pub async fn update_account(
    authed: Authed,
    AppJson(form): AppJson<ProfileForm>,
) -> ApiResult<Json<User>> {
    let client = &authed.client;
    let user = client.auth.submit_profile(&form).await.or_reject(client)?;
    Ok(Json(user))
}

// ========== Library ==========

async fn list(client: &Client, collection: Collection) -> ApiResult<Json<Vec<TranslationRecord>>> {
    client.auth.require_session().or_reject(client)?;
    Ok(Json(client.library.list(collection).await))
}

pub async fn history(authed: Authed) -> ApiResult<Json<Vec<TranslationRecord>>> {
    list(&authed.client, Collection::History).await
}

pub async fn saved(authed: Authed) -> ApiResult<Json<Vec<TranslationRecord>>> {
    list(&authed.client, Collection::Saved).await
}

pub async fn delete_history(authed: Authed, AppPath(id): AppPath<String>) -> ApiResult<StatusCode> {
    let client = &authed.client;
    client.library.remove_from_history(&id).await.or_reject(client)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    pub id: String,
}

pub async fn save(
    authed: Authed,
    AppJson(body): AppJson<SaveRequest>,
) -> ApiResult<(StatusCode, Json<TranslationRecord>)> {
    let client = &authed.client;
    client.auth.require_session().or_reject(client)?;
    let record = client
        .library
        .find(&body.id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("translation '{}'", body.id)))?;
    client.library.save(&record).await.or_reject(client)?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn unsave(authed: Authed, AppPath(id): AppPath<String>) -> ApiResult<StatusCode> {
    let client = &authed.client;
    client.library.unsave(&id).await.or_reject(client)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn panel(authed: Authed, AppPath(collection): AppPath<Collection>) -> Json<PanelView> {
    Json(authed.client.panel(collection).await)
}

pub async fn toggle_panel(authed: Authed, AppPath(collection): AppPath<Collection>) -> Json<PanelView> {
    Json(authed.client.toggle_panel(collection).await)
}

// ========== Translation ==========

#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    pub text: String,
    /// Code or name; defaults to the translator's default source
    #[serde(default)]
    pub source: Option<String>,
    pub target: String,
}

#[derive(Debug, Serialize)]
pub struct TranslateResponse {
    pub translated: String,
    /// The history entry, when signed in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<TranslationRecord>,
}

fn resolve(query: &str) -> Result<Language, MtError> {
    language::find(query).ok_or_else(|| MtError::InvalidLanguage(format!("Unknown language: {}", query)))
}

pub async fn translate(
    State(state): State<AppState>,
    authed: Authed,
    AppJson(request): AppJson<TranslateRequest>,
) -> ApiResult<Json<TranslateResponse>> {
    let client = &authed.client;
    let source = match request.source.as_deref() {
        Some(query) => resolve(query).or_reject(client)?,
        None => language::default_source(),
    };
    let target = resolve(&request.target).or_reject(client)?;
    let text: String = request.text.chars().take(MAX_INPUT_CHARS).collect();

    if text.trim().is_empty() {
        return Ok(Json(TranslateResponse {
            translated: String::new(),
            record: None,
        }));
    }

    info!(%source, %target, chars = text.chars().count(), "translating");
    let translated = state
        .translator()
        .translate(&text, source.name, target.name)
        .await
        .or_reject(client)?;

    let record = if client.auth.session().is_some() {
        let record = client
            .library
            .record_translation(NewTranslation {
                source_text: text,
                translated_text: translated.clone(),
                source_language: source.name.to_string(),
                target_language: target.name.to_string(),
            })
            .await
            .or_reject(client)?;
        Some(record)
    } else {
        None
    };

    Ok(Json(TranslateResponse { translated, record }))
}

// ========== Preferences ==========

pub async fn preferences(authed: Authed) -> Json<Preferences> {
    Json(authed.client.preferences())
}

pub async fn update_preferences(
    State(state): State<AppState>,
    authed: Authed,
    AppJson(prefs): AppJson<Preferences>,
) -> ApiResult<Json<Preferences>> {
    if !state.catalog().has_locale(&prefs.locale) {
        return Err(ApiError::invalid(format!("unknown locale '{}'", prefs.locale)));
    }
    authed.client.set_preferences(prefs.clone());
    Ok(Json(prefs))
}
