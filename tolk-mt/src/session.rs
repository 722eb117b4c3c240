//! The translator session
//!
//! One session drives one translator screen. It is a tokio task that owns
//! the screen state, receives `Command`s over a channel and publishes
//! `TranslatorView` snapshots over a `watch` channel.
//!
//! Input and language changes are debounced. Translations run on their own
//! tasks; each one carries a generation number and only the response to the
//! most recent request is applied. Loading a stored record opens a
//! suppression window of one debounce interval during which no automatic
//! translation starts.
//!
//! # Example
//!
//! ```ignore
//! use tolk_mt::{MockMode, MockTranslator, TranslatorSession};
//!
//! let session = TranslatorSession::spawn(
//!     Arc::new(MockTranslator::new(MockMode::Suffix)),
//!     library,
//!     Arc::new(Catalog::builtin()),
//! );
//! session.input("שלום")?;
//! let mut view = session.subscribe();
//! view.changed().await?;
//! ```

use crate::debounce::Debouncer;
use crate::error::MtResult;
use crate::translator::MachineTranslator;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tolk::language::{self, Language};
use tolk::{Catalog, Collection, Library, NewTranslation, TranslationRecord};
use tracing::{debug, info, warn};

/// Quiet period before input is translated, also the suppression window
pub const DEBOUNCE_INTERVAL: Duration = Duration::from_millis(750);

/// Longer input is cut to this many characters
pub const MAX_INPUT_CHARS: usize = 6000;

/// Something the user did on the translator screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// The input text changed
    Input { text: String },
    /// Pick a source language by code or name
    Source { language: String },
    /// Pick a target language by code or name
    Target { language: String },
    /// Swap source and target; a translation becomes the new input
    Swap,
    /// Load a history or saved record
    Select { id: String },
    Delete { collection: Collection, id: String },
    /// Save the selected record, or unsave it when already saved
    ToggleSave,
    /// Interface locale for messages
    Locale { locale: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    RateLimit,
    Translation,
    Library,
}

/// Error shown above the input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Everything the translator screen renders
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslatorView {
    pub input: String,
    pub translated: Option<String>,
    pub loading: bool,
    /// Placeholder shown instead of the translation while loading
    pub loading_text: Option<String>,
    pub error: Option<ViewError>,
    /// Whether the selected record is in the saved collection
    pub saved: bool,
    pub selected: Option<TranslationRecord>,
    pub source: Language,
    pub target: Language,
    /// Incremented whenever the input should take focus
    pub focus: u64,
    pub locale: String,
}

impl TranslatorView {
    fn new(locale: &str) -> Self {
        Self {
            input: String::new(),
            translated: None,
            loading: false,
            loading_text: None,
            error: None,
            saved: false,
            selected: None,
            source: language::default_source(),
            target: language::default_target(),
            focus: 0,
            locale: locale.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub debounce: Duration,
    pub max_input_chars: usize,
    pub locale: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce: DEBOUNCE_INTERVAL,
            max_input_chars: MAX_INPUT_CHARS,
            locale: "en".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("translator session has stopped")]
pub struct SessionClosed;

enum Message {
    Command(Command),
    Flush(oneshot::Sender<()>),
}

/// Handle to a running translator session
///
/// The session task stops when the last handle is dropped.
#[derive(Debug, Clone)]
pub struct TranslatorSession {
    inbox: mpsc::UnboundedSender<Message>,
    view: watch::Receiver<TranslatorView>,
}

impl TranslatorSession {
    pub fn spawn(
        translator: Arc<dyn MachineTranslator>,
        library: Library,
        catalog: Arc<Catalog>,
    ) -> Self {
        Self::spawn_with(translator, library, catalog, SessionConfig::default())
    }

    pub fn spawn_with(
        translator: Arc<dyn MachineTranslator>,
        library: Library,
        catalog: Arc<Catalog>,
        config: SessionConfig,
    ) -> Self {
        let (inbox, messages) = mpsc::unbounded_channel();
        let (results, outcomes) = mpsc::unbounded_channel();
        let initial = TranslatorView::new(&config.locale);
        let (publish, view) = watch::channel(initial.clone());

        info!(provider = translator.provider_name(), "translator session started");
        let actor = Actor {
            translator,
            library,
            catalog,
            debounce: Debouncer::new(config.debounce),
            config,
            view: initial,
            publish,
            suppressed_until: None,
            generation: 0,
            results,
            user: None,
        };
        tokio::spawn(actor.run(messages, outcomes));

        Self { inbox, view }
    }

    pub fn send(&self, command: Command) -> Result<(), SessionClosed> {
        self.inbox
            .send(Message::Command(command))
            .map_err(|_| SessionClosed)
    }

    pub fn input(&self, text: impl Into<String>) -> Result<(), SessionClosed> {
        self.send(Command::Input { text: text.into() })
    }

    pub fn set_source(&self, language: impl Into<String>) -> Result<(), SessionClosed> {
        self.send(Command::Source {
            language: language.into(),
        })
    }

    pub fn set_target(&self, language: impl Into<String>) -> Result<(), SessionClosed> {
        self.send(Command::Target {
            language: language.into(),
        })
    }

    pub fn swap(&self) -> Result<(), SessionClosed> {
        self.send(Command::Swap)
    }

    pub fn select(&self, id: impl Into<String>) -> Result<(), SessionClosed> {
        self.send(Command::Select { id: id.into() })
    }

    pub fn delete(&self, collection: Collection, id: impl Into<String>) -> Result<(), SessionClosed> {
        self.send(Command::Delete {
            collection,
            id: id.into(),
        })
    }

    pub fn toggle_save(&self) -> Result<(), SessionClosed> {
        self.send(Command::ToggleSave)
    }

    /// Wait until every command sent so far has been handled
    pub async fn flush(&self) -> Result<(), SessionClosed> {
        let (done, handled) = oneshot::channel();
        self.inbox
            .send(Message::Flush(done))
            .map_err(|_| SessionClosed)?;
        handled.await.map_err(|_| SessionClosed)
    }

    /// Current snapshot
    pub fn view(&self) -> TranslatorView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TranslatorView> {
        self.view.clone()
    }
}

struct Outcome {
    generation: u64,
    text: String,
    source: Language,
    target: Language,
    result: MtResult<String>,
}

struct Actor {
    translator: Arc<dyn MachineTranslator>,
    library: Library,
    catalog: Arc<Catalog>,
    config: SessionConfig,
    view: TranslatorView,
    publish: watch::Sender<TranslatorView>,
    debounce: Debouncer<String>,
    suppressed_until: Option<Instant>,
    // Bumped by every request and by anything that supersedes one
    generation: u64,
    results: mpsc::UnboundedSender<Outcome>,
    user: Option<String>,
}

impl Actor {
    async fn run(
        mut self,
        mut messages: mpsc::UnboundedReceiver<Message>,
        mut outcomes: mpsc::UnboundedReceiver<Outcome>,
    ) {
        let mut auth = self.library.auth().subscribe();
        self.user = auth.borrow_and_update().as_ref().map(|s| s.user.id.clone());
        let mut auth_open = true;

        loop {
            tokio::select! {
                message = messages.recv() => match message {
                    Some(Message::Command(command)) => self.handle(command).await,
                    Some(Message::Flush(done)) => {
                        let _ = done.send(());
                    }
                    None => break,
                },
                text = self.debounce.fired() => self.fire(text),
                Some(outcome) = outcomes.recv() => self.complete(outcome).await,
                changed = auth.changed(), if auth_open => match changed {
                    Ok(()) => {
                        let user = auth.borrow_and_update().as_ref().map(|s| s.user.id.clone());
                        self.auth_changed(user).await;
                    }
                    Err(_) => auth_open = false,
                },
            }
            self.publish();
        }
        debug!("translator session stopped");
    }

    fn publish(&self) {
        let view = &self.view;
        self.publish.send_if_modified(|current| {
            if current == view {
                false
            } else {
                *current = view.clone();
                true
            }
        });
    }

    fn localize(&self, key: &str, values: &[&str]) -> String {
        self.catalog.localize(&self.view.locale, key, values)
    }

    fn is_suppressed(&self) -> bool {
        self.suppressed_until
            .is_some_and(|until| Instant::now() < until)
    }

    fn truncate(&self, text: String) -> String {
        match text.char_indices().nth(self.config.max_input_chars) {
            Some((cut, _)) => text[..cut].to_string(),
            None => text,
        }
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Input { text } => {
                let text = self.truncate(text);
                self.view.input = text.clone();
                self.debounce.schedule(text);
            }
            Command::Source { language } => {
                if let Some(language) = self.language(&language) {
                    if language != self.view.source {
                        self.view.source = language;
                        self.languages_changed();
                    }
                }
            }
            Command::Target { language } => {
                if let Some(language) = self.language(&language) {
                    if language != self.view.target {
                        self.view.target = language;
                        self.languages_changed();
                    }
                }
            }
            Command::Swap => self.swap(),
            Command::Select { id } => self.select_by_id(&id).await,
            Command::Delete { collection, id } => self.delete(collection, &id).await,
            Command::ToggleSave => self.toggle_save().await,
            Command::Locale { locale } => {
                self.view.locale = locale;
                if self.view.loading {
                    self.view.loading_text = Some(self.localize("tolk-translating", &[]));
                }
            }
        }
    }

    fn language(&self, query: &str) -> Option<Language> {
        let found = language::find(query);
        if found.is_none() {
            warn!(%query, "unknown language");
        }
        found
    }

    fn languages_changed(&mut self) {
        if self.is_suppressed() {
            debug!("language change during suppression window");
            return;
        }
        self.debounce.schedule(self.view.input.clone());
    }

    fn swap(&mut self) {
        if let Some(translated) = self.view.translated.clone().filter(|t| !t.is_empty()) {
            self.view.input = self.truncate(translated);
        }
        std::mem::swap(&mut self.view.source, &mut self.view.target);
        self.view.focus += 1;
        self.languages_changed();
    }

    /// The debounce timer went off
    fn fire(&mut self, text: String) {
        if self.is_suppressed() {
            debug!("debounced translation dropped during suppression window");
            return;
        }

        self.generation += 1;
        self.view.saved = false;
        self.view.selected = None;

        if text.trim().is_empty() {
            self.view.translated = None;
            self.view.loading = false;
            self.view.loading_text = None;
            return;
        }

        self.view.loading = true;
        self.view.loading_text = Some(self.localize("tolk-translating", &[]));

        let translator = Arc::clone(&self.translator);
        let results = self.results.clone();
        let generation = self.generation;
        let (source, target) = (self.view.source, self.view.target);
        debug!(generation, chars = text.chars().count(), %source, %target, "requesting translation");

        tokio::spawn(async move {
            let result = translator.translate(&text, source.name, target.name).await;
            // The session may be gone by now
            let _ = results.send(Outcome {
                generation,
                text,
                source,
                target,
                result,
            });
        });
    }

    /// A translation request finished
    async fn complete(&mut self, outcome: Outcome) {
        if outcome.generation != self.generation {
            debug!(
                generation = outcome.generation,
                current = self.generation,
                "dropping stale translation"
            );
            return;
        }

        self.view.loading = false;
        self.view.loading_text = None;

        let translated = match outcome.result {
            Ok(translated) => translated,
            Err(e) => {
                warn!(error = %e, "translation failed");
                let kind = if e.is_rate_limit() {
                    ErrorKind::RateLimit
                } else {
                    ErrorKind::Translation
                };
                self.view.error = Some(ViewError {
                    kind,
                    message: e.user_message(&self.catalog, &self.view.locale),
                });
                return;
            }
        };

        self.view.error = None;
        self.view.translated = Some(translated.clone());

        if self.library.auth().session().is_none() {
            return;
        }
        let recorded = self
            .library
            .record_translation(NewTranslation {
                source_text: outcome.text,
                translated_text: translated,
                source_language: outcome.source.name.to_string(),
                target_language: outcome.target.name.to_string(),
            })
            .await;
        match recorded {
            // Input typed since the request is still waiting to be translated
            Ok(_) if self.debounce.is_pending() => {}
            Ok(record) => self.select(record, false),
            Err(e) => self.library_error(&e),
        }
    }

    /// Show a stored record without translating it again
    fn select(&mut self, record: TranslationRecord, saved: bool) {
        self.debounce.cancel();
        self.suppressed_until = Some(Instant::now() + self.config.debounce);
        self.generation += 1;

        if let Some(source) = language::find(&record.source_language) {
            self.view.source = source;
        }
        if let Some(target) = language::find(&record.target_language) {
            self.view.target = target;
        }
        self.view.input = record.source_text.clone();
        self.view.translated = Some(record.translated_text.clone());
        self.view.loading = false;
        self.view.loading_text = None;
        self.view.error = None;
        self.view.saved = saved;
        debug!(id = %record.id, saved, "record selected");
        self.view.selected = Some(record);
    }

    async fn select_by_id(&mut self, id: &str) {
        let Some(record) = self.library.find(id).await else {
            warn!(%id, "selected record not found");
            return;
        };
        let saved = self.library.is_saved(id).await;
        self.select(record, saved);
    }

    async fn delete(&mut self, collection: Collection, id: &str) {
        let result = match collection {
            Collection::History => self.library.remove_from_history(id).await,
            Collection::Saved => self.library.unsave(id).await,
        };
        if let Err(e) = result {
            self.library_error(&e);
            return;
        }

        if self.view.selected.as_ref().is_some_and(|r| r.id == id) {
            self.view.selected = None;
            self.view.saved = false;
        }
    }

    async fn toggle_save(&mut self) {
        let Some(record) = self.view.selected.clone() else {
            debug!("nothing selected to save");
            return;
        };

        if self.view.saved {
            match self.library.unsave(&record.id).await {
                Ok(()) => self.view.saved = false,
                Err(e) => self.library_error(&e),
            }
        } else {
            match self.library.save(&record).await {
                Ok(()) => {
                    self.view.saved = true;
                    self.view.focus += 1;
                }
                Err(e) => self.library_error(&e),
            }
        }
    }

    fn library_error(&mut self, err: &tolk::Error) {
        warn!(error = %err, "library operation failed");
        let message = err
            .user_messages(&self.catalog, &self.view.locale)
            .into_iter()
            .next()
            .unwrap_or_else(|| self.localize("tolk-error-unknown", &[]));
        self.view.error = Some(ViewError {
            kind: ErrorKind::Library,
            message,
        });
    }

    async fn auth_changed(&mut self, user: Option<String>) {
        if user == self.user {
            return;
        }
        let previous = std::mem::replace(&mut self.user, user);

        if previous.is_some() {
            debug!("user changed, clearing translator");
            self.debounce.cancel();
            self.suppressed_until = None;
            self.generation += 1;
            let locale = std::mem::take(&mut self.view.locale);
            self.view = TranslatorView {
                source: self.view.source,
                target: self.view.target,
                ..TranslatorView::new(&locale)
            };
        }

        if self.user.is_some() {
            if let Err(e) = self.library.refresh().await {
                self.library_error(&e);
            }
        }
    }
}
