//! Shared server state and the per-client registry

use crate::config::{BackendKind, Config};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tolk::auth::{FirebaseAuth, MemoryIdentity};
use tolk::store::{Firestore, MemoryStore};
use tolk::ui::SidePanel;
use tolk::{
    AuthService, Catalog, Collection, IdentityProvider, Library, PanelView, Preferences,
    TranslationStore,
};
use tolk_mt::{Command, GeminiProvider, MachineTranslator, MockMode, MockTranslator, TranslatorSession};
use tracing::{debug, info};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One browser tab: its own sign-in state, library cache and translator
pub struct Client {
    pub auth: AuthService,
    pub library: Library,
    pub translator: TranslatorSession,
    catalog: Arc<Catalog>,
    prefs: Mutex<Preferences>,
    collapsed: Mutex<HashMap<Collection, bool>>,
    last_seen: Mutex<Instant>,
}

impl Client {
    /// Mark the client as active now
    pub fn touch(&self) {
        *lock(&self.last_seen) = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        lock(&self.last_seen).elapsed()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn preferences(&self) -> Preferences {
        lock(&self.prefs).clone()
    }

    pub fn locale(&self) -> String {
        lock(&self.prefs).locale.clone()
    }

    pub fn set_preferences(&self, prefs: Preferences) {
        let locale = prefs.locale.clone();
        *lock(&self.prefs) = prefs;
        let _ = self.translator.send(Command::Locale { locale });
    }

    /// Side panel for `collection`, labelled in the client's locale
    pub async fn panel(&self, collection: Collection) -> PanelView {
        let locale = self.locale();
        let (label, signed_out) = match collection {
            Collection::History => ("tolk-history", "tolk-history-signed-out"),
            Collection::Saved => ("tolk-saved", "tolk-saved-signed-out"),
        };
        let mut panel = SidePanel::new(self.catalog.localize(&locale, label, &[]))
            .private(self.catalog.localize(&locale, signed_out, &[]));
        panel.set_collapsed(*lock(&self.collapsed).get(&collection).unwrap_or(&true));

        let records = self.library.list(collection).await;
        panel.view(&records, self.auth.session().is_some())
    }

    /// Flip the collapsed state of a side panel
    pub async fn toggle_panel(&self, collection: Collection) -> PanelView {
        {
            let mut collapsed = lock(&self.collapsed);
            let entry = collapsed.entry(collection).or_insert(true);
            *entry = !*entry;
        }
        self.panel(collection).await
    }
}

struct Shared {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn TranslationStore>,
    translator: Arc<dyn MachineTranslator>,
    catalog: Arc<Catalog>,
    clients: RwLock<HashMap<String, Arc<Client>>>,
}

#[derive(Clone)]
pub struct AppState {
    inner: Arc<Shared>,
}

impl AppState {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn TranslationStore>,
        translator: Arc<dyn MachineTranslator>,
        catalog: Catalog,
    ) -> Self {
        Self {
            inner: Arc::new(Shared {
                identity,
                store,
                translator,
                catalog: Arc::new(catalog),
                clients: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Wire providers as selected by the configuration
    pub fn from_config(config: &Config) -> Result<Self, Box<dyn std::error::Error>> {
        let catalog = match &config.locales_dir {
            Some(dir) => Catalog::builtin_with_dir(dir)?,
            None => Catalog::builtin(),
        };

        let translator: Arc<dyn MachineTranslator> = if config.mock_translator {
            info!("using mock translator");
            Arc::new(MockTranslator::new(MockMode::Suffix))
        } else {
            let provider = GeminiProvider::from_env()
                .map_err(|e| format!("Failed to initialize translator: {}", e))?;
            info!(model = provider.model(), "using Gemini");
            Arc::new(provider)
        };

        let (identity, store): (Arc<dyn IdentityProvider>, Arc<dyn TranslationStore>) =
            match config.backend {
                BackendKind::Memory => (
                    Arc::new(MemoryIdentity::new()),
                    Arc::new(MemoryStore::new()),
                ),
                BackendKind::Firebase => (
                    Arc::new(FirebaseAuth::from_env()?),
                    Arc::new(Firestore::from_env()?),
                ),
            };
        info!(backend = ?config.backend, store = store.backend_name(), "providers ready");

        Ok(Self::new(identity, store, translator, catalog))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    pub fn translator(&self) -> &Arc<dyn MachineTranslator> {
        &self.inner.translator
    }

    /// Register a new client and return its token
    pub async fn open_client(&self, prefs: Preferences) -> String {
        let auth = AuthService::new(
            Arc::clone(&self.inner.identity),
            Arc::clone(&self.inner.store),
        );
        let library = Library::new(Arc::clone(&self.inner.store), auth.clone());
        let translator = TranslatorSession::spawn_with(
            Arc::clone(&self.inner.translator),
            library.clone(),
            Arc::clone(&self.inner.catalog),
            tolk_mt::SessionConfig {
                locale: prefs.locale.clone(),
                ..Default::default()
            },
        );
        let client = Client {
            auth,
            library,
            translator,
            catalog: Arc::clone(&self.inner.catalog),
            prefs: Mutex::new(prefs),
            collapsed: Mutex::new(HashMap::new()),
            last_seen: Mutex::new(Instant::now()),
        };

        let token = uuid::Uuid::new_v4().to_string();
        let mut clients = self.inner.clients.write().await;
        clients.insert(token.clone(), Arc::new(client));
        debug!(clients = clients.len(), "client registered");
        token
    }

    pub async fn client(&self, token: &str) -> Option<Arc<Client>> {
        self.inner.clients.read().await.get(token).cloned()
    }

    /// Forget a client; its translator stops once no request holds it
    pub async fn close_client(&self, token: &str) -> Option<Arc<Client>> {
        let removed = self.inner.clients.write().await.remove(token);
        if removed.is_some() {
            debug!("client removed");
        }
        removed
    }

    /// Drop clients idle for at least `max_idle`
    ///
    /// A client still held elsewhere (an open WebSocket, a request in
    /// progress) stays registered. Returns how many were dropped.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut clients = self.inner.clients.write().await;
        let before = clients.len();
        clients.retain(|_, client| Arc::strong_count(client) > 1 || client.idle_for() < max_idle);
        let evicted = before - clients.len();
        if evicted > 0 {
            info!(evicted, remaining = clients.len(), "evicted idle clients");
        }
        evicted
    }

    /// Sweep idle clients in the background until the runtime shuts down
    pub fn spawn_idle_sweep(&self, max_idle: Duration) -> JoinHandle<()> {
        let state = self.clone();
        let period = (max_idle / 2).clamp(Duration::from_secs(1), Duration::from_secs(60));
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                state.evict_idle(max_idle).await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDLE: Duration = Duration::from_secs(30 * 60);

    fn state() -> AppState {
        AppState::new(
            Arc::new(MemoryIdentity::new()),
            Arc::new(MemoryStore::new()),
            Arc::new(MockTranslator::new(MockMode::Suffix)),
            Catalog::builtin(),
        )
    }

    // ========== Registry Tests ==========

    #[tokio::test(start_paused = true)]
    async fn test_idle_client_is_evicted() {
        let state = state();
        let idle = state.open_client(Preferences::default()).await;
        let active = state.open_client(Preferences::default()).await;

        tokio::time::advance(IDLE - Duration::from_secs(1)).await;
        state.client(&active).await.unwrap().touch();
        tokio::time::advance(Duration::from_secs(1)).await;

        assert_eq!(state.evict_idle(IDLE).await, 1);
        assert!(state.client(&idle).await.is_none());
        assert!(state.client(&active).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_held_client_is_kept() {
        let state = state();
        let token = state.open_client(Preferences::default()).await;
        let held = state.client(&token).await.unwrap();

        tokio::time::advance(IDLE * 2).await;
        assert_eq!(state.evict_idle(IDLE).await, 0);

        drop(held);
        assert_eq!(state.evict_idle(IDLE).await, 1);
        assert!(state.client(&token).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_drops_anonymous_clients() {
        let state = state();
        let mut tokens = Vec::new();
        for _ in 0..100 {
            tokens.push(state.open_client(Preferences::default()).await);
        }
        let sweep = state.spawn_idle_sweep(Duration::from_secs(10));

        tokio::time::sleep(Duration::from_secs(16)).await;
        for token in &tokens {
            assert!(state.client(token).await.is_none());
        }
        sweep.abort();
    }
}
