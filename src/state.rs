use parking_lot::RwLock;
use std::sync::Arc;

use crate::chat::ChatSession;
use crate::config::Config;
use crate::llm::transport::{HttpTransport, Transport};
use crate::settings::{JsonFileSettingsStore, Settings, SettingsStore};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<ChatSession>,
    pub settings: Arc<RwLock<Settings>>,
    pub settings_store: Arc<dyn SettingsStore>,
}

impl AppState {
    /// Build state against the configured HTTP backend, loading persisted
    /// settings from the data directory.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let http_client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(
                config.backend.connect_timeout_secs,
            ))
            .build()?;
        let transport = Arc::new(HttpTransport::new(http_client, &config.backend));
        let store = Arc::new(JsonFileSettingsStore::new(config.settings_path()));

        Self::with_parts(transport, store)
    }

    /// Build state from explicit collaborators.
    pub fn with_parts(
        transport: Arc<dyn Transport>,
        settings_store: Arc<dyn SettingsStore>,
    ) -> anyhow::Result<Self> {
        let settings = settings_store.load()?;
        tracing::info!(
            "Loaded settings: mode={}, match_count={}, api_key set={}",
            settings.mode().as_str(),
            settings.match_count(),
            !settings.api_key().is_empty()
        );

        Ok(Self {
            session: Arc::new(ChatSession::new(transport)),
            settings: Arc::new(RwLock::new(settings)),
            settings_store,
        })
    }

    /// Current settings, cloned so no lock is held across an await.
    pub fn current_settings(&self) -> Settings {
        self.settings.read().clone()
    }
}
