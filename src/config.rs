use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where persisted settings live
    pub data_dir: PathBuf,
    /// Server bind address
    pub bind_addr: String,
    /// Remote retrieval/generation backend
    pub backend: BackendConfig,
}

/// The service that answers `/api/search` and `/api/answer`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL, without the `/api/...` suffix
    pub base_url: String,
    /// TCP connect timeout in seconds. No overall request timeout is set:
    /// answers stream for as long as the backend keeps writing.
    pub connect_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            bind_addr: "127.0.0.1:9100".to_string(),
            backend: BackendConfig::default(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            connect_timeout_secs: 10,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("PASSAGE_CHAT_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(addr) = std::env::var("PASSAGE_CHAT_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(url) = std::env::var("PASSAGE_CHAT_BACKEND_URL") {
            config.backend.base_url = url;
        }
        if let Ok(val) = std::env::var("PASSAGE_CHAT_CONNECT_TIMEOUT_SECS") {
            if let Ok(v) = val.parse() {
                config.backend.connect_timeout_secs = v;
            }
        }

        config
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }
}
