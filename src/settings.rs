use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::SettingsUpdate;

pub const MIN_MATCH_COUNT: u8 = 1;
pub const MAX_MATCH_COUNT: u8 = 10;
pub const DEFAULT_MATCH_COUNT: u8 = 5;

const KEY_API_KEY: &str = "api_key";
const KEY_MATCH_COUNT: &str = "match_count";
const KEY_MODE: &str = "mode";

/// What a submitted query does: retrieve passages only, or run a full
/// retrieve-then-generate chat turn.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Search,
    #[default]
    Chat,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Search => "search",
            Mode::Chat => "chat",
        }
    }
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "search" => Ok(Mode::Search),
            "chat" => Ok(Mode::Chat),
            other => anyhow::bail!("Unknown mode: {other}"),
        }
    }
}

/// User settings. `match_count` is kept inside
/// [`MIN_MATCH_COUNT`]..=[`MAX_MATCH_COUNT`] by every constructor and setter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    api_key: String,
    match_count: u8,
    mode: Mode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            match_count: DEFAULT_MATCH_COUNT,
            mode: Mode::default(),
        }
    }
}

impl Settings {
    pub fn new(api_key: impl Into<String>, match_count: i64, mode: Mode) -> Self {
        Self {
            api_key: api_key.into(),
            match_count: clamp_match_count(match_count),
            mode,
        }
    }

    /// Settings after an explicit clear: no key, default count, search mode.
    pub fn cleared() -> Self {
        Self {
            mode: Mode::Search,
            ..Self::default()
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn match_count(&self) -> u8 {
        self.match_count
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_api_key(&mut self, api_key: impl Into<String>) {
        self.api_key = api_key.into();
    }

    pub fn set_match_count(&mut self, match_count: i64) {
        self.match_count = clamp_match_count(match_count);
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    /// Apply the fields present in `update`, leaving the rest untouched.
    pub fn apply(&mut self, update: SettingsUpdate) {
        if let Some(key) = update.api_key {
            self.set_api_key(key.trim());
        }
        if let Some(count) = update.match_count {
            self.set_match_count(count);
        }
        if let Some(mode) = update.mode {
            self.set_mode(mode);
        }
    }

    fn to_entries(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (KEY_API_KEY.to_string(), self.api_key.clone()),
            (KEY_MATCH_COUNT.to_string(), self.match_count.to_string()),
            (KEY_MODE.to_string(), self.mode.as_str().to_string()),
        ])
    }

    /// Rebuild settings from stored string entries. Missing or malformed
    /// values fall back to their defaults; the count is clamped.
    fn from_entries(entries: &BTreeMap<String, String>) -> Self {
        let api_key = entries.get(KEY_API_KEY).cloned().unwrap_or_default();
        let match_count = entries
            .get(KEY_MATCH_COUNT)
            .and_then(|v| parse_match_count(v))
            .unwrap_or(i64::from(DEFAULT_MATCH_COUNT));
        let mode = entries
            .get(KEY_MODE)
            .and_then(|v| v.parse().ok())
            .unwrap_or_default();
        Self::new(api_key, match_count, mode)
    }
}

/// Parse a stored count. Integers too large for `i64` saturate toward their
/// sign so the clamp still applies; anything non-numeric is `None`.
fn parse_match_count(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<i64>() {
        return Some(value);
    }
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(if negative { i64::MIN } else { i64::MAX })
}

fn clamp_match_count(value: i64) -> u8 {
    // In range after the clamp, so the cast cannot truncate.
    value.clamp(i64::from(MIN_MATCH_COUNT), i64::from(MAX_MATCH_COUNT)) as u8
}

/// Key-value persistence for [`Settings`], injected into the server state.
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> Result<Settings>;
    fn save(&self, settings: &Settings) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Stores settings as a flat JSON object of string values.
#[derive(Debug, Clone)]
pub struct JsonFileSettingsStore {
    path: PathBuf,
}

impl JsonFileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileSettingsStore {
    fn load(&self) -> Result<Settings> {
        if !self.path.exists() {
            return Ok(Settings::default());
        }
        let data = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let entries: BTreeMap<String, String> =
            serde_json::from_str(&data).context("Failed to parse settings file")?;
        Ok(Settings::from_entries(&entries))
    }

    /// Atomic write via temp file + rename.
    fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(&settings.to_entries())?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, data)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to remove {}", self.path.display())),
        }
    }
}
