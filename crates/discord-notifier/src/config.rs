use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::options::RawOptions;

const DEFAULT_CONFIG_NAME: &str = "discord-notifier.toml";
pub const DEFAULT_API_BASE: &str = "https://discordapp.com/api/v6";

#[derive(Debug, Deserialize)]
pub struct Config {
    pub agent: RawOptions,
    #[serde(default)]
    pub transport: TransportSettings,
    #[serde(default)]
    pub store: StoreSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransportSettings {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Whole-request timeout. Unset means the client default (none).
    pub timeout_secs: Option<u64>,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            timeout_secs: None,
        }
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

/// JSON-lines files backing the event store and agent log.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreSettings {
    pub events: Option<PathBuf>,
    pub logs: Option<PathBuf>,
}

impl StoreSettings {
    pub fn events_path(&self) -> PathBuf {
        self.events
            .clone()
            .unwrap_or_else(|| default_store_dir().join("events.jsonl"))
    }

    pub fn logs_path(&self) -> PathBuf {
        self.logs
            .clone()
            .unwrap_or_else(|| default_store_dir().join("agent-log.jsonl"))
    }
}

fn default_store_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("discord-notifier")
}

impl Config {
    /// Load configuration from an explicit path, or search upward from current dir.
    pub fn load(path_override: Option<PathBuf>) -> Result<Self> {
        let path = match path_override {
            Some(p) => p,
            None => find_upwards(DEFAULT_CONFIG_NAME)
                .context("Failed to locate discord-notifier.toml in current or parent directories")?,
        };

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Reading config file {}", path.display()))?;
        Self::from_toml(&contents).with_context(|| format!("Parsing TOML config {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

fn find_upwards(file_name: &str) -> Option<PathBuf> {
    let mut dir = std::env::current_dir().ok()?;
    loop {
        let candidate = dir.join(file_name);
        if candidate.exists() {
            return Some(candidate);
        }
        if !dir.pop() {
            break;
        }
    }
    None
}
