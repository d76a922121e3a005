use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ParleyError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub chat: ChatSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub model: String,
    pub api_key_env: String,
    pub base_url: Option<String>,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// Backing file for the session collection. Falls back to `~/.parley/sessions.json`.
    pub sessions_file: Option<PathBuf>,
    /// How many sessions the switch picker offers.
    pub recent_sessions: usize,
    /// Header shown above assistant replies.
    pub assistant_name: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "claude-3-5-sonnet-latest".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: None,
            max_tokens: 1024,
        }
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            sessions_file: None,
            recent_sessions: 10,
            assistant_name: "Claude".to_string(),
        }
    }
}

impl Settings {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("parley")
            .join("config.toml")
    }

    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Read settings from `path`. A missing or unreadable file yields defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Ignoring invalid config {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Could not read config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Get the API key from the environment variable specified in settings.
    pub fn api_key(&self) -> Result<String> {
        match std::env::var(&self.llm.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ParleyError::Config(format!(
                "{} not found in environment variables",
                self.llm.api_key_env
            ))),
        }
    }

    pub fn sessions_file(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.chat.sessions_file {
            return Ok(path.clone());
        }
        let home = dirs::home_dir().ok_or_else(|| {
            ParleyError::Config("Could not determine home directory".to_string())
        })?;
        Ok(home.join(".parley").join("sessions.json"))
    }

    /// Build the streaming client for the configured model.
    pub fn build_llm_client(&self) -> Result<crate::llm::ClaudeClient> {
        let mut client = crate::llm::ClaudeClient::new(self.api_key()?)
            .with_model(&self.llm.model)
            .with_max_tokens(self.llm.max_tokens);
        if let Some(ref url) = self.llm.base_url {
            client = client.with_base_url(url);
        }
        Ok(client)
    }
}
