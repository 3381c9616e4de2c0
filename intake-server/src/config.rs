// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Intake Server Configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: HttpServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub llm: LLMConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpServerConfig {
    /// HTTP listen address (e.g., "127.0.0.1:8000")
    #[serde(default = "default_http_addr")]
    pub listen_addr: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    /// On-disk sled tree under `data_dir`
    #[default]
    Sled,
    /// Volatile, lost on restart
    Memory,
}

impl std::str::FromStr for StorageBackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sled" => Ok(Self::Sled),
            "memory" => Ok(Self::Memory),
            other => anyhow::bail!("unknown storage backend: {}", other),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackendKind,

    /// Path to the sled data directory
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LLMConfig {
    /// Completion API key. Chat is disabled without one.
    pub api_key: Option<String>,

    /// OpenAI-compatible API base URL (defaults to api.openai.com)
    pub base_url: Option<String>,

    /// Model requested for every relayed chat
    #[serde(default = "default_chat_model")]
    pub model: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

// Default values
fn default_http_addr() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./intake-data")
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_http_addr(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendKind::default(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: default_chat_model(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ServerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with priority: env > file > defaults
    pub fn load(config_file: Option<PathBuf>) -> Result<Self> {
        let mut config = if let Some(path) = config_file {
            if path.exists() {
                tracing::info!("Loading configuration from file: {:?}", path);
                Self::from_file(&path)?
            } else {
                tracing::warn!("Config file not found: {:?}, using defaults", path);
                Self::default()
            }
        } else {
            Self::default()
        };

        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Override fields whose environment variable is set
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup("INTAKE_HTTP_ADDR") {
            self.server.listen_addr = addr;
        }

        if let Some(backend) = lookup("INTAKE_STORAGE_BACKEND") {
            match backend.parse() {
                Ok(kind) => self.storage.backend = kind,
                Err(e) => tracing::warn!("Ignoring INTAKE_STORAGE_BACKEND: {}", e),
            }
        }

        if let Some(data_dir) = lookup("INTAKE_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(data_dir);
        }

        if let Some(json) = lookup("INTAKE_LOG_JSON") {
            match parse_flag(&json) {
                Some(flag) => self.logging.json = flag,
                None => tracing::warn!("Ignoring INTAKE_LOG_JSON: unrecognized value {:?}", json),
            }
        }

        // LLM configuration
        if let Some(key) = lookup("OPENAI_API_KEY").filter(|k| !k.is_empty()) {
            self.llm.api_key = Some(key);
        }

        if let Some(base_url) = lookup("OPENAI_BASE_URL") {
            self.llm.base_url = Some(base_url);
        }

        if let Some(model) = lookup("INTAKE_CHAT_MODEL") {
            self.llm.model = model;
        }
    }

    /// Parse listen address as SocketAddr
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(self.server.listen_addr.parse()?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;

        if self.llm.model.trim().is_empty() {
            anyhow::bail!("llm.model must not be empty");
        }

        if self.storage.backend == StorageBackendKind::Sled && !self.storage.data_dir.exists() {
            std::fs::create_dir_all(&self.storage.data_dir)?;
        }

        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
