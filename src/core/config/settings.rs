//! Typed settings, as read from `config.yml`.
//!
//! Every section and field is optional in the file; anything left out takes
//! the default below.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub llm: LlmConfig,
    pub memory: MemoryConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding the prebuilt `index.json`.
    pub index_dir: PathBuf,
    /// Directory holding the built web app (`index.html` and assets).
    pub static_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            index_dir: PathBuf::from("vector_index"),
            static_dir: PathBuf::from("web_build"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_base: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub temperature: f64,
    /// Number of documents handed to the prompt per question.
    pub retriever_k: usize,
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: "https://generativelanguage.googleapis.com".to_string(),
            embedding_model: "models/embedding-001".to_string(),
            chat_model: "models/gemini-1.5-pro-latest".to_string(),
            temperature: 0.7,
            retriever_k: 4,
            request_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Question/answer turns kept per session.
    pub window: usize,
    pub session_ttl_secs: u64,
    pub max_sessions: usize,
    pub sweep_interval_secs: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            window: 5,
            session_ttl_secs: 3600,
            max_sessions: 10_000,
            sweep_interval_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Empty means any origin.
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// When set, logs are also written to a daily rolling file here.
    pub dir: Option<PathBuf>,
}
