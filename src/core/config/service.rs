use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::paths::discover_project_root;
use super::validation::{validate_config, ConfigError};

const DEFAULT_CONFIG_FILE: &str = "config.yml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub paths: PathsConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Empty means any origin.
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub pdf_path: String,
    pub text_store: String,
    pub image_store: String,
    pub chat_log: String,
    pub image_dir: String,
    pub log_dir: String,
    pub env_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            pdf_path: "AmpD Enertainer User Manual (NCM) - Rev 2.3.pdf".to_string(),
            text_store: "vector_store.bin".to_string(),
            image_store: "image_store.bin".to_string(),
            chat_log: "chat_logs.json".to_string(),
            image_dir: "static/images".to_string(),
            log_dir: "logs".to_string(),
            env_file: ".env".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub max_chars: usize,
    /// Characters of the previous segment carried into the next one
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: 1500,
            overlap: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k_text: usize,
    pub top_k_images: usize,
    /// Score at or above which a retrieved chunk counts as relevant
    pub relevance_threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k_text: 10,
            top_k_images: 5,
            relevance_threshold: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the provider credential
    pub api_key_env: String,
    pub timeout_secs: u64,
    /// Document title quoted in the draft prompt
    pub manual_title: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key_env: "GOOGLE_API_KEY".to_string(),
            timeout_secs: 120,
            manual_title: "AmpD Enertainer User Manual (NCM)".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// OpenAI-compatible embedding server
    pub base_url: String,
    pub text_model: String,
    pub image_model: String,
    pub batch_size: usize,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8090".to_string(),
            text_model: "all-MiniLM-L6-v2".to_string(),
            image_model: "clip-ViT-B-32".to_string(),
            batch_size: 32,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub timezone_offset_hours: i32,
    pub timezone_label: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            timezone_offset_hours: 8,
            timezone_label: "HKT".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads `config.yml` (or `MANUAL_RAG_CONFIG`), applies environment
    /// overrides and validates the result.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&config_path())?;
        if let Some(port) = env::var("PORT").ok().and_then(|val| val.parse::<u16>().ok()) {
            config.server.port = port;
        }
        validate_config(&config)?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config at {}; using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|err| ConfigError::Read {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;

        // An empty file deserializes to unit, not a mapping.
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&contents).map_err(|err| ConfigError::Read {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })
    }
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = env::var("MANUAL_RAG_CONFIG") {
        return PathBuf::from(path);
    }

    discover_project_root().join(DEFAULT_CONFIG_FILE)
}

/// Reads the provider credential, loading `env_file` into the process
/// environment first. Variables already set take precedence.
pub fn load_api_key(env_file: &Path, var_name: &str) -> Option<String> {
    match dotenvy::from_path(env_file) {
        Ok(()) => tracing::debug!("Loaded environment from {}", env_file.display()),
        Err(err) => tracing::debug!("No env file at {}: {}", env_file.display(), err),
    }

    env::var(var_name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
