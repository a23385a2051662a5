pub mod paths;
pub mod service;
pub mod validation;

pub use paths::AppPaths;
pub use service::{
    AppConfig, ChunkingConfig, EmbeddingConfig, HistoryConfig, LlmConfig, PathsConfig,
    RetrievalConfig, ServerConfig,
};
pub use validation::ConfigError;
