use std::path::PathBuf;

use thiserror::Error;

use super::service::AppConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Invalid config at '{path}': {reason}")]
    Invalid { path: String, reason: String },
}

pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    validate_required_string("server.host", &config.server.host)?;
    validate_string_array(
        "server.cors_allowed_origins",
        &config.server.cors_allowed_origins,
    )?;

    validate_required_string("paths.pdf_path", &config.paths.pdf_path)?;
    validate_required_string("paths.text_store", &config.paths.text_store)?;
    validate_required_string("paths.image_store", &config.paths.image_store)?;
    validate_required_string("paths.chat_log", &config.paths.chat_log)?;
    validate_required_string("paths.image_dir", &config.paths.image_dir)?;

    validate_range("chunking.max_chars", config.chunking.max_chars, 1, 1_000_000)?;
    if config.chunking.overlap >= config.chunking.max_chars {
        return Err(invalid(
            "chunking.overlap",
            "must be smaller than chunking.max_chars",
        ));
    }

    validate_range("retrieval.top_k_text", config.retrieval.top_k_text, 1, 1_000)?;
    validate_range(
        "retrieval.top_k_images",
        config.retrieval.top_k_images,
        1,
        1_000,
    )?;
    let threshold = config.retrieval.relevance_threshold;
    if !(-1.0..=1.0).contains(&threshold) {
        return Err(invalid(
            "retrieval.relevance_threshold",
            "must be between -1.0 and 1.0",
        ));
    }

    validate_required_string("llm.base_url", &config.llm.base_url)?;
    validate_required_string("llm.model", &config.llm.model)?;
    validate_required_string("llm.api_key_env", &config.llm.api_key_env)?;
    validate_range("llm.timeout_secs", config.llm.timeout_secs as usize, 1, 86_400)?;

    validate_required_string("embedding.base_url", &config.embedding.base_url)?;
    validate_required_string("embedding.text_model", &config.embedding.text_model)?;
    validate_required_string("embedding.image_model", &config.embedding.image_model)?;
    validate_range("embedding.batch_size", config.embedding.batch_size, 1, 4_096)?;
    validate_range(
        "embedding.timeout_secs",
        config.embedding.timeout_secs as usize,
        1,
        86_400,
    )?;

    if config.history.timezone_offset_hours.abs() > 14 {
        return Err(invalid(
            "history.timezone_offset_hours",
            "must be between -14 and 14",
        ));
    }

    Ok(())
}

fn validate_range(path: &str, value: usize, min: usize, max: usize) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(invalid(
            path,
            &format!("must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

fn validate_required_string(path: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(invalid(path, "value cannot be empty"));
    }
    Ok(())
}

fn validate_string_array(path: &str, items: &[String]) -> Result<(), ConfigError> {
    for (index, item) in items.iter().enumerate() {
        if item.trim().is_empty() {
            return Err(invalid(
                &format!("{}[{}]", path, index),
                "value cannot be empty",
            ));
        }
    }
    Ok(())
}

fn invalid(path: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}
