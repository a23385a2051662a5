//! Append-only chat log stored as one pretty-printed JSON array.
//!
//! The whole file is rewritten on every turn. Writers inside this process
//! are serialized by a mutex; other processes writing the same file are not
//! coordinated.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::core::errors::ApiError;
use crate::rag::{RetrievedChunk, RetrievedImage};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub precision: f64,
    pub recall: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokensUsed {
    pub first_pass: Option<String>,
    pub second_pass: Option<String>,
}

/// One chat turn, whichever path produced the answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub user_query: String,
    pub expanded_query: String,
    #[serde(default)]
    pub retrieved_chunks: Vec<RetrievedChunk>,
    #[serde(default)]
    pub images: Vec<RetrievedImage>,
    pub raw_answer: String,
    pub final_answer: String,
    #[serde(default)]
    pub metrics: Metrics,
    #[serde(default)]
    pub tokens_used: TokensUsed,
}

#[derive(Clone)]
pub struct ChatLog {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl ChatLog {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All readable entries, oldest first. A missing or malformed file is an
    /// empty history.
    pub async fn load(&self) -> Vec<LogEntry> {
        read_raw(&self.path)
            .await
            .into_iter()
            .filter_map(|value| serde_json::from_value(value).ok())
            .collect()
    }

    pub async fn append(&self, entry: &LogEntry) -> Result<(), ApiError> {
        let _guard = self.write_lock.lock().await;

        // Keep entries this build cannot parse instead of dropping them.
        let mut entries = read_raw(&self.path).await;
        entries.push(serde_json::to_value(entry).map_err(ApiError::internal)?);

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(ApiError::internal)?;
        }
        let body = serde_json::to_string_pretty(&entries).map_err(ApiError::internal)?;
        tokio::fs::write(&self.path, body)
            .await
            .map_err(ApiError::internal)?;

        tracing::debug!(
            "Chat log now holds {} entries at {}",
            entries.len(),
            self.path.display()
        );
        Ok(())
    }
}

async fn read_raw(path: &Path) -> Vec<Value> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(err) => {
            tracing::warn!("Unreadable chat log {}: {}", path.display(), err);
            return Vec::new();
        }
    };

    match serde_json::from_str::<Value>(&contents) {
        Ok(Value::Array(entries)) => entries,
        Ok(_) => {
            tracing::warn!("Chat log {} is not a JSON array; starting fresh", path.display());
            Vec::new()
        }
        Err(err) => {
            tracing::warn!("Malformed chat log {}: {}; starting fresh", path.display(), err);
            Vec::new()
        }
    }
}
