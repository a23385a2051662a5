use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::config::EmbeddingConfig;
use crate::core::errors::ApiError;

#[async_trait]
pub trait Embedder: Send + Sync {
    fn model_name(&self) -> &str;

    /// One raw (unnormalized) vector per input, in input order.
    async fn embed_texts(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError>;

    async fn embed_images(&self, paths: &[PathBuf]) -> Result<Vec<Vec<f32>>, ApiError>;
}

/// Client for an OpenAI-compatible `/v1/embeddings` endpoint. Images are
/// sent as base64 data URIs, which CLIP-serving backends accept as input.
#[derive(Clone)]
pub struct HttpEmbedder {
    base_url: String,
    model: String,
    batch_size: usize,
    client: Client,
}

impl HttpEmbedder {
    pub fn new(config: &EmbeddingConfig, model: &str) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(ApiError::internal)?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            batch_size: config.batch_size.max(1),
            client,
        })
    }

    pub fn for_text(config: &EmbeddingConfig) -> Result<Self, ApiError> {
        Self::new(config, &config.text_model)
    }

    pub fn for_images(config: &EmbeddingConfig) -> Result<Self, ApiError> {
        Self::new(config, &config.image_model)
    }

    async fn embed_batched(&self, inputs: Vec<String>) -> Result<Vec<Vec<f32>>, ApiError> {
        let mut embeddings = Vec::with_capacity(inputs.len());
        let total_batches = inputs.len().div_ceil(self.batch_size);

        for (index, batch) in inputs.chunks(self.batch_size).enumerate() {
            tracing::debug!(
                "Embedding batch {}/{} with {}",
                index + 1,
                total_batches,
                self.model
            );
            embeddings.extend(self.request(batch).await?);
        }

        Ok(embeddings)
    }

    async fn request(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let body = json!({
            "model": self.model,
            "input": batch,
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!("Embedding error: {}", text)));
        }

        let payload: Value = res.json().await.map_err(ApiError::upstream)?;
        parse_embeddings(&payload, batch.len())
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed_texts(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        self.embed_batched(inputs.to_vec()).await
    }

    async fn embed_images(&self, paths: &[PathBuf]) -> Result<Vec<Vec<f32>>, ApiError> {
        let mut inputs = Vec::with_capacity(paths.len());
        for path in paths {
            let bytes = tokio::fs::read(path).await.map_err(|err| {
                ApiError::Internal(format!("Failed to read image {}: {}", path.display(), err))
            })?;
            inputs.push(data_uri(path, &bytes));
        }
        self.embed_batched(inputs).await
    }
}

fn data_uri(path: &Path, bytes: &[u8]) -> String {
    let mime = match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "image/png",
    };
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Reads `data[*].embedding`, ordered by `index` when the server sends one.
fn parse_embeddings(payload: &Value, expected: usize) -> Result<Vec<Vec<f32>>, ApiError> {
    let Some(data) = payload["data"].as_array() else {
        return Err(ApiError::Upstream(
            "Embedding response has no data array".to_string(),
        ));
    };

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let Some(values) = item["embedding"].as_array() else {
            return Err(ApiError::Upstream(format!(
                "Embedding response item {} has no embedding",
                position
            )));
        };
        let index = item["index"].as_u64().map(|i| i as usize).unwrap_or(position);
        let vector: Vec<f32> = values
            .iter()
            .filter_map(|v| v.as_f64().map(|f| f as f32))
            .collect();
        indexed.push((index, vector));
    }
    indexed.sort_by_key(|(index, _)| *index);

    if indexed.len() != expected {
        return Err(ApiError::Upstream(format!(
            "Expected {} embeddings, received {}",
            expected,
            indexed.len()
        )));
    }

    Ok(indexed.into_iter().map(|(_, vector)| vector).collect())
}
