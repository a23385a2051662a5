use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::LlmProvider;
use super::types::{Generation, GenerationConfig};
use crate::core::config::LlmConfig;
use crate::core::errors::ApiError;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Google Gemini `generateContent` over REST.
#[derive(Clone)]
pub struct GeminiProvider {
    base_url: String,
    model: String,
    api_key: String,
    client: Client,
}

impl GeminiProvider {
    pub fn new(config: &LlmConfig, api_key: String) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(ApiError::internal)?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(
        &self,
        prompt: &str,
        config: GenerationConfig,
    ) -> Result<Generation, ApiError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = json!({
            "contents": [
                { "role": "user", "parts": [{ "text": prompt }] }
            ],
            "generationConfig": {
                "temperature": config.temperature,
                "maxOutputTokens": config.max_output_tokens,
            },
        });

        let res = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "Gemini error ({}): {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::upstream)?;
        tracing::debug!(
            "Gemini finish reason: {}",
            payload["candidates"][0]["finishReason"]
                .as_str()
                .unwrap_or("unknown")
        );

        Ok(parse_generation(&payload))
    }
}

/// Concatenates the text parts of the first candidate. A response without
/// candidates (e.g. safety-blocked) yields empty text.
fn parse_generation(payload: &Value) -> Generation {
    let text = payload["candidates"][0]["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part["text"].as_str())
                .collect::<String>()
        })
        .unwrap_or_default();

    Generation {
        text,
        usage: payload.get("usageMetadata").cloned(),
    }
}
