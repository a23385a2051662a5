use async_trait::async_trait;

use super::types::{Generation, GenerationConfig};
use crate::core::errors::ApiError;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "gemini")
    fn name(&self) -> &str;

    /// single-turn completion (non-streaming)
    async fn generate(&self, prompt: &str, config: GenerationConfig)
        -> Result<Generation, ApiError>;
}
