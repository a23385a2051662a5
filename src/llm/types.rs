use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sampling settings for one generation call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl GenerationConfig {
    pub const fn new(temperature: f32, max_output_tokens: u32) -> Self {
        Self {
            temperature,
            max_output_tokens,
        }
    }
}

/// Text returned by the provider together with its raw usage metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Generation {
    pub text: String,
    pub usage: Option<Value>,
}

impl Generation {
    /// Trimmed text, or `None` when the model returned nothing usable.
    pub fn trimmed_text(&self) -> Option<&str> {
        let text = self.text.trim();
        (!text.is_empty()).then_some(text)
    }
}
