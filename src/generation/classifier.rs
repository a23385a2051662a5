use super::prompts::classification_prompt;
use crate::core::errors::ApiError;
use crate::llm::{GenerationConfig, LlmProvider};

const CLASSIFY_CONFIG: GenerationConfig = GenerationConfig::new(0.0, 10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryIntent {
    Manual,
    Casual,
    Blocked,
}

impl QueryIntent {
    /// Anything other than the three labels counts as a manual question.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "casual" => Self::Casual,
            "blocked" => Self::Blocked,
            _ => Self::Manual,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Casual => "casual",
            Self::Blocked => "blocked",
        }
    }
}

pub async fn classify(provider: &dyn LlmProvider, query: &str) -> Result<QueryIntent, ApiError> {
    let generation = provider
        .generate(&classification_prompt(query), CLASSIFY_CONFIG)
        .await?;
    Ok(QueryIntent::parse(&generation.text))
}
