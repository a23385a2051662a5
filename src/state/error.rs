use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("{0} is not set in the environment or the .env file")]
    MissingCredential(String),

    #[error("Failed to build vector stores: {0}")]
    Stores(#[source] anyhow::Error),

    #[error("Failed to initialize LLM client: {0}")]
    Llm(#[source] anyhow::Error),

    #[error("Failed to initialize embedding client: {0}")]
    Embedding(#[source] anyhow::Error),
}
