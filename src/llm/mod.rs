pub mod embedder;
pub mod gemini;
pub mod provider;
pub mod types;

pub use embedder::{Embedder, HttpEmbedder};
pub use gemini::GeminiProvider;
pub use provider::LlmProvider;
pub use types::{Generation, GenerationConfig};
