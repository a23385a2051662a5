use std::sync::Arc;

use crate::core::config::{service::load_api_key, AppConfig, AppPaths};
use crate::generation::{Generator, GeneratorSettings};
use crate::history::ChatLog;
use crate::llm::{GeminiProvider, HttpEmbedder, LlmProvider};
use crate::rag::builder::{ensure_image_store, ensure_text_store};
use crate::rag::Retriever;

pub mod error;

use error::InitializationError;

/// Application state shared across all routes.
///
/// Stores are built once at startup and are read-only afterwards.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub paths: Arc<AppPaths>,
    pub generator: Generator,
}

impl AppState {
    /// Initializes the application state.
    ///
    /// 1. Reads the LLM credential (fatal when absent)
    /// 2. Builds the embedding and LLM clients
    /// 3. Loads the text and image stores, building them from the PDF if missing
    pub async fn initialize(
        config: AppConfig,
        paths: AppPaths,
    ) -> Result<Arc<Self>, InitializationError> {
        let api_key = load_api_key(&paths.env_file, &config.llm.api_key_env)
            .ok_or_else(|| InitializationError::MissingCredential(config.llm.api_key_env.clone()))?;

        let provider = GeminiProvider::new(&config.llm, api_key)
            .map_err(|e| InitializationError::Llm(e.into()))?;
        let text_embedder = Arc::new(
            HttpEmbedder::for_text(&config.embedding)
                .map_err(|e| InitializationError::Embedding(e.into()))?,
        );
        let image_embedder = Arc::new(
            HttpEmbedder::for_images(&config.embedding)
                .map_err(|e| InitializationError::Embedding(e.into()))?,
        );

        let text_store = ensure_text_store(
            &paths.text_store,
            &paths.pdf_path,
            &config.chunking,
            text_embedder.as_ref(),
        )
        .await
        .map_err(|e| InitializationError::Stores(e.into()))?;
        let image_store = ensure_image_store(
            &paths.image_store,
            &paths.pdf_path,
            &paths.image_dir,
            &paths.project_root,
            image_embedder.as_ref(),
        )
        .await
        .map_err(|e| InitializationError::Stores(e.into()))?;

        let retriever = Retriever::new(
            Arc::new(text_store),
            Arc::new(image_store),
            text_embedder,
            image_embedder,
        );

        Ok(Self::from_parts(config, paths, Arc::new(provider), retriever))
    }

    /// Assembles state from already-built components.
    pub fn from_parts(
        config: AppConfig,
        paths: AppPaths,
        provider: Arc<dyn LlmProvider>,
        retriever: Retriever,
    ) -> Arc<Self> {
        let chat_log = ChatLog::new(paths.chat_log.clone());
        let settings = GeneratorSettings::from_config(&config);
        let generator = Generator::new(provider, retriever, chat_log, settings);

        Arc::new(Self {
            config: Arc::new(config),
            paths: Arc::new(paths),
            generator,
        })
    }

    pub fn chat_log(&self) -> &ChatLog {
        self.generator.chat_log()
    }

    pub fn retriever(&self) -> &Retriever {
        self.generator.retriever()
    }
}
