//! Startup-time construction of the text and image stores.
//!
//! A store file that already exists is loaded as-is; there is no
//! incremental update. Delete the file to force a rebuild.

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::chunker::split_into_chunks_by_page;
use super::store::{ImageStore, StoreError, TextStore};
use crate::core::config::ChunkingConfig;
use crate::core::errors::ApiError;
use crate::llm::Embedder;
use crate::pdf::{self, PdfError};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Pdf(#[from] PdfError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Embedding failed: {0}")]
    Embedding(#[from] ApiError),
}

pub async fn build_text_store(
    pdf_path: &Path,
    chunking: &ChunkingConfig,
    embedder: &dyn Embedder,
) -> Result<TextStore, BuildError> {
    let pages = pdf::extract_text_by_page(pdf_path)?;
    let chunks = split_into_chunks_by_page(&pages, chunking);
    tracing::info!(
        "Embedding {} chunks from {} pages with {}",
        chunks.len(),
        pages.len(),
        embedder.model_name()
    );

    let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
    let vectors = embedder.embed_texts(&texts).await?;
    Ok(TextStore::new(chunks, vectors)?)
}

/// Image paths are stored relative to `project_root` and resolved against it
/// again for embedding.
pub async fn build_image_store(
    pdf_path: &Path,
    image_dir: &Path,
    project_root: &Path,
    embedder: &dyn Embedder,
) -> Result<ImageStore, BuildError> {
    let images = pdf::extract_images(pdf_path, image_dir, project_root)?;
    if images.is_empty() {
        tracing::warn!("No images extracted from {}", pdf_path.display());
        return Ok(ImageStore::empty());
    }

    tracing::info!(
        "Embedding {} images with {}",
        images.len(),
        embedder.model_name()
    );
    let paths: Vec<PathBuf> = images
        .iter()
        .map(|image| project_root.join(&image.path))
        .collect();
    let vectors = embedder.embed_images(&paths).await?;
    Ok(ImageStore::new(images, vectors)?)
}

pub async fn ensure_text_store(
    store_path: &Path,
    pdf_path: &Path,
    chunking: &ChunkingConfig,
    embedder: &dyn Embedder,
) -> Result<TextStore, BuildError> {
    if !store_path.exists() {
        tracing::info!("Building text vector store...");
        let store = build_text_store(pdf_path, chunking, embedder).await?;
        store.save(store_path)?;
    }

    let store = TextStore::load(store_path)?;
    tracing::info!("Loaded text store ({} chunks)", store.len());
    Ok(store)
}

pub async fn ensure_image_store(
    store_path: &Path,
    pdf_path: &Path,
    image_dir: &Path,
    project_root: &Path,
    embedder: &dyn Embedder,
) -> Result<ImageStore, BuildError> {
    if !store_path.exists() {
        tracing::info!("Building image vector store...");
        let store = build_image_store(pdf_path, image_dir, project_root, embedder).await?;
        store.save(store_path)?;
    }

    let store = ImageStore::load(store_path)?;
    tracing::info!("Loaded image store ({} images)", store.len());
    Ok(store)
}
