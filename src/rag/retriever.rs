use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::store::{ImageStore, StoreError, TextStore};
use crate::core::errors::ApiError;
use crate::llm::Embedder;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub id: usize,
    pub text: String,
    pub page: u32,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedImage {
    pub id: String,
    pub page: u32,
    pub path: String,
    pub filename: String,
    pub score: f32,
}

/// Read-only view over both stores and the models that embedded them.
#[derive(Clone)]
pub struct Retriever {
    text_store: Arc<TextStore>,
    image_store: Arc<ImageStore>,
    text_embedder: Arc<dyn Embedder>,
    image_embedder: Arc<dyn Embedder>,
}

impl Retriever {
    pub fn new(
        text_store: Arc<TextStore>,
        image_store: Arc<ImageStore>,
        text_embedder: Arc<dyn Embedder>,
        image_embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            text_store,
            image_store,
            text_embedder,
            image_embedder,
        }
    }

    pub fn text_count(&self) -> usize {
        self.text_store.len()
    }

    pub fn image_count(&self) -> usize {
        self.image_store.len()
    }

    pub async fn retrieve_text(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, ApiError> {
        if self.text_store.is_empty() {
            return Ok(Vec::new());
        }

        let query_vec = embed_query(self.text_embedder.as_ref(), query).await?;
        let hits = self
            .text_store
            .search(&query_vec, top_k)
            .map_err(store_error)?;

        Ok(hits
            .into_iter()
            .map(|hit| RetrievedChunk {
                id: hit.item.id,
                text: hit.item.text.clone(),
                page: hit.item.page,
                score: hit.score,
            })
            .collect())
    }

    /// Text-to-image search in the CLIP space.
    pub async fn retrieve_images(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedImage>, ApiError> {
        if self.image_store.is_empty() {
            return Ok(Vec::new());
        }

        let query_vec = embed_query(self.image_embedder.as_ref(), query).await?;
        let hits = self
            .image_store
            .search(&query_vec, top_k)
            .map_err(store_error)?;

        Ok(hits
            .into_iter()
            .map(|hit| RetrievedImage {
                id: hit.item.id.clone(),
                page: hit.item.page,
                path: hit.item.path.clone(),
                filename: file_name(&hit.item.path),
                score: hit.score,
            })
            .collect())
    }
}

async fn embed_query(embedder: &dyn Embedder, query: &str) -> Result<Vec<f32>, ApiError> {
    embedder
        .embed_texts(&[query.to_string()])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| {
            ApiError::Upstream(format!(
                "{} returned no embedding for the query",
                embedder.model_name()
            ))
        })
}

fn store_error(err: StoreError) -> ApiError {
    ApiError::internal(err)
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    use std::path::PathBuf;

    use async_trait::async_trait;

    use super::*;
    use crate::pdf::ImageMeta;
    use crate::rag::chunker::TextChunk;

    const DIM: usize = 64;

    /// Bag-of-words hashing embedder.
    struct HashEmbedder;

    fn hash_vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; DIM];
        for word in text.split_whitespace() {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            vector[(hasher.finish() as usize) % DIM] += 1.0;
        }
        vector
    }

    #[async_trait]
    impl Embedder for HashEmbedder {
        fn model_name(&self) -> &str {
            "hash"
        }

        async fn embed_texts(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
            Ok(inputs.iter().map(|text| hash_vector(text)).collect())
        }

        async fn embed_images(&self, paths: &[PathBuf]) -> Result<Vec<Vec<f32>>, ApiError> {
            Ok(paths
                .iter()
                .map(|path| hash_vector(&path.to_string_lossy().replace(['/', '_', '.'], " ")))
                .collect())
        }
    }

    fn texts() -> Vec<&'static str> {
        vec![
            "The battery management system monitors cell voltage",
            "Close the cabinet door before starting the power conversion system",
            "The fire suppression system releases aerosol when smoke is detected",
        ]
    }

    fn retriever() -> Retriever {
        let chunks: Vec<TextChunk> = texts()
            .into_iter()
            .enumerate()
            .map(|(id, text)| TextChunk {
                id,
                text: text.to_string(),
                page: id as u32 + 1,
            })
            .collect();
        let vectors = chunks.iter().map(|c| hash_vector(&c.text)).collect();
        let text_store = TextStore::new(chunks, vectors).expect("text store");

        let images = vec![
            ImageMeta {
                id: "img_0".to_string(),
                page: 4,
                path: "static/images/page4_img0.png".to_string(),
            },
            ImageMeta {
                id: "img_1".to_string(),
                page: 7,
                path: "static/images/page7_img0.jpg".to_string(),
            },
        ];
        let image_vectors = images
            .iter()
            .map(|img| hash_vector(&img.path.replace(['/', '_', '.'], " ")))
            .collect();
        let image_store = ImageStore::new(images, image_vectors).expect("image store");

        Retriever::new(
            Arc::new(text_store),
            Arc::new(image_store),
            Arc::new(HashEmbedder),
            Arc::new(HashEmbedder),
        )
    }

    #[tokio::test]
    async fn identical_query_ranks_chunk_first_with_unit_score() {
        let retriever = retriever();

        for (expected_id, text) in texts().into_iter().enumerate() {
            let hits = retriever.retrieve_text(text, 3).await.expect("retrieve");
            assert_eq!(hits[0].id, expected_id);
            assert!((hits[0].score - 1.0).abs() < 1e-5);
            assert_eq!(hits[0].page, expected_id as u32 + 1);
        }
    }

    #[tokio::test]
    async fn top_k_limits_results_in_descending_order() {
        let hits = retriever()
            .retrieve_text("fire suppression system", 2)
            .await
            .expect("retrieve");

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, 2);
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn image_hits_carry_file_names() {
        let hits = retriever()
            .retrieve_images("page7 img0", 1)
            .await
            .expect("retrieve");

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "img_1");
        assert_eq!(hits[0].filename, "page7_img0.jpg");
    }

    #[tokio::test]
    async fn empty_stores_return_nothing() {
        let retriever = Retriever::new(
            Arc::new(TextStore::empty()),
            Arc::new(ImageStore::empty()),
            Arc::new(HashEmbedder),
            Arc::new(HashEmbedder),
        );

        assert!(retriever.retrieve_text("anything", 5).await.expect("text").is_empty());
        assert!(retriever.retrieve_images("anything", 5).await.expect("images").is_empty());
    }
}
