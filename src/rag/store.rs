//! In-memory embedding stores persisted as a single bincode blob.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use ndarray::{Array2, ArrayView2};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::chunker::TextChunk;
use super::vector_math::{normalize, normalize_rows, score_rows, top_k};
use crate::pdf::ImageMeta;

pub type TextStore = EmbeddingStore<TextChunk>;
pub type ImageStore = EmbeddingStore<ImageMeta>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{items} items but {vectors} embeddings")]
    LengthMismatch { items: usize, vectors: usize },

    #[error("embedding dimension mismatch: expected {expected}, found {found}")]
    Dimension { expected: usize, found: usize },

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to (de)serialize store {path:?}: {reason}")]
    Serialization { path: PathBuf, reason: String },
}

/// Items paired row-for-row with unit-norm embeddings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingStore<T> {
    items: Vec<T>,
    embeddings: Array2<f32>,
}

/// A store item with its similarity to the query.
#[derive(Debug, Clone, Copy)]
pub struct ScoredItem<'a, T> {
    pub item: &'a T,
    pub score: f32,
}

impl<T> EmbeddingStore<T> {
    /// Builds a store from raw model output, normalizing every vector.
    pub fn new(items: Vec<T>, vectors: Vec<Vec<f32>>) -> Result<Self, StoreError> {
        if items.len() != vectors.len() {
            return Err(StoreError::LengthMismatch {
                items: items.len(),
                vectors: vectors.len(),
            });
        }

        let dim = vectors.first().map(Vec::len).unwrap_or(0);
        let mut flat = Vec::with_capacity(vectors.len() * dim);
        for vector in &vectors {
            if vector.len() != dim {
                return Err(StoreError::Dimension {
                    expected: dim,
                    found: vector.len(),
                });
            }
            flat.extend_from_slice(vector);
        }

        let matrix = Array2::from_shape_vec((vectors.len(), dim), flat).map_err(|_| {
            StoreError::Dimension {
                expected: dim,
                found: 0,
            }
        })?;

        Ok(Self {
            items,
            embeddings: normalize_rows(matrix),
        })
    }

    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            embeddings: Array2::zeros((0, 0)),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn embeddings(&self) -> ArrayView2<'_, f32> {
        self.embeddings.view()
    }

    pub fn dimensions(&self) -> usize {
        self.embeddings.ncols()
    }

    /// Exhaustive dot-product scan. The query is normalized here.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredItem<'_, T>>, StoreError> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dimensions() {
            return Err(StoreError::Dimension {
                expected: self.dimensions(),
                found: query.len(),
            });
        }

        let query = normalize(query);
        let scores = score_rows(self.embeddings.view(), query.view());
        Ok(top_k(&scores, k)
            .into_iter()
            .map(|(index, score)| ScoredItem {
                item: &self.items[index],
                score,
            })
            .collect())
    }

    fn check_consistency(&self) -> Result<(), StoreError> {
        if self.items.len() != self.embeddings.nrows() {
            return Err(StoreError::LengthMismatch {
                items: self.items.len(),
                vectors: self.embeddings.nrows(),
            });
        }
        Ok(())
    }
}

impl<T: Serialize + DeserializeOwned> EmbeddingStore<T> {
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        // `path` only ever holds a complete blob.
        let partial_path = partial_path(path);
        let file = File::create(&partial_path).map_err(|source| StoreError::Io {
            path: partial_path.clone(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, self).map_err(|err| StoreError::Serialization {
            path: partial_path.clone(),
            reason: err.to_string(),
        })?;
        writer.flush().map_err(|source| StoreError::Io {
            path: partial_path.clone(),
            source,
        })?;
        drop(writer);

        fs::rename(&partial_path, path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!("Saved {} embeddings to {}", self.len(), path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let file = File::open(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let store: Self = bincode::deserialize_from(BufReader::new(file)).map_err(|err| {
            StoreError::Serialization {
                path: path.to_path_buf(),
                reason: err.to_string(),
            }
        })?;
        store.check_consistency()?;

        tracing::info!("Loaded {} embeddings from {}", store.len(), path.display());
        Ok(store)
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::vector_math::l2_norm;

    fn chunk(id: usize, text: &str) -> TextChunk {
        TextChunk {
            id,
            text: text.to_string(),
            page: 1,
        }
    }

    #[test]
    fn stored_vectors_have_unit_norm() {
        let store = TextStore::new(
            vec![chunk(0, "a"), chunk(1, "b"), chunk(2, "c")],
            vec![vec![3.0, 4.0], vec![10.0, 0.0], vec![0.2, 0.1]],
        )
        .expect("store");

        for row in store.embeddings().rows() {
            assert!((l2_norm(row) - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let result = TextStore::new(vec![chunk(0, "a")], vec![]);
        assert!(matches!(
            result,
            Err(StoreError::LengthMismatch { items: 1, vectors: 0 })
        ));
    }

    #[test]
    fn ragged_vectors_are_rejected() {
        let result = TextStore::new(
            vec![chunk(0, "a"), chunk(1, "b")],
            vec![vec![1.0, 0.0], vec![1.0]],
        );
        assert!(matches!(
            result,
            Err(StoreError::Dimension { expected: 2, found: 1 })
        ));
    }

    #[test]
    fn search_ranks_most_similar_first() {
        let store = TextStore::new(
            vec![chunk(0, "north"), chunk(1, "east"), chunk(2, "north-east")],
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]],
        )
        .expect("store");

        let hits = store.search(&[2.0, 0.0], 2).expect("search");

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].item.id, 0);
        assert!((hits[0].score - 1.0).abs() < 1e-5);
        assert_eq!(hits[1].item.id, 2);
    }

    #[test]
    fn search_rejects_wrong_query_dimension() {
        let store = TextStore::new(vec![chunk(0, "a")], vec![vec![1.0, 0.0]]).expect("store");
        assert!(matches!(
            store.search(&[1.0, 0.0, 0.0], 1),
            Err(StoreError::Dimension { expected: 2, found: 3 })
        ));
    }

    #[test]
    fn empty_store_returns_no_hits() {
        let store = ImageStore::empty();
        assert!(store.search(&[1.0, 0.0], 5).expect("search").is_empty());
    }

    #[test]
    fn blob_survives_save_and_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("stores").join("vector_store.bin");
        let store = TextStore::new(
            vec![chunk(0, "pump"), chunk(1, "valve")],
            vec![vec![0.5, 0.5, 0.0], vec![0.0, 0.0, 2.0]],
        )
        .expect("store");

        store.save(&path).expect("save");
        let loaded = TextStore::load(&path).expect("load");

        assert_eq!(loaded.items(), store.items());
        assert_eq!(loaded.embeddings(), store.embeddings());
    }

    #[test]
    fn corrupt_blob_fails_to_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("vector_store.bin");
        fs::write(&path, b"not a store").expect("write");

        assert!(matches!(
            TextStore::load(&path),
            Err(StoreError::Serialization { .. })
        ));
    }

    #[test]
    fn save_replaces_existing_blob_and_leaves_no_partial_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("vector_store.bin");
        fs::write(&path, b"stale contents").expect("write");

        let store = TextStore::new(vec![chunk(0, "pump")], vec![vec![1.0, 0.0]]).expect("store");
        store.save(&path).expect("save");

        assert!(!dir.path().join("vector_store.bin.part").exists());
        let loaded = TextStore::load(&path).expect("load");
        assert_eq!(loaded.items(), store.items());
    }

    #[test]
    fn leftover_partial_file_does_not_affect_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("vector_store.bin");
        let store = TextStore::new(vec![chunk(0, "valve")], vec![vec![0.0, 1.0]]).expect("store");
        store.save(&path).expect("save");

        fs::write(dir.path().join("vector_store.bin.part"), b"half a blob").expect("write");
        let loaded = TextStore::load(&path).expect("load");
        assert_eq!(loaded.items(), store.items());
    }
}
