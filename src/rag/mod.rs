//! Retrieval pipeline over the manual.
//!
//! - `chunker`: splits page text into retrieval units
//! - `store`: normalized embedding matrices with their items
//! - `builder`: builds or loads the stores at startup
//! - `retriever`: query-time top-k search

pub mod builder;
pub mod chunker;
pub mod retriever;
pub mod store;
pub mod vector_math;

pub use chunker::TextChunk;
pub use retriever::{RetrievedChunk, RetrievedImage, Retriever};
pub use store::{EmbeddingStore, ImageStore, StoreError, TextStore};
