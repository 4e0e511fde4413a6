//! Retrieval layer: reference-document chunking, embeddings, and similarity search.
//!
//! The default backend is [`VectorStore`], a JSON Lines index that needs no
//! native toolchain. The `lancedb` feature adds [`LanceStore`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod chunk;
pub mod embedding;
mod error;
mod index;

pub use chunk::{ChunkSpec, chunk_text};
pub use embedding::{Embed, HashingEmbedder};
pub use error::StoreError;
pub use index::{ChunkRecord, VectorStore};

#[cfg(feature = "lancedb")]
mod lance;
#[cfg(feature = "lancedb")]
pub use lance::LanceStore;

/// Caller-supplied description of a reference document.
///
/// Only `id` is interpreted (it prefixes chunk identifiers); everything in
/// `attributes` is stored verbatim with each chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceMeta {
    pub id: String,
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl ReferenceMeta {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: serde_json::Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }
}

/// A k-nearest-neighbour index over reference chunks.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Chunk, embed, and persist `text`. Returns the number of chunks stored.
    async fn add(&self, text: &str, meta: ReferenceMeta) -> Result<usize, StoreError>;

    /// The `k` stored chunks nearest to `text`, nearest first.
    ///
    /// An empty index yields an empty list, never an error.
    async fn query(&self, text: &str, k: usize) -> Result<Vec<String>, StoreError>;
}
