use thiserror::Error;

/// Retrieval-side failures. Callers on the drafting path treat any of these
/// as "no reference context" rather than surfacing them.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("index I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt index record at line {line}: {source}")]
    Corrupt {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("embedding dimension mismatch: index has {expected}, embedder produced {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[cfg(feature = "lancedb")]
    #[error("lancedb error: {0}")]
    Lance(#[from] lancedb::Error),

    #[cfg(feature = "lancedb")]
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("{0}")]
    Other(String),
}
