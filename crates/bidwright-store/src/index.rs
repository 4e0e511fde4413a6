//! Disk-backed vector index over reference-document chunks.
//!
//! Records live in an append-only JSON Lines file (`chunks.jsonl`) inside
//! the index directory and are loaded into memory on open. Queries are a
//! brute-force cosine scan, which is plenty for a few thousand proposals.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::chunk::{ChunkSpec, chunk_text};
use crate::embedding::{Embed, HashingEmbedder, cosine};
use crate::{ReferenceMeta, Retriever, StoreError};

const CHUNKS_FILE: &str = "chunks.jsonl";

/// One stored chunk. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: String,
    pub document_id: String,
    pub chunk_index: usize,
    pub text: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub embedding: Vec<f32>,
    pub embedder: String,
    /// RFC 3339 timestamp.
    pub ingested_at: String,
}

/// Persistent similarity index.
///
/// Safe to share behind an `Arc`: writers are serialized by the inner
/// `RwLock`, which is held across the file append so partial lines from two
/// concurrent `add`s can never interleave.
pub struct VectorStore {
    file: PathBuf,
    embedder: Arc<dyn Embed>,
    spec: ChunkSpec,
    chunks: RwLock<Vec<ChunkRecord>>,
}

impl VectorStore {
    /// Open (or create) an index directory with the default hashing embedder.
    pub async fn open(dir: &Path) -> Result<Self, StoreError> {
        Self::open_with(dir, Arc::new(HashingEmbedder::default()), ChunkSpec::default()).await
    }

    /// Open (or create) an index directory with a specific embedder and chunking.
    ///
    /// Fails with [`StoreError::DimensionMismatch`] if the directory was
    /// built with an embedder of a different dimensionality.
    pub async fn open_with(
        dir: &Path,
        embedder: Arc<dyn Embed>,
        spec: ChunkSpec,
    ) -> Result<Self, StoreError> {
        tokio::fs::create_dir_all(dir).await?;
        let file = dir.join(CHUNKS_FILE);

        let chunks = match tokio::fs::read_to_string(&file).await {
            Ok(raw) => {
                let (chunks, valid_len) = parse_records(&raw)?;
                repair_tail(&file, &raw, valid_len).await?;
                chunks
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        if let Some(first) = chunks.first()
            && first.embedding.len() != embedder.dim()
        {
            return Err(StoreError::DimensionMismatch {
                expected: first.embedding.len(),
                actual: embedder.dim(),
            });
        }

        info!(
            path = %file.display(),
            chunks = chunks.len(),
            embedder = embedder.name(),
            "opened retrieval index"
        );
        Ok(Self {
            file,
            embedder,
            spec,
            chunks: RwLock::new(chunks),
        })
    }

    pub fn path(&self) -> &Path {
        &self.file
    }

    /// Number of stored chunks.
    pub async fn len(&self) -> usize {
        self.chunks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.chunks.read().await.is_empty()
    }

    /// Embed off the async runtime; ONNX embedders are CPU-heavy.
    async fn embed_all(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, StoreError> {
        let embedder = Arc::clone(&self.embedder);
        tokio::task::spawn_blocking(move || {
            let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
            embedder.embed_batch(&refs)
        })
        .await
        .map_err(|e| StoreError::Embedding(format!("embedding task failed: {e}")))?
    }
}

#[async_trait]
impl Retriever for VectorStore {
    async fn add(&self, text: &str, meta: ReferenceMeta) -> Result<usize, StoreError> {
        let pieces: Vec<String> = chunk_text(text, self.spec)
            .into_iter()
            .map(str::to_string)
            .collect();
        if pieces.is_empty() {
            return Ok(0);
        }

        let embeddings = self.embed_all(pieces.clone()).await?;
        let ingested_at = Utc::now().to_rfc3339();

        let records: Vec<ChunkRecord> = pieces
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(chunk_index, (text, embedding))| ChunkRecord {
                id: chunk_id(&meta.id, chunk_index),
                document_id: meta.id.clone(),
                chunk_index,
                text,
                metadata: meta.attributes.clone(),
                embedding,
                embedder: self.embedder.name().to_string(),
                ingested_at: ingested_at.clone(),
            })
            .collect();

        let mut buf = Vec::new();
        for record in &records {
            serde_json::to_writer(&mut buf, record)?;
            buf.push(b'\n');
        }

        let mut chunks = self.chunks.write().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file)
            .await?;
        let start = file.metadata().await?.len();
        if let Err(e) = append(&mut file, &buf).await {
            // Leave no partial line behind for the next append to land on.
            if let Err(trunc) = file.set_len(start).await {
                warn!(error = %trunc, "could not roll back partial index append");
            }
            return Err(e.into());
        }

        let added = records.len();
        chunks.extend(records);
        info!(document = %meta.id, chunks = added, "indexed reference document");
        Ok(added)
    }

    async fn query(&self, text: &str, k: usize) -> Result<Vec<String>, StoreError> {
        if k == 0 || self.is_empty().await {
            return Ok(Vec::new());
        }

        let query = self
            .embed_all(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Embedding("embedder returned no vector".into()))?;

        let chunks = self.chunks.read().await;
        let mut scored: Vec<(f32, &ChunkRecord)> = chunks
            .iter()
            .map(|c| (cosine(&query, &c.embedding), c))
            .collect();
        // Stable sort: equal scores keep insertion order.
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(_, c)| c.text.clone())
            .collect())
    }
}

/// `doc_<id>_<chunk>_<8 hex>`; the suffix only avoids collisions on re-ingest.
pub(crate) fn chunk_id(document_id: &str, chunk_index: usize) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("doc_{document_id}_{chunk_index}_{}", &suffix[..8])
}

async fn append(file: &mut tokio::fs::File, buf: &[u8]) -> std::io::Result<()> {
    file.write_all(buf).await?;
    file.flush().await
}

/// Parse the JSONL body. A torn final line (crash mid-append) is dropped;
/// corruption anywhere else is an error.
///
/// Also returns the byte length of the intact prefix: everything up to and
/// including the last line that parsed.
fn parse_records(raw: &str) -> Result<(Vec<ChunkRecord>, usize), StoreError> {
    let lines: Vec<(usize, usize, &str)> = raw
        .split_inclusive('\n')
        .scan(0, |end, line| {
            *end += line.len();
            Some((*end, line))
        })
        .enumerate()
        .filter(|(_, (_, l))| !l.trim().is_empty())
        .map(|(line_no, (end, l))| (line_no, end, l))
        .collect();
    let last = lines.len().saturating_sub(1);

    let mut records = Vec::with_capacity(lines.len());
    let mut valid_len = 0;
    for (pos, (line_no, end, line)) in lines.into_iter().enumerate() {
        match serde_json::from_str::<ChunkRecord>(line) {
            Ok(r) => {
                records.push(r);
                valid_len = end;
            }
            Err(e) if pos == last => {
                warn!(line = line_no + 1, error = %e, "dropping torn trailing index record");
            }
            Err(source) => {
                return Err(StoreError::Corrupt {
                    line: line_no + 1,
                    source,
                });
            }
        }
    }
    Ok((records, valid_len))
}

/// Cut a dropped torn tail off the file and make sure the intact prefix
/// ends in a newline, so the next append starts on a fresh line.
async fn repair_tail(file: &Path, raw: &str, valid_len: usize) -> Result<(), StoreError> {
    let needs_newline = valid_len > 0 && !raw[..valid_len].ends_with('\n');
    if valid_len == raw.len() && !needs_newline {
        return Ok(());
    }

    let mut handle = tokio::fs::OpenOptions::new().write(true).open(file).await?;
    if valid_len < raw.len() {
        handle.set_len(valid_len as u64).await?;
        warn!(
            path = %file.display(),
            kept_bytes = valid_len,
            dropped_bytes = raw.len() - valid_len,
            "truncated torn index tail"
        );
    }
    if needs_newline {
        handle.seek(std::io::SeekFrom::End(0)).await?;
        handle.write_all(b"\n").await?;
    }
    handle.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn meta(id: &str) -> ReferenceMeta {
        ReferenceMeta::new(id)
    }

    #[tokio::test]
    async fn query_on_empty_store_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = VectorStore::open(tmp.path()).await.unwrap();
        let hits = store.query("anything at all", 3).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn add_then_query_returns_overlapping_chunk() {
        let tmp = TempDir::new().unwrap();
        let store = VectorStore::open(tmp.path()).await.unwrap();
        store.add("alpha beta gamma", meta("p1")).await.unwrap();

        let hits = store.query("alpha beta gamma", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].contains("alpha beta gamma"));
    }

    #[tokio::test]
    async fn nearest_chunk_ranks_first() {
        let tmp = TempDir::new().unwrap();
        let store = VectorStore::open(tmp.path()).await.unwrap();
        store
            .add("school catering and hot meal provision", meta("catering"))
            .await
            .unwrap();
        store
            .add("cloud hosting and data centre migration", meta("hosting"))
            .await
            .unwrap();

        let hits = store.query("cloud hosting migration", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].contains("cloud hosting"));
    }

    #[tokio::test]
    async fn k_larger_than_store_returns_everything() {
        let tmp = TempDir::new().unwrap();
        let store = VectorStore::open(tmp.path()).await.unwrap();
        store.add("one document", meta("a")).await.unwrap();
        assert_eq!(store.query("document", 10).await.unwrap().len(), 1);
        assert!(store.query("document", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn long_document_is_chunked() {
        let tmp = TempDir::new().unwrap();
        let store = VectorStore::open(tmp.path()).await.unwrap();
        let text = "word ".repeat(410); // 2050 chars
        let added = store.add(&text, meta("long")).await.unwrap();
        assert_eq!(added, 3);
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn empty_document_adds_nothing() {
        let tmp = TempDir::new().unwrap();
        let store = VectorStore::open(tmp.path()).await.unwrap();
        assert_eq!(store.add("", meta("empty")).await.unwrap(), 0);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn survives_reopen() {
        let tmp = TempDir::new().unwrap();
        {
            let store = VectorStore::open(tmp.path()).await.unwrap();
            store
                .add("net zero carbon reduction plan", meta("nz"))
                .await
                .unwrap();
        }
        let store = VectorStore::open(tmp.path()).await.unwrap();
        assert_eq!(store.len().await, 1);
        let hits = store.query("carbon reduction", 1).await.unwrap();
        assert_eq!(hits, vec!["net zero carbon reduction plan".to_string()]);
    }

    #[tokio::test]
    async fn records_carry_metadata_and_unique_ids() {
        let tmp = TempDir::new().unwrap();
        let store = VectorStore::open(tmp.path()).await.unwrap();
        let mut m = meta("p7");
        m.attributes.insert("source".into(), "winning.txt".into());
        store.add("first", m.clone()).await.unwrap();
        store.add("first", m).await.unwrap();

        let chunks = store.chunks.read().await;
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].id.starts_with("doc_p7_0_"));
        assert_ne!(chunks[0].id, chunks[1].id);
        assert_eq!(chunks[0].metadata["source"], "winning.txt");
        assert_eq!(chunks[0].embedder, "hashing-tf");
    }

    #[tokio::test]
    async fn deterministic_results_for_static_corpus() {
        let tmp = TempDir::new().unwrap();
        let store = VectorStore::open(tmp.path()).await.unwrap();
        for (i, t) in ["security vetting", "security clearance", "payroll services"]
            .iter()
            .enumerate()
        {
            store.add(t, meta(&i.to_string())).await.unwrap();
        }
        let a = store.query("security", 3).await.unwrap();
        let b = store.query("security", 3).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn concurrent_adds_do_not_corrupt_index() {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(VectorStore::open(tmp.path()).await.unwrap());

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let text = format!("proposal number {i} ").repeat(80);
                store.add(&text, ReferenceMeta::new(format!("c{i}"))).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        let total = store.len().await;
        drop(store);

        let reopened = VectorStore::open(tmp.path()).await.unwrap();
        assert_eq!(reopened.len().await, total);
    }

    #[tokio::test]
    async fn torn_trailing_line_is_dropped() {
        let tmp = TempDir::new().unwrap();
        {
            let store = VectorStore::open(tmp.path()).await.unwrap();
            store.add("intact record", meta("ok")).await.unwrap();
        }
        let file = tmp.path().join(CHUNKS_FILE);
        let mut raw = std::fs::read_to_string(&file).unwrap();
        raw.push_str("{\"id\": \"doc_torn");
        std::fs::write(&file, raw).unwrap();

        let store = VectorStore::open(tmp.path()).await.unwrap();
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn adds_after_torn_tail_survive_reopen() {
        let tmp = TempDir::new().unwrap();
        {
            let store = VectorStore::open(tmp.path()).await.unwrap();
            store.add("intact record", meta("ok")).await.unwrap();
        }
        let file = tmp.path().join(CHUNKS_FILE);
        let mut raw = std::fs::read_to_string(&file).unwrap();
        raw.push_str("{\"id\": \"doc_torn");
        std::fs::write(&file, raw).unwrap();

        {
            let store = VectorStore::open(tmp.path()).await.unwrap();
            assert_eq!(store.len().await, 1);
            store.add("second record", meta("two")).await.unwrap();
            store.add("third record", meta("three")).await.unwrap();
            assert_eq!(store.len().await, 3);
        }

        let store = VectorStore::open(tmp.path()).await.unwrap();
        assert_eq!(store.len().await, 3);
        let raw = std::fs::read_to_string(&file).unwrap();
        assert!(!raw.contains("doc_torn"));
        assert_eq!(raw.lines().count(), 3);
    }

    #[tokio::test]
    async fn record_missing_final_newline_gets_one() {
        let tmp = TempDir::new().unwrap();
        {
            let store = VectorStore::open(tmp.path()).await.unwrap();
            store.add("no newline", meta("a")).await.unwrap();
        }
        let file = tmp.path().join(CHUNKS_FILE);
        let raw = std::fs::read_to_string(&file).unwrap();
        std::fs::write(&file, raw.trim_end()).unwrap();

        {
            let store = VectorStore::open(tmp.path()).await.unwrap();
            store.add("after repair", meta("b")).await.unwrap();
        }
        let store = VectorStore::open(tmp.path()).await.unwrap();
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn mid_file_corruption_is_an_error() {
        let tmp = TempDir::new().unwrap();
        {
            let store = VectorStore::open(tmp.path()).await.unwrap();
            store.add("good", meta("a")).await.unwrap();
        }
        let file = tmp.path().join(CHUNKS_FILE);
        let raw = std::fs::read_to_string(&file).unwrap();
        std::fs::write(&file, format!("garbage\n{raw}")).unwrap();

        let result = VectorStore::open(tmp.path()).await;
        assert!(matches!(result, Err(StoreError::Corrupt { line: 1, .. })));
    }

    #[tokio::test]
    async fn dimension_mismatch_detected_on_open() {
        let tmp = TempDir::new().unwrap();
        {
            let store = VectorStore::open(tmp.path()).await.unwrap();
            store.add("sixty four", meta("d")).await.unwrap();
        }
        let result = VectorStore::open_with(
            tmp.path(),
            Arc::new(HashingEmbedder::new(64)),
            ChunkSpec::default(),
        )
        .await;
        assert!(matches!(
            result,
            Err(StoreError::DimensionMismatch {
                expected: 384,
                actual: 64
            })
        ));
    }
}
