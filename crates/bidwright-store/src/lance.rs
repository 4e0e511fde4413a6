//! LanceDB backend for the retrieval index.
//!
//! One table, `reference_chunks`, holding chunk text, its parent document,
//! opaque metadata (as a JSON string), and a fixed-size embedding column
//! searched by cosine distance.

use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, FixedSizeListBuilder, Float32Builder, LargeStringArray, RecordBatchIterator,
    StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use tokio::sync::Mutex;
use tracing::info;

use crate::chunk::{ChunkSpec, chunk_text};
use crate::embedding::Embed;
use crate::index::chunk_id;
use crate::{ReferenceMeta, Retriever, StoreError};

const REFERENCE_CHUNKS_TABLE: &str = "reference_chunks";

/// LanceDB-backed [`Retriever`].
///
/// Lance handles concurrent readers itself; appends go through a local mutex
/// so create-if-missing can't race.
pub struct LanceStore {
    db: lancedb::Connection,
    embedder: Arc<dyn Embed>,
    spec: ChunkSpec,
    write_lock: Mutex<()>,
}

impl LanceStore {
    /// Connect to a LanceDB database at the given path.
    ///
    /// Creates the database directory if it doesn't exist.
    pub async fn open(
        path: &Path,
        embedder: Arc<dyn Embed>,
        spec: ChunkSpec,
    ) -> Result<Self, StoreError> {
        let uri = path
            .to_str()
            .ok_or_else(|| StoreError::Other("non-UTF8 database path".into()))?;
        let db = lancedb::connect(uri).execute().await?;
        Ok(Self {
            db,
            embedder,
            spec,
            write_lock: Mutex::new(()),
        })
    }

    async fn has_table(&self) -> Result<bool, StoreError> {
        let names = self.db.table_names().execute().await?;
        Ok(names.iter().any(|n| n == REFERENCE_CHUNKS_TABLE))
    }

    /// Count stored chunks (0 when the table hasn't been created yet).
    pub async fn count(&self) -> Result<usize, StoreError> {
        if !self.has_table().await? {
            return Ok(0);
        }
        let table = self.db.open_table(REFERENCE_CHUNKS_TABLE).execute().await?;
        Ok(table.count_rows(None).await?)
    }

    fn schema(&self) -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("document_id", DataType::Utf8, false),
            Field::new("chunk_index", DataType::UInt32, false),
            Field::new("text", DataType::Utf8, false),
            Field::new("metadata", DataType::Utf8, true),
            Field::new(
                "embedding",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    self.embedder.dim() as i32,
                ),
                true,
            ),
        ]))
    }

    fn build_batch(
        &self,
        meta: &ReferenceMeta,
        texts: &[&str],
        embeddings: &[Vec<f32>],
    ) -> Result<RecordBatch, StoreError> {
        let n = texts.len();
        let ids: Vec<String> = (0..n).map(|i| chunk_id(&meta.id, i)).collect();
        let metadata = serde_json::to_string(&meta.attributes)?;

        let mut emb_builder =
            FixedSizeListBuilder::new(Float32Builder::new(), self.embedder.dim() as i32);
        for emb in embeddings {
            if emb.len() != self.embedder.dim() {
                return Err(StoreError::DimensionMismatch {
                    expected: self.embedder.dim(),
                    actual: emb.len(),
                });
            }
            emb_builder.values().append_slice(emb);
            emb_builder.append(true);
        }

        let columns: Vec<Arc<dyn Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(StringArray::from(vec![meta.id.as_str(); n])),
            Arc::new(UInt32Array::from_iter_values(0..n as u32)),
            Arc::new(StringArray::from(texts.to_vec())),
            Arc::new(StringArray::from(vec![metadata.as_str(); n])),
            Arc::new(emb_builder.finish()),
        ];
        Ok(RecordBatch::try_new(self.schema(), columns)?)
    }
}

#[async_trait]
impl Retriever for LanceStore {
    async fn add(&self, text: &str, meta: ReferenceMeta) -> Result<usize, StoreError> {
        let texts = chunk_text(text, self.spec);
        if texts.is_empty() {
            return Ok(0);
        }
        let embeddings = self.embedder.embed_batch(&texts)?;
        let batch = self.build_batch(&meta, &texts, &embeddings)?;
        let rows = batch.num_rows();
        let reader = RecordBatchIterator::new(vec![Ok(batch)], self.schema());

        let _guard = self.write_lock.lock().await;
        if self.has_table().await? {
            let table = self.db.open_table(REFERENCE_CHUNKS_TABLE).execute().await?;
            table.add(Box::new(reader)).execute().await?;
        } else {
            self.db
                .create_table(REFERENCE_CHUNKS_TABLE, Box::new(reader))
                .execute()
                .await?;
        }

        info!(document = %meta.id, chunks = rows, "indexed reference document in LanceDB");
        Ok(rows)
    }

    async fn query(&self, text: &str, k: usize) -> Result<Vec<String>, StoreError> {
        if k == 0 || self.count().await? == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(text)?;
        let table = self.db.open_table(REFERENCE_CHUNKS_TABLE).execute().await?;
        let batches: Vec<RecordBatch> = table
            .vector_search(query_vector.as_slice())?
            .distance_type(lancedb::DistanceType::Cosine)
            .limit(k)
            .execute()
            .await?
            .try_collect()
            .await?;

        let mut texts = Vec::new();
        for batch in &batches {
            texts.extend(extract_texts(batch)?);
        }
        texts.truncate(k);
        Ok(texts)
    }
}

/// Pull the `text` column out of a result batch (Utf8 or LargeUtf8).
fn extract_texts(batch: &RecordBatch) -> Result<Vec<String>, StoreError> {
    let col = batch
        .column_by_name("text")
        .ok_or_else(|| StoreError::Other("missing 'text' column".into()))?;
    if let Some(arr) = col.as_any().downcast_ref::<StringArray>() {
        Ok((0..arr.len()).map(|i| arr.value(i).to_string()).collect())
    } else if let Some(arr) = col.as_any().downcast_ref::<LargeStringArray>() {
        Ok((0..arr.len()).map(|i| arr.value(i).to_string()).collect())
    } else {
        Err(StoreError::Other(format!(
            "unexpected text column type: {:?}",
            col.data_type()
        )))
    }
}
