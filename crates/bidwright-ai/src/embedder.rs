//! ONNX Runtime sentence embedder for the retrieval index.
//!
//! Mean-pooled all-MiniLM-L6-v2 (384 dimensions), a drop-in replacement for
//! the hashing embedder. The model directory must contain `model.onnx` and
//! `tokenizer.json`.

use std::path::Path;
use std::sync::Mutex;

use bidwright_store::embedding::normalize;
use bidwright_store::{Embed, StoreError};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::info;

/// Tokens kept per chunk (MiniLM's trained maximum).
const MAX_TOKENS: usize = 256;

fn embedding_error(context: &str, e: impl std::fmt::Display) -> StoreError {
    StoreError::Embedding(format!("{context}: {e}"))
}

/// Sentence-transformers model behind the [`Embed`] trait.
///
/// Inference needs `&mut Session`, so the session sits behind a mutex; the
/// index calls the embedder from blocking worker threads.
pub struct OnnxEmbedder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    dim: usize,
}

impl OnnxEmbedder {
    /// Load from a directory containing `model.onnx` and `tokenizer.json`.
    pub fn load(model_dir: &Path) -> Result<Self, StoreError> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");
        for required in [&model_path, &tokenizer_path] {
            if !required.exists() {
                return Err(StoreError::Embedding(format!(
                    "{} not found",
                    required.display()
                )));
            }
        }

        let session = Session::builder()
            .map_err(|e| embedding_error("create session", e))?
            .commit_from_file(&model_path)
            .map_err(|e| embedding_error("load model", e))?;
        let dim = infer_dim(session.outputs()[0].dtype()).unwrap_or(384);

        let mut tokenizer =
            Tokenizer::from_file(&tokenizer_path).map_err(|e| embedding_error("load tokenizer", e))?;
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: MAX_TOKENS,
                ..Default::default()
            }))
            .map_err(|e| embedding_error("set truncation", e))?;
        tokenizer.with_padding(Some(tokenizers::PaddingParams::default()));

        info!(dim, model = %model_path.display(), "loaded ONNX embedding model");
        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            dim,
        })
    }

    fn run_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StoreError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| embedding_error("tokenize", e))?;
        let batch = encodings.len();
        let seq_len = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0);

        // Row-major [batch, seq_len] inputs; padding positions stay zero.
        let mut ids = vec![0i64; batch * seq_len];
        let mut mask = vec![0i64; batch * seq_len];
        let mut type_ids = vec![0i64; batch * seq_len];
        for (row, enc) in encodings.iter().enumerate() {
            let base = row * seq_len;
            let cols = enc
                .get_ids()
                .iter()
                .zip(enc.get_attention_mask())
                .zip(enc.get_type_ids());
            for (col, ((&id, &m), &t)) in cols.enumerate() {
                ids[base + col] = i64::from(id);
                mask[base + col] = i64::from(m);
                type_ids[base + col] = i64::from(t);
            }
        }

        let shape = [batch as i64, seq_len as i64];
        let tensor = |data: Vec<i64>| {
            Tensor::from_array((shape, data.into_boxed_slice()))
                .map_err(|e| embedding_error("build input tensor", e))
        };
        let inputs = ort::inputs![
            "input_ids" => tensor(ids)?,
            "attention_mask" => tensor(mask.clone())?,
            "token_type_ids" => tensor(type_ids)?,
        ];

        let mut session = self
            .session
            .lock()
            .map_err(|_| StoreError::Embedding("ONNX session lock poisoned".into()))?;
        let outputs = session
            .run(inputs)
            .map_err(|e| embedding_error("inference", e))?;
        let (out_shape, hidden) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| embedding_error("read output", e))?;
        let out_shape: &[i64] = out_shape;
        if out_shape.len() != 3 || out_shape[0] as usize != batch || out_shape[2] as usize != self.dim {
            return Err(StoreError::Embedding(format!(
                "unexpected output shape {out_shape:?}, expected [{batch}, {seq_len}, {}]",
                self.dim
            )));
        }
        let out_seq = out_shape[1] as usize;

        Ok((0..batch)
            .map(|row| mean_pool(hidden, &mask[row * seq_len..(row + 1) * seq_len], row, out_seq, self.dim))
            .collect())
    }
}

/// Attention-masked mean over token vectors, L2-normalised.
fn mean_pool(hidden: &[f32], mask: &[i64], row: usize, seq: usize, dim: usize) -> Vec<f32> {
    let mut pooled = vec![0.0f32; dim];
    let mut tokens = 0.0f32;
    for (pos, &m) in mask.iter().enumerate().take(seq) {
        if m == 0 {
            continue;
        }
        let offset = (row * seq + pos) * dim;
        for (p, h) in pooled.iter_mut().zip(&hidden[offset..offset + dim]) {
            *p += h;
        }
        tokens += 1.0;
    }
    if tokens > 0.0 {
        pooled.iter_mut().for_each(|p| *p /= tokens);
    }
    normalize(&mut pooled);
    pooled
}

impl Embed for OnnxEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, StoreError> {
        self.run_batch(&[text])?
            .pop()
            .ok_or_else(|| StoreError::Embedding("model returned no embedding".into()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StoreError> {
        self.run_batch(texts)
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn name(&self) -> &str {
        "all-MiniLM-L6-v2"
    }
}

/// Last dimension of the model's first output, when static.
fn infer_dim(output_type: &ort::value::ValueType) -> Option<usize> {
    match output_type {
        ort::value::ValueType::Tensor { shape, .. } => {
            shape.last().and_then(|&d| (d > 0).then_some(d as usize))
        }
        _ => None,
    }
}
