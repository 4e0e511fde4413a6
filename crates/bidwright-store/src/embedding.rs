//! Embedding functions for the retrieval index.
//!
//! [`HashingEmbedder`] is the zero-configuration default: feature-hashed term
//! frequencies, no model download, no network. Heavier embedders (ONNX
//! sentence-transformers) plug in through the same [`Embed`] trait.

use std::collections::HashMap;

use crate::StoreError;

/// Dimensionality of the default hashing embedder (matches all-MiniLM-L6-v2).
pub const DEFAULT_DIM: usize = 384;

/// Text → dense vector.
pub trait Embed: Send + Sync {
    /// Embed one text into a vector of [`dim`](Self::dim) floats.
    fn embed(&self, text: &str) -> Result<Vec<f32>, StoreError>;

    /// Embed several texts. The default calls [`embed`](Self::embed) per item.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StoreError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn dim(&self) -> usize;

    /// Short identifier stored alongside indexed chunks.
    fn name(&self) -> &str;
}

/// Deterministic bag-of-words embedder.
///
/// Terms are lowercased alphanumeric runs of two or more characters, hashed
/// with FNV-1a into `dim` buckets, weighted by frequency and a length-based
/// IDF proxy, then L2-normalised.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dim: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIM)
    }
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    fn bucket(&self, term: &str) -> usize {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325;
        for b in term.as_bytes() {
            h ^= u64::from(*b);
            h = h.wrapping_mul(0x0000_0100_0000_01b3);
        }
        (h % self.dim as u64) as usize
    }
}

fn terms(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2)
        .map(str::to_lowercase)
}

impl Embed for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, StoreError> {
        let mut counts: HashMap<String, f32> = HashMap::new();
        let mut total = 0.0f32;
        for term in terms(text) {
            *counts.entry(term).or_default() += 1.0;
            total += 1.0;
        }

        let mut v = vec![0.0f32; self.dim];
        if total == 0.0 {
            return Ok(v);
        }

        for (term, count) in &counts {
            let idf = 1.0 + (term.chars().count() as f32).ln();
            v[self.bucket(term)] += (count / total) * idf;
        }
        normalize(&mut v);
        Ok(v)
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn name(&self) -> &str {
        "hashing-tf"
    }
}

/// L2-normalize a vector in place.
pub fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Cosine similarity. Zero vectors score 0 against everything.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na <= f32::EPSILON || nb <= f32::EPSILON {
        0.0
    } else {
        dot / (na * nb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_has_configured_dim_and_unit_norm() {
        let e = HashingEmbedder::new(128);
        let v = e.embed("ISO 27001 certification required").unwrap();
        assert_eq!(v.len(), 128);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5, "expected unit norm, got {norm}");
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let v = HashingEmbedder::default().embed("  ,, ").unwrap();
        assert_eq!(v.len(), DEFAULT_DIM);
        assert!(v.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn deterministic_across_instances() {
        let a = HashingEmbedder::default().embed("social value plan").unwrap();
        let b = HashingEmbedder::default().embed("social value plan").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn case_and_punctuation_insensitive() {
        let e = HashingEmbedder::default();
        let a = e.embed("Net Zero, Carbon Reduction!").unwrap();
        let b = e.embed("net zero carbon reduction").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn related_texts_score_higher() {
        let e = HashingEmbedder::default();
        let hosting = e.embed("cloud hosting services for council data").unwrap();
        let cloud = e.embed("managed cloud hosting and data migration").unwrap();
        let catering = e.embed("school catering and meal provision").unwrap();
        assert!(cosine(&hosting, &cloud) > cosine(&hosting, &catering));
    }

    #[test]
    fn batch_matches_single() {
        let e = HashingEmbedder::default();
        let batch = e.embed_batch(&["alpha beta", "gamma delta"]).unwrap();
        assert_eq!(batch[0], e.embed("alpha beta").unwrap());
        assert_eq!(batch[1], e.embed("gamma delta").unwrap());
    }

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
    }
}
