//! Embedding providers for the semantic device index.
//!
//! The built-in provider is a deterministic feature-hashing embedder: no
//! model download, no network, stable across runs. A real model can be
//! plugged in behind [`EmbeddingProvider`] without touching the index.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Produces dense embeddings for natural-language text.
pub trait EmbeddingProvider: Send + Sync {
    /// Model name recorded in the collection metadata.
    fn name(&self) -> &str;

    /// Embedding dimension.
    fn dimension(&self) -> usize;

    /// Embed one text.
    fn embed(&self, text: &str) -> Vec<f32>;
}

/// Default embedding dimension.
pub const DEFAULT_DIMENSION: usize = 256;

/// Deterministic feature-hashing embedder over word unigrams and character
/// trigrams, L2-normalised. `DefaultHasher::new()` uses fixed keys, so the
/// same text embeds identically in every process.
pub struct HashEmbedder {
    dimension: usize,
    name: String,
}

impl HashEmbedder {
    /// Embedder with the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            name: format!("hash-ngram-{}", dimension),
        }
    }

    fn bucket(&self, feature: &str) -> (usize, f32) {
        let mut hasher = DefaultHasher::new();
        feature.hash(&mut hasher);
        let h = hasher.finish();
        let index = (h % self.dimension as u64) as usize;
        // One hash bit decides the sign, which keeps unrelated features
        // from only ever adding up.
        let sign = if h & (1 << 63) == 0 { 1.0 } else { -1.0 };
        (index, sign)
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let normalized = text.to_lowercase();

        for token in normalized
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let (index, sign) = self.bucket(token);
            vector[index] += 2.0 * sign;

            let chars: Vec<char> = token.chars().collect();
            if chars.len() >= 3 {
                for trigram in chars.windows(3) {
                    let gram: String = trigram.iter().collect();
                    let (index, sign) = self.bucket(&gram);
                    vector[index] += sign;
                }
            }
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}
