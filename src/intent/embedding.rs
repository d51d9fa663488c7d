//! Hash-bucket text embeddings.
//!
//! Each token is hashed into one of [`EMBEDDING_DIMENSIONS`] buckets and the
//! bucket counts are L2-normalized. Cheap and deterministic across processes,
//! which is all the cross-thread merge needs.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const EMBEDDING_DIMENSIONS: usize = 8;

/// Fixed-length, L2-normalized vector. The zero vector stands for "no tokens".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    /// Wrap an existing vector as-is.
    pub fn from_vector(values: Vec<f32>) -> Self {
        Embedding(values)
    }

    pub fn zero() -> Self {
        Embedding(vec![0.0; EMBEDDING_DIMENSIONS])
    }

    /// Embed the tokens of all given texts together.
    pub fn from_texts<'a, I>(texts: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut buckets = vec![0.0f32; EMBEDDING_DIMENSIONS];
        for text in texts {
            for token in embedding_tokens(text) {
                buckets[bucket_for(&token)] += 1.0;
            }
        }

        let mut embedding = Embedding(buckets);
        embedding.normalize();
        embedding
    }

    pub fn values(&self) -> &[f32] {
        &self.0
    }

    pub fn magnitude(&self) -> f32 {
        self.0.iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    pub fn is_zero(&self) -> bool {
        self.magnitude() == 0.0
    }

    fn normalize(&mut self) {
        let magnitude = self.magnitude();
        if magnitude > 0.0 {
            for value in &mut self.0 {
                *value /= magnitude;
            }
        }
    }

    /// Cosine similarity; 0 on dimension mismatch or when either side is zero.
    pub fn cosine_similarity(&self, other: &Embedding) -> f32 {
        if self.0.len() != other.0.len() {
            return 0.0;
        }

        let (left, right) = (self.magnitude(), other.magnitude());
        if left == 0.0 || right == 0.0 {
            return 0.0;
        }

        let dot: f32 = self.0.iter().zip(&other.0).map(|(a, b)| a * b).sum();
        dot / (left * right)
    }
}

/// Lowercase tokens split on whitespace and punctuation.
pub fn embedding_tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Stable bucket: first eight SHA-256 bytes, big-endian, modulo the dimension.
fn bucket_for(token: &str) -> usize {
    let digest = Sha256::digest(token.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(prefix) % EMBEDDING_DIMENSIONS as u64) as usize
}
