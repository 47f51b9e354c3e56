//! Feature-hashed bag-of-words embeddings with cosine similarity.

use serde::{Deserialize, Serialize};

/// Default dimensionality of the hashed feature space.
pub const DEFAULT_DIMENSIONS: u32 = 1024;

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "it", "in", "on", "of", "to", "and", "or", "for", "with", "this",
    "that", "be", "are", "was", "were", "been", "being", "have", "has", "had", "do", "does",
    "did", "will", "would", "could", "should", "may", "might", "can", "shall", "not", "no",
    "but", "if", "at", "by", "from", "as", "into", "about", "up", "out", "so", "its", "you",
    "your", "i", "my", "we", "our", "they", "them", "their", "he", "she", "his", "her",
];

/// Sparse vector with strictly increasing indices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    pub indices: Vec<u32>,
    pub values: Vec<f32>,
}

impl SparseVector {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn norm(&self) -> f32 {
        self.values.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    pub fn dot(&self, other: &SparseVector) -> f32 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }
}

/// Cosine similarity; zero when either side is empty.
pub fn cosine_similarity(a: &SparseVector, b: &SparseVector) -> f32 {
    let (norm_a, norm_b) = (a.norm(), b.norm());
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        a.dot(b) / (norm_a * norm_b)
    }
}

/// Turns text into vectors for similarity search.
pub trait Embedder: Send + Sync {
    /// Stable identifier stored alongside the index; a mismatch forces re-indexing.
    fn id(&self) -> String;

    fn embed(&self, text: &str) -> SparseVector;
}

/// Stop-word-filtered term frequencies hashed into a fixed number of buckets.
#[derive(Debug, Clone, Copy)]
pub struct HashingEmbedder {
    dimensions: u32,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

impl HashingEmbedder {
    pub fn new(dimensions: u32) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn dimensions(&self) -> u32 {
        self.dimensions
    }
}

impl Embedder for HashingEmbedder {
    fn id(&self) -> String {
        format!("hashing-fnv1a-{}", self.dimensions)
    }

    fn embed(&self, text: &str) -> SparseVector {
        let mut counts = std::collections::BTreeMap::<u32, f32>::new();
        for token in tokenize(text) {
            let bucket = (fnv1a(token.as_bytes()) % u64::from(self.dimensions)) as u32;
            *counts.entry(bucket).or_insert(0.0) += 1.0;
        }

        let mut vector = SparseVector {
            indices: counts.keys().copied().collect(),
            values: counts.into_values().collect(),
        };
        let norm = vector.norm();
        if norm > 0.0 {
            vector.values.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

/// Lowercase, split on non-alphanumerics, drop single chars and stop words.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 1)
        .filter(|w| !STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, &b| (hash ^ u64::from(b)).wrapping_mul(PRIME))
}
