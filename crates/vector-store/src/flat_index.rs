use crate::embeddings::EmbeddingModel;
use crate::error::{Result, VectorStoreError};
use std::collections::BTreeMap;

/// Brute-force cosine distance index keyed by insertion sequence
pub struct FlatIndex {
    dimension: usize,
    vectors: BTreeMap<u64, Vec<f32>>,
}

impl FlatIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: BTreeMap::new(),
        }
    }

    /// Add vector to index
    pub fn add(&mut self, seq: u64, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(VectorStoreError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        self.vectors.insert(seq, vector.to_vec());
        Ok(())
    }

    pub fn remove(&mut self, seq: u64) {
        self.vectors.remove(&seq);
    }

    /// k nearest neighbours as `(seq, distance)`, ascending distance.
    /// Equal distances keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(u64, f32)>> {
        if query.len() != self.dimension {
            return Err(VectorStoreError::InvalidDimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut scores: Vec<(u64, f32)> = self
            .vectors
            .iter()
            .map(|(seq, vector)| (*seq, cosine_distance(query, vector)))
            .collect();

        scores.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scores.truncate(k);

        Ok(scores)
    }

    /// Get number of vectors in index
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Clear all vectors
    pub fn clear(&mut self) {
        self.vectors.clear();
    }
}

/// `1 - cos(a, b)`; zero vectors are at distance 1 from everything
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - EmbeddingModel::cosine_similarity(a, b)
}
