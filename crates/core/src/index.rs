use crate::models::{Chunk, DistanceMetric, SearchHit};
use crate::traits::VectorIndex;
use crate::SearchError;

/// Exact nearest-neighbour index over chunk embeddings, built once and never
/// mutated afterwards.
#[derive(Debug, Clone)]
pub struct InMemoryIndex {
    entries: Vec<(Chunk, Vec<f32>)>,
    dimensions: usize,
    metric: DistanceMetric,
}

impl InMemoryIndex {
    pub fn build(
        entries: Vec<(Chunk, Vec<f32>)>,
        metric: DistanceMetric,
    ) -> Result<Self, SearchError> {
        let dimensions = entries.first().map(|(_, vector)| vector.len()).unwrap_or(0);

        for (position, (_, vector)) in entries.iter().enumerate() {
            if vector.len() != dimensions {
                return Err(SearchError::InconsistentDimensions {
                    position,
                    expected: dimensions,
                    actual: vector.len(),
                });
            }
        }

        tracing::debug!(entry_count = entries.len(), dimensions, ?metric, "built index");

        Ok(Self {
            entries,
            dimensions,
            metric,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Returns up to `k` chunks by non-decreasing distance; ties keep
    /// insertion order.
    pub fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<SearchHit>, SearchError> {
        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }

        if query_vector.len() != self.dimensions {
            return Err(SearchError::DimensionMismatch {
                expected: self.dimensions,
                actual: query_vector.len(),
            });
        }

        let mut scored = self
            .entries
            .iter()
            .map(|(chunk, vector)| (chunk, self.metric.distance(query_vector, vector)))
            .collect::<Vec<_>>();

        scored.sort_by(|left, right| left.1.total_cmp(&right.1));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(chunk, distance)| SearchHit {
                chunk: chunk.clone(),
                distance,
            })
            .collect())
    }
}

impl VectorIndex for InMemoryIndex {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn search_vector(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchHit>, SearchError> {
        self.search(query_vector, top_k)
    }
}
