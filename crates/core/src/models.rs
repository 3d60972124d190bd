use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFingerprint {
    pub document_id: String,
    pub document_title: String,
    pub source_path: String,
    pub checksum: String,
    pub page_count: u32,
    pub ingested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub source: String,
    pub page_number: u32,
    pub total_pages: u32,
}

/// Text of one PDF page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub metadata: DocumentMetadata,
}

/// Retrieval unit cut from a [`Document`].
///
/// `text` is always the verbatim slice `page_text[start..start + text.len()]`
/// of the page it was cut from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub document_id: String,
    pub source: String,
    pub page_number: u32,
    pub chunk_index: u64,
    pub start: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub chunk: Chunk,
    pub distance: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub question: String,
    pub text: String,
    pub context: Vec<SearchHit>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DistanceMetric {
    #[default]
    Euclidean,
    Cosine,
}

impl DistanceMetric {
    pub fn distance(self, left: &[f32], right: &[f32]) -> f32 {
        match self {
            Self::Euclidean => left
                .iter()
                .zip(right)
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f32>()
                .sqrt(),
            Self::Cosine => {
                let dot = left.iter().zip(right).map(|(a, b)| a * b).sum::<f32>();
                let left_norm = left.iter().map(|value| value * value).sum::<f32>().sqrt();
                let right_norm = right.iter().map(|value| value * value).sum::<f32>().sqrt();
                if left_norm == 0.0 || right_norm == 0.0 {
                    1.0
                } else {
                    1.0 - dot / (left_norm * right_norm)
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            chunk_size: 1_000,
            chunk_overlap: 200,
        }
    }
}
