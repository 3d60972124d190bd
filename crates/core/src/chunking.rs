use crate::error::IngestError;
use crate::models::{Chunk, Document, IngestionOptions};
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::ops::Range;

pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Splits text on a ladder of separators, falling back to finer separators
/// only for pieces that are still longer than `chunk_size` characters.
///
/// Pieces are tracked as byte spans of the input, so every emitted chunk is a
/// verbatim substring of its source text.
#[derive(Debug, Clone)]
pub struct RecursiveCharacterSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveCharacterSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, IngestError> {
        if chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "chunk overlap {chunk_overlap} must be smaller than chunk size {chunk_size}"
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn with_separators(mut self, separators: &[&str]) -> Self {
        self.separators = separators.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Returns `(byte_offset, chunk_text)` pairs in source order.
    pub fn split_text<'a>(&self, text: &'a str) -> Vec<(usize, &'a str)> {
        self.split_spans(text, 0..text.len(), &self.separators)
            .into_iter()
            .map(|span| (span.start, &text[span]))
            .collect()
    }

    pub fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut cursor = 0u64;

        for document in documents {
            let document_id = document_id(&document.metadata.source);
            let before = chunks.len();

            for (start, text) in self.split_text(&document.text) {
                chunks.push(Chunk {
                    chunk_id: make_chunk_id(
                        &document_id,
                        document.metadata.page_number,
                        cursor,
                        text,
                    ),
                    document_id: document_id.clone(),
                    source: document.metadata.source.clone(),
                    page_number: document.metadata.page_number,
                    chunk_index: cursor,
                    start,
                    text: text.to_string(),
                });
                cursor = cursor.saturating_add(1);
            }

            tracing::debug!(
                page = document.metadata.page_number,
                chunk_count = chunks.len() - before,
                "split page"
            );
        }

        chunks
    }

    fn split_spans(
        &self,
        text: &str,
        span: Range<usize>,
        separators: &[String],
    ) -> Vec<Range<usize>> {
        let segment = &text[span.clone()];

        let mut separator = "";
        let mut finer: &[String] = &[];
        for (position, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                break;
            }
            if segment.contains(candidate.as_str()) {
                separator = candidate.as_str();
                finer = &separators[position + 1..];
                break;
            }
        }

        let mut result = Vec::new();
        let mut small = Vec::new();

        for piece in split_on(segment, separator, span.start) {
            if char_len(text, &piece) < self.chunk_size {
                small.push(piece);
                continue;
            }

            if !small.is_empty() {
                result.extend(self.merge_spans(text, &small));
                small.clear();
            }

            if finer.is_empty() {
                result.push(piece);
            } else {
                result.extend(self.split_spans(text, piece, finer));
            }
        }

        if !small.is_empty() {
            result.extend(self.merge_spans(text, &small));
        }

        result
    }

    fn merge_spans(&self, text: &str, pieces: &[Range<usize>]) -> Vec<Range<usize>> {
        let mut merged = Vec::new();
        let mut window: VecDeque<Range<usize>> = VecDeque::new();

        for piece in pieces {
            if let Some(current) = window_span(&window) {
                if char_len(text, &(current.start..piece.end)) > self.chunk_size {
                    push_trimmed(text, current, &mut merged);

                    while let Some(current) = window_span(&window) {
                        let kept = char_len(text, &current);
                        let extended = char_len(text, &(current.start..piece.end));
                        if kept > self.chunk_overlap || extended > self.chunk_size {
                            window.pop_front();
                        } else {
                            break;
                        }
                    }
                }
            }
            window.push_back(piece.clone());
        }

        if let Some(current) = window_span(&window) {
            push_trimmed(text, current, &mut merged);
        }

        merged
    }
}

impl TryFrom<&IngestionOptions> for RecursiveCharacterSplitter {
    type Error = IngestError;

    fn try_from(value: &IngestionOptions) -> Result<Self, Self::Error> {
        Self::new(value.chunk_size, value.chunk_overlap)
    }
}

fn split_on(segment: &str, separator: &str, offset: usize) -> Vec<Range<usize>> {
    if separator.is_empty() {
        return segment
            .char_indices()
            .map(|(index, ch)| offset + index..offset + index + ch.len_utf8())
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (index, matched) in segment.match_indices(separator) {
        if index > start {
            pieces.push(offset + start..offset + index);
        }
        start = index + matched.len();
    }
    if start < segment.len() {
        pieces.push(offset + start..offset + segment.len());
    }
    pieces
}

fn window_span(window: &VecDeque<Range<usize>>) -> Option<Range<usize>> {
    match (window.front(), window.back()) {
        (Some(first), Some(last)) => Some(first.start..last.end),
        _ => None,
    }
}

fn push_trimmed(text: &str, span: Range<usize>, out: &mut Vec<Range<usize>>) {
    let slice = &text[span.clone()];
    let without_leading = slice.trim_start();
    let trimmed = without_leading.trim_end();
    if trimmed.is_empty() {
        return;
    }
    let start = span.start + (slice.len() - without_leading.len());
    out.push(start..start + trimmed.len());
}

fn char_len(text: &str, span: &Range<usize>) -> usize {
    text[span.clone()].chars().count()
}

pub(crate) fn document_id(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn make_chunk_id(document_id: &str, page: u32, index: u64, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document_id.as_bytes());
    hasher.update(page.to_le_bytes());
    hasher.update(index.to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentMetadata;
    use proptest::prelude::*;

    fn page(text: &str, page_number: u32) -> Document {
        Document {
            text: text.to_string(),
            metadata: DocumentMetadata {
                source: "/tmp/minutes.pdf".to_string(),
                page_number,
                total_pages: 2,
            },
        }
    }

    fn texts(splitter: &RecursiveCharacterSplitter, text: &str) -> Vec<String> {
        splitter
            .split_text(text)
            .into_iter()
            .map(|(_, chunk)| chunk.to_string())
            .collect()
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        assert!(matches!(
            RecursiveCharacterSplitter::new(100, 100),
            Err(IngestError::InvalidChunkConfig(_))
        ));
        assert!(matches!(
            RecursiveCharacterSplitter::new(0, 0),
            Err(IngestError::InvalidChunkConfig(_))
        ));
    }

    #[test]
    fn defaults_match_ingestion_options() {
        let splitter = RecursiveCharacterSplitter::try_from(&IngestionOptions::default())
            .expect("default options are valid");
        assert_eq!(splitter.chunk_size(), 1_000);
        assert_eq!(splitter.chunk_overlap(), 200);
    }

    #[test]
    fn short_text_is_a_single_trimmed_chunk() {
        let splitter = RecursiveCharacterSplitter::new(100, 10).expect("valid config");
        let chunks = splitter.split_text("  The committee met on Tuesday.\n");
        assert_eq!(chunks, vec![(2, "The committee met on Tuesday.")]);
    }

    #[test]
    fn words_merge_with_overlap() {
        let splitter = RecursiveCharacterSplitter::new(10, 4).expect("valid config");
        assert_eq!(
            texts(&splitter, "one two three four five"),
            vec!["one two", "two three", "four five"]
        );
    }

    #[test]
    fn paragraphs_are_preferred_boundaries() {
        let splitter = RecursiveCharacterSplitter::new(30, 0).expect("valid config");
        let text = "Agenda item one is budget.\n\nAgenda item two is hiring.";
        assert_eq!(
            texts(&splitter, text),
            vec!["Agenda item one is budget.", "Agenda item two is hiring."]
        );
    }

    #[test]
    fn unbroken_text_falls_back_to_characters() {
        let splitter = RecursiveCharacterSplitter::new(4, 1).expect("valid config");
        let chunks = texts(&splitter, "abcdefghij");
        assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 4));
        assert_eq!(chunks.first().map(String::as_str), Some("abcd"));
        assert_eq!(chunks.last().map(|chunk| chunk.ends_with('j')), Some(true));
    }

    #[test]
    fn custom_separators_replace_the_ladder() {
        let splitter = RecursiveCharacterSplitter::new(10, 0)
            .expect("valid config")
            .with_separators(&["|", ""]);
        assert_eq!(
            texts(&splitter, "alpha|beta|gamma"),
            vec!["alpha|beta", "gamma"]
        );
    }

    #[test]
    fn blank_text_has_no_chunks() {
        let splitter = RecursiveCharacterSplitter::new(10, 2).expect("valid config");
        assert!(splitter.split_text(" \n\n \n").is_empty());
    }

    #[test]
    fn documents_keep_page_metadata_and_global_index() {
        let splitter = RecursiveCharacterSplitter::new(12, 0).expect("valid config");
        let documents = vec![page("alpha beta gamma", 1), page("delta", 2)];

        let chunks = splitter.split_documents(&documents);

        assert_eq!(chunks.len(), 3);
        assert_eq!(
            chunks.iter().map(|chunk| chunk.chunk_index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(chunks[0].page_number, 1);
        assert_eq!(chunks[2].page_number, 2);
        assert_eq!(chunks[2].text, "delta");
        assert_eq!(chunks[0].document_id, chunks[2].document_id);
        assert_ne!(chunks[0].chunk_id, chunks[1].chunk_id);
    }

    #[test]
    fn splitting_is_deterministic() {
        let splitter = RecursiveCharacterSplitter::new(16, 5).expect("valid config");
        let documents = vec![page("Minutes of the fourth meeting.\nAttendees: all.", 1)];
        assert_eq!(
            splitter.split_documents(&documents),
            splitter.split_documents(&documents)
        );
    }

    proptest! {
        #[test]
        fn chunks_are_substrings_that_cover_all_visible_text(
            text in "[a-zA-Z0-9 \n\u{e9}]{0,400}",
            chunk_size in 2usize..60,
            overlap_ratio in 0.0f64..0.9,
        ) {
            let overlap = ((chunk_size as f64) * overlap_ratio) as usize;
            let splitter = RecursiveCharacterSplitter::new(chunk_size, overlap).expect("valid config");
            let chunks = splitter.split_text(&text);

            let mut covered = vec![false; text.len()];
            let mut previous_start = None;
            for (start, chunk) in &chunks {
                prop_assert_eq!(&text[*start..*start + chunk.len()], *chunk);
                prop_assert!(chunk.chars().count() <= chunk_size);
                prop_assert!(previous_start.map_or(true, |prev| prev <= *start));
                previous_start = Some(*start);
                for flag in &mut covered[*start..*start + chunk.len()] {
                    *flag = true;
                }
            }

            for (index, ch) in text.char_indices() {
                if !ch.is_whitespace() {
                    prop_assert!(covered[index], "byte {} ({:?}) not covered", index, ch);
                }
            }
        }
    }
}
