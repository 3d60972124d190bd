pub mod cache;
pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod index;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod prompt;
pub mod providers;
pub mod query_loop;
pub mod traits;

#[cfg(test)]
mod test_support;

pub use cache::CacheBackedEmbedder;
pub use chunking::{RecursiveCharacterSplitter, DEFAULT_SEPARATORS};
pub use config::{ChatPdfConfig, EmbeddingProvider, DEFAULT_PDF_PATH, DEFAULT_TOP_K};
pub use embeddings::{CharacterNgramEmbedder, Embedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{EmbeddingError, IngestError, LlmError, PipelineError, SearchError};
pub use extractor::{load_pdf, LopdfExtractor, PdfExtractor};
pub use index::InMemoryIndex;
pub use ingest::{digest_file, ingest_pdf, IngestionReport};
pub use models::{
    Answer, Chunk, DistanceMetric, Document, DocumentFingerprint, DocumentMetadata,
    IngestionOptions, SearchHit,
};
pub use orchestrator::ChatPdf;
pub use prompt::{build_prompt, PromptBuilder};
pub use providers::{GeminiChat, GeminiConfig, GeminiEmbedder};
pub use query_loop::{LoopExit, QueryLoop, FAREWELL, QUESTION_PROMPT, QUIT_COMMAND};
pub use traits::{LanguageModel, VectorIndex};
