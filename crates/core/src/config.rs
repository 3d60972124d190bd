use crate::cache::CacheBackedEmbedder;
use crate::embeddings::{CharacterNgramEmbedder, Embedder};
use crate::models::{DistanceMetric, IngestionOptions};
use crate::providers::{
    GeminiChat, GeminiConfig, GeminiEmbedder, DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_MODEL,
    DEFAULT_MAX_OUTPUT_TOKENS,
};
use std::path::PathBuf;

/// Location of the PDF that gets indexed at startup.
pub const DEFAULT_PDF_PATH: &str = "./pdf/document.pdf";

pub const DEFAULT_TOP_K: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbeddingProvider {
    #[default]
    Local,
    Gemini,
}

#[derive(Debug, Clone)]
pub struct ChatPdfConfig {
    pub pdf_path: PathBuf,
    pub ingestion: IngestionOptions,
    pub use_embedding_cache: bool,
    pub embedding_provider: EmbeddingProvider,
    pub embedding_model: String,
    pub chat_model: String,
    pub max_output_tokens: u32,
    pub top_k: usize,
    pub metric: DistanceMetric,
    pub max_context_chars: Option<usize>,
    pub gemini: GeminiConfig,
}

impl Default for ChatPdfConfig {
    fn default() -> Self {
        Self {
            pdf_path: PathBuf::from(DEFAULT_PDF_PATH),
            ingestion: IngestionOptions::default(),
            use_embedding_cache: true,
            embedding_provider: EmbeddingProvider::Local,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            top_k: DEFAULT_TOP_K,
            metric: DistanceMetric::Euclidean,
            max_context_chars: None,
            gemini: GeminiConfig::default(),
        }
    }
}

impl ChatPdfConfig {
    pub fn build_embedder(&self) -> Box<dyn Embedder> {
        let base: Box<dyn Embedder> = match self.embedding_provider {
            EmbeddingProvider::Local => Box::new(CharacterNgramEmbedder::default()),
            EmbeddingProvider::Gemini => Box::new(GeminiEmbedder::new(
                self.gemini.clone(),
                self.embedding_model.clone(),
            )),
        };

        self.wrap_embedder(base)
    }

    /// Puts `base` behind the in-memory cache when `use_embedding_cache` is set.
    pub fn wrap_embedder(&self, base: Box<dyn Embedder>) -> Box<dyn Embedder> {
        if self.use_embedding_cache {
            Box::new(CacheBackedEmbedder::new(base))
        } else {
            base
        }
    }

    pub fn build_language_model(&self) -> GeminiChat {
        GeminiChat::new(
            self.gemini.clone(),
            self.chat_model.clone(),
            self.max_output_tokens,
        )
    }
}
