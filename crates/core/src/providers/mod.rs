pub mod gemini;

pub use gemini::{
    GeminiChat, GeminiConfig, GeminiEmbedder, DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_MODEL,
    DEFAULT_GEMINI_BASE_URL, DEFAULT_MAX_OUTPUT_TOKENS,
};
