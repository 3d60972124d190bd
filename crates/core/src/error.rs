use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),
}

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("embedding request to {model} returned {status}: {body}")]
    Status {
        model: String,
        status: u16,
        body: String,
    },

    #[error("malformed embedding response: {0}")]
    Malformed(String),

    #[error("embedding count {returned} doesn't match input count {expected}")]
    CountMismatch { expected: usize, returned: usize },

    #[error("embedding model is missing an api key")]
    MissingApiKey,
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("query vector dim {actual} is not {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("index entry {position} has dim {actual}, expected {expected}")]
    InconsistentDimensions {
        position: usize,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("no api key configured for {0}; set GOOGLE_API_KEY")]
    MissingApiKey(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("generation request returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("generation response had no text")]
    EmptyResponse,

    #[error("prompt was blocked: {0}")]
    Blocked(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("terminal io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
