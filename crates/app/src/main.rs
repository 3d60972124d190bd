use chatpdf_core::providers::{
    DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_MODEL, DEFAULT_GEMINI_BASE_URL,
    DEFAULT_MAX_OUTPUT_TOKENS,
};
use chatpdf_core::{
    ChatPdf, ChatPdfConfig, DistanceMetric, EmbeddingProvider, GeminiConfig, IngestionOptions,
    LoopExit, QueryLoop, DEFAULT_PDF_PATH,
};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "chatpdf", version, about = "Ask questions about a PDF")]
struct Cli {
    /// Cache chunk embeddings in memory for the lifetime of the process
    #[arg(
        long,
        env = "CHATPDF_EMBEDDING_CACHE",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    embedding_cache: bool,

    /// Where chunk and query embeddings are computed
    #[arg(long, env = "CHATPDF_EMBEDDING_PROVIDER", value_enum, default_value_t = ProviderArg::Local)]
    embedding_provider: ProviderArg,

    /// Gemini embedding model, used with --embedding-provider gemini
    #[arg(long, env = "CHATPDF_EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    embedding_model: String,

    /// Gemini model that answers questions
    #[arg(long, env = "CHATPDF_CHAT_MODEL", default_value = DEFAULT_CHAT_MODEL)]
    chat_model: String,

    /// Maximum tokens generated per answer
    #[arg(long, env = "CHATPDF_MAX_OUTPUT_TOKENS", default_value_t = DEFAULT_MAX_OUTPUT_TOKENS)]
    max_output_tokens: u32,

    /// Number of chunks retrieved per question
    #[arg(long, env = "CHATPDF_TOP_K", default_value_t = chatpdf_core::DEFAULT_TOP_K)]
    top_k: usize,

    /// Target chunk length in characters
    #[arg(long, env = "CHATPDF_CHUNK_SIZE", default_value_t = 1_000)]
    chunk_size: usize,

    /// Characters shared by neighbouring chunks
    #[arg(long, env = "CHATPDF_CHUNK_OVERLAP", default_value_t = 200)]
    chunk_overlap: usize,

    /// Distance used to rank chunks
    #[arg(long, env = "CHATPDF_METRIC", value_enum, default_value_t = MetricArg::Euclidean)]
    metric: MetricArg,

    /// Drop lower-ranked chunks once the context exceeds this many characters
    #[arg(long, env = "CHATPDF_MAX_CONTEXT_CHARS")]
    max_context_chars: Option<usize>,

    /// Generative Language API base URL
    #[arg(long, env = "GEMINI_BASE_URL", default_value = DEFAULT_GEMINI_BASE_URL)]
    gemini_base_url: String,

    /// API key for the Generative Language API
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    google_api_key: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ProviderArg {
    Local,
    Gemini,
}

#[derive(Clone, Copy, ValueEnum)]
enum MetricArg {
    Euclidean,
    Cosine,
}

impl From<Cli> for ChatPdfConfig {
    fn from(cli: Cli) -> Self {
        Self {
            pdf_path: PathBuf::from(DEFAULT_PDF_PATH),
            ingestion: IngestionOptions {
                chunk_size: cli.chunk_size,
                chunk_overlap: cli.chunk_overlap,
            },
            use_embedding_cache: cli.embedding_cache,
            embedding_provider: match cli.embedding_provider {
                ProviderArg::Local => EmbeddingProvider::Local,
                ProviderArg::Gemini => EmbeddingProvider::Gemini,
            },
            embedding_model: cli.embedding_model,
            chat_model: cli.chat_model,
            max_output_tokens: cli.max_output_tokens,
            top_k: cli.top_k,
            metric: match cli.metric {
                MetricArg::Euclidean => DistanceMetric::Euclidean,
                MetricArg::Cosine => DistanceMetric::Cosine,
            },
            max_context_chars: cli.max_context_chars,
            gemini: GeminiConfig::new(cli.gemini_base_url, cli.google_api_key),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ChatPdfConfig::from(Cli::parse());
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        pdf = %config.pdf_path.display(),
        embedding_cache = config.use_embedding_cache,
        chat_model = %config.chat_model,
        "chatpdf boot"
    );

    let embedder = config.build_embedder();
    let llm = config.build_language_model();
    let chat = ChatPdf::start(&config, embedder, llm).await?;

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let exit = QueryLoop::new(&chat).run(stdin, &mut stdout).await?;

    match exit {
        LoopExit::Quit => info!("session ended by user"),
        LoopExit::EndOfInput => info!("session ended at end of input"),
    }

    Ok(())
}
