use crate::embeddings::Embedder;
use crate::index::InMemoryIndex;
use crate::ingest::ingest_pdf;
use crate::prompt::PromptBuilder;
use crate::traits::{LanguageModel, VectorIndex};
use crate::{Answer, Chunk, ChatPdfConfig, DistanceMetric, EmbeddingError, PipelineError};
use tracing::{debug, error, info};

/// Retrieval-augmented question answering over one indexed PDF.
pub struct ChatPdf<E, L, I = InMemoryIndex>
where
    E: Embedder,
    L: LanguageModel,
    I: VectorIndex,
{
    embedder: E,
    llm: L,
    index: I,
    prompt: PromptBuilder,
    top_k: usize,
}

impl<E, L, I> ChatPdf<E, L, I>
where
    E: Embedder,
    L: LanguageModel,
    I: VectorIndex,
{
    pub fn new(embedder: E, llm: L, index: I, prompt: PromptBuilder, top_k: usize) -> Self {
        Self {
            embedder,
            llm,
            index,
            prompt,
            top_k,
        }
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    /// Embeds the question, retrieves the nearest chunks and asks the model.
    ///
    /// Nothing checks whether the retrieved context is relevant; the prompt
    /// is always sent.
    pub async fn ask(&self, question: &str) -> Result<Answer, PipelineError> {
        let query_vector = self.embedder.embed(question).await?;
        let context = self.index.search_vector(&query_vector, self.top_k)?;

        let texts = context
            .iter()
            .map(|hit| hit.chunk.text.as_str())
            .collect::<Vec<_>>();
        let prompt = self.prompt.build(&texts, question);

        debug!(
            hits = context.len(),
            nearest_distance = context.first().map(|hit| hit.distance),
            prompt_chars = prompt.chars().count(),
            model = self.llm.model(),
            "invoking language model"
        );

        let text = self.llm.invoke(&prompt).await?;

        Ok(Answer {
            question: question.to_string(),
            text,
            context,
        })
    }
}

impl<E, L> ChatPdf<E, L, InMemoryIndex>
where
    E: Embedder,
    L: LanguageModel,
{
    /// Embeds every chunk in one batch and builds the in-memory index.
    pub async fn from_chunks(
        chunks: Vec<Chunk>,
        embedder: E,
        llm: L,
        metric: DistanceMetric,
        prompt: PromptBuilder,
        top_k: usize,
    ) -> Result<Self, PipelineError> {
        let texts = chunks
            .iter()
            .map(|chunk| chunk.text.clone())
            .collect::<Vec<_>>();

        let vectors = embedder
            .embed_batch(&texts)
            .await
            .inspect_err(|failure| {
                error!(model = embedder.model_id(), error = %failure, "failed to generate embeddings");
            })?;

        if vectors.len() != chunks.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: chunks.len(),
                returned: vectors.len(),
            }
            .into());
        }

        let index = InMemoryIndex::build(chunks.into_iter().zip(vectors).collect(), metric)?;
        info!(
            model = embedder.model_id(),
            entry_count = index.len(),
            dimensions = index.dimensions(),
            "vector index ready"
        );

        Ok(Self::new(embedder, llm, index, prompt, top_k))
    }

    /// Loads, splits and indexes the configured PDF.
    pub async fn start(config: &ChatPdfConfig, embedder: E, llm: L) -> Result<Self, PipelineError> {
        let path = config.pdf_path.clone();
        let options = config.ingestion.clone();
        let report = tokio::task::spawn_blocking(move || ingest_pdf(&path, &options)).await??;

        Self::from_chunks(
            report.chunks,
            embedder,
            llm,
            config.metric,
            PromptBuilder::new(config.max_context_chars),
            config.top_k,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::CharacterNgramEmbedder;
    use crate::error::LlmError;
    use crate::test_support::write_text_pdf;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    #[derive(Clone, Default)]
    struct RecordingModel {
        prompts: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl LanguageModel for RecordingModel {
        fn model(&self) -> &str {
            "recording"
        }

        async fn invoke(&self, prompt: &str) -> Result<String, LlmError> {
            self.prompts
                .lock()
                .expect("prompt log")
                .push(prompt.to_string());
            Ok("I don't know.".to_string())
        }
    }

    struct BrokenEmbedder;

    #[async_trait]
    impl Embedder for BrokenEmbedder {
        fn model_id(&self) -> &str {
            "broken"
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Err(EmbeddingError::Malformed("model unavailable".to_string()))
        }
    }

    fn chunk(index: u64, text: &str) -> Chunk {
        Chunk {
            chunk_id: format!("chunk-{index}"),
            document_id: "doc-1".to_string(),
            source: "/tmp/minutes.pdf".to_string(),
            page_number: 1,
            chunk_index: index,
            start: 0,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn ask_retrieves_nearest_chunks_into_prompt() {
        let model = RecordingModel::default();
        let chat = ChatPdf::from_chunks(
            vec![
                chunk(0, "The library budget was approved."),
                chunk(1, "Parking permits are renewed yearly."),
                chunk(2, "Weather was sunny on the day."),
            ],
            CharacterNgramEmbedder::default(),
            model.clone(),
            DistanceMetric::Euclidean,
            PromptBuilder::default(),
            1,
        )
        .await
        .expect("index builds");

        let answer = chat
            .ask("Was the library budget approved?")
            .await
            .expect("answer");

        assert_eq!(answer.context.len(), 1);
        assert_eq!(answer.context[0].chunk.chunk_index, 0);
        let prompts = model.prompts.lock().expect("prompt log");
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("The library budget was approved."));
        assert!(prompts[0].ends_with("User question:\nWas the library budget approved?"));
    }

    #[tokio::test]
    async fn irrelevant_corpus_still_sends_prompt() {
        let model = RecordingModel::default();
        let chat = ChatPdf::from_chunks(
            vec![chunk(0, "Weather was sunny on the day.")],
            CharacterNgramEmbedder::default(),
            model.clone(),
            DistanceMetric::Cosine,
            PromptBuilder::default(),
            4,
        )
        .await
        .expect("index builds");

        let answer = chat.ask("qqq zzz").await.expect("answer");

        assert_eq!(answer.text, "I don't know.");
        assert_eq!(model.prompts.lock().expect("prompt log").len(), 1);
    }

    #[tokio::test]
    async fn empty_question_is_answered() {
        let model = RecordingModel::default();
        let chat = ChatPdf::from_chunks(
            vec![chunk(0, "Attendance: seven members.")],
            CharacterNgramEmbedder::default(),
            model.clone(),
            DistanceMetric::Euclidean,
            PromptBuilder::default(),
            4,
        )
        .await
        .expect("index builds");

        let answer = chat.ask("").await.expect("answer");
        assert_eq!(answer.context.len(), 1);
    }

    #[tokio::test]
    async fn embedding_failure_aborts_indexing() {
        let result = ChatPdf::from_chunks(
            vec![chunk(0, "anything")],
            BrokenEmbedder,
            RecordingModel::default(),
            DistanceMetric::Euclidean,
            PromptBuilder::default(),
            4,
        )
        .await;

        assert!(matches!(result, Err(PipelineError::Embedding(_))));
    }

    #[tokio::test]
    async fn start_indexes_configured_pdf() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("document.pdf");
        write_text_pdf(&path, &["Fourth meeting minutes", "Action items assigned"])?;

        let config = ChatPdfConfig {
            pdf_path: path,
            ..ChatPdfConfig::default()
        };
        let chat = ChatPdf::start(
            &config,
            config.build_embedder(),
            RecordingModel::default(),
        )
        .await?;

        assert_eq!(chat.index().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn start_fails_for_missing_pdf() {
        let config = ChatPdfConfig {
            pdf_path: "definitely/missing.pdf".into(),
            ..ChatPdfConfig::default()
        };
        let result = ChatPdf::start(
            &config,
            CharacterNgramEmbedder::default(),
            RecordingModel::default(),
        )
        .await;

        assert!(matches!(
            result,
            Err(PipelineError::Ingest(crate::IngestError::Io(_)))
        ));
    }
}
