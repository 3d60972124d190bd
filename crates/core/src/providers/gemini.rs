//! Google Generative Language API (Gemini) clients.
//!
//! `GeminiChat` answers prompts through `generateContent`; `GeminiEmbedder`
//! embeds text through `embedContent` / `batchEmbedContents`. Both send the
//! key in the `x-goog-api-key` header and enforce no timeout.

use crate::embeddings::Embedder;
use crate::error::{EmbeddingError, LlmError};
use crate::traits::LanguageModel;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";
pub const DEFAULT_CHAT_MODEL: &str = "gemini-pro";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2048;

const MAX_BATCH: usize = 100;

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl GeminiConfig {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let api_key = api_key.and_then(|value| {
            let key = value.trim().to_string();
            if key.is_empty() {
                None
            } else {
                Some(key)
            }
        });

        Self {
            base_url: base_url.into(),
            api_key,
        }
    }

    fn endpoint(&self, model: &str, method: &str) -> Result<Url, url::ParseError> {
        let mut base = self.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        Url::parse(&base)?.join(&format!("models/{model}:{method}"))
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_GEMINI_BASE_URL, None)
    }
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

pub struct GeminiChat {
    client: Client,
    config: GeminiConfig,
    model: String,
    max_output_tokens: u32,
}

impl GeminiChat {
    pub fn new(config: GeminiConfig, model: impl Into<String>, max_output_tokens: u32) -> Self {
        Self {
            client: Client::new(),
            config,
            model: model.into(),
            max_output_tokens,
        }
    }

    fn request_body(&self, prompt: &str) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: self.max_output_tokens,
            },
        }
    }
}

#[async_trait]
impl LanguageModel for GeminiChat {
    fn model(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, prompt: &str) -> Result<String, LlmError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| LlmError::MissingApiKey(self.model.clone()))?;
        let endpoint = self.config.endpoint(&self.model, "generateContent")?;

        let response = self
            .client
            .post(endpoint)
            .header("x-goog-api-key", api_key)
            .json(&self.request_body(prompt))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status, body });
        }

        let parsed: GenerateResponse = response.json().await?;
        answer_text(parsed)
    }
}

fn answer_text(response: GenerateResponse) -> Result<String, LlmError> {
    if let Some(reason) = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason)
    {
        return Err(LlmError::Blocked(reason));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(LlmError::EmptyResponse)?;

    let text = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    if text.is_empty() {
        return match candidate.finish_reason {
            Some(reason) if reason == "SAFETY" || reason == "RECITATION" => {
                Err(LlmError::Blocked(reason))
            }
            _ => Err(LlmError::EmptyResponse),
        };
    }

    Ok(text)
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    content: Content,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedRequest>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Option<EmbeddingValues>,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    #[serde(default)]
    values: Vec<f32>,
}

fn non_empty_values(embedding: EmbeddingValues, method: &str) -> Result<Vec<f32>, EmbeddingError> {
    if embedding.values.is_empty() {
        return Err(EmbeddingError::Malformed(format!(
            "{method} returned an embedding with no values"
        )));
    }
    Ok(embedding.values)
}

pub struct GeminiEmbedder {
    client: Client,
    config: GeminiConfig,
    model: String,
}

impl GeminiEmbedder {
    pub fn new(config: GeminiConfig, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            config,
            model: model.into(),
        }
    }

    fn embed_request(&self, text: &str) -> EmbedRequest {
        EmbedRequest {
            model: format!("models/{}", self.model),
            content: Content {
                role: None,
                parts: vec![Part {
                    text: text.to_string(),
                }],
            },
        }
    }

    async fn post<T: Serialize + Sync>(
        &self,
        method: &str,
        body: &T,
    ) -> Result<reqwest::Response, EmbeddingError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(EmbeddingError::MissingApiKey)?;
        let endpoint = self.config.endpoint(&self.model, method)?;

        let response = self
            .client
            .post(endpoint)
            .header("x-goog-api-key", api_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Status {
                model: self.model.clone(),
                status,
                body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let response = self
            .post("embedContent", &self.embed_request(text))
            .await?;
        let parsed: EmbedResponse = response.json().await?;

        parsed
            .embedding
            .ok_or_else(|| EmbeddingError::Malformed("embedContent returned no embedding".to_string()))
            .and_then(|embedding| non_empty_values(embedding, "embedContent"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(MAX_BATCH) {
            let request = BatchEmbedRequest {
                requests: batch.iter().map(|text| self.embed_request(text)).collect(),
            };
            let response = self.post("batchEmbedContents", &request).await?;
            let parsed: BatchEmbedResponse = response.json().await?;

            if parsed.embeddings.len() != batch.len() {
                return Err(EmbeddingError::CountMismatch {
                    expected: batch.len(),
                    returned: parsed.embeddings.len(),
                });
            }
            for embedding in parsed.embeddings {
                vectors.push(non_empty_values(embedding, "batchEmbedContents")?);
            }
        }

        Ok(vectors)
    }
}
