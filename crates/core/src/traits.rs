use crate::{LlmError, SearchError, SearchHit};
use async_trait::async_trait;

pub trait VectorIndex: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn search_vector(&self, query_vector: &[f32], top_k: usize)
        -> Result<Vec<SearchHit>, SearchError>;
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn model(&self) -> &str;

    async fn invoke(&self, prompt: &str) -> Result<String, LlmError>;
}
