use crate::embeddings::Embedder;
use crate::error::EmbeddingError;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Memoizes another [`Embedder`] in process memory.
///
/// Entries are keyed by the inner model id and a sha256 of the text. There is
/// no eviction and nothing is persisted, so the cache grows with the corpus.
pub struct CacheBackedEmbedder<E> {
    inner: E,
    namespace: String,
    store: Mutex<HashMap<String, Vec<f32>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<E: Embedder> CacheBackedEmbedder<E> {
    pub fn new(inner: E) -> Self {
        let namespace = inner.model_id().to_string();
        Self {
            inner,
            namespace,
            store: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn key(&self, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        format!("{}:{:x}", self.namespace, hasher.finalize())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<f32>>> {
        // A poisoned map still holds complete vectors; keep serving them.
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lookup(&self, key: &str) -> Option<Vec<f32>> {
        let found = self.lock().get(key).cloned();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }
}

#[async_trait]
impl<E: Embedder> Embedder for CacheBackedEmbedder<E> {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let key = self.key(text);
        if let Some(vector) = self.lookup(&key) {
            return Ok(vector);
        }

        let vector = self.inner.embed(text).await?;
        self.lock().insert(key, vector.clone());
        Ok(vector)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let keys = texts.iter().map(|text| self.key(text)).collect::<Vec<_>>();
        let mut vectors = keys
            .iter()
            .map(|key| self.lookup(key))
            .collect::<Vec<Option<Vec<f32>>>>();

        let mut seen: HashSet<&str> = HashSet::new();
        let mut missing_keys: Vec<&str> = Vec::new();
        let mut missing_texts: Vec<String> = Vec::new();
        for (position, vector) in vectors.iter().enumerate() {
            if vector.is_none() && seen.insert(keys[position].as_str()) {
                missing_keys.push(&keys[position]);
                missing_texts.push(texts[position].clone());
            }
        }

        if !missing_texts.is_empty() {
            let computed = self.inner.embed_batch(&missing_texts).await?;
            if computed.len() != missing_texts.len() {
                return Err(EmbeddingError::CountMismatch {
                    expected: missing_texts.len(),
                    returned: computed.len(),
                });
            }

            let mut store = self.lock();
            for (key, vector) in missing_keys.iter().zip(computed) {
                store.insert((*key).to_string(), vector);
            }
            for (position, slot) in vectors.iter_mut().enumerate() {
                if slot.is_none() {
                    *slot = store.get(&keys[position]).cloned();
                }
            }
        }

        tracing::debug!(
            namespace = %self.namespace,
            requested = texts.len(),
            cache_hits = self.hits(),
            cache_misses = self.misses(),
            "embedded batch"
        );

        vectors
            .into_iter()
            .map(|vector| {
                vector.ok_or_else(|| {
                    EmbeddingError::Malformed("embedding missing after cache fill".to_string())
                })
            })
            .collect()
    }
}
