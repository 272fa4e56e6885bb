//! In-memory semantic index over canonical transcript lines.
//!
//! Built once per transcript upload with a single batched embedding call.
//! Queries embed the search text and rank every stored line by cosine
//! similarity. Nothing is persisted.

use std::sync::Arc;

use async_trait::async_trait;
use mimic_core::error::MemoryError;
use mimic_core::index::{SearchHit, SemanticSearch};
use mimic_core::provider::{Embedder, EmbeddingPurpose, EmbeddingRequest};
use mimic_core::transcript::CanonicalMessage;
use tracing::{debug, info};

/// One embedded transcript line.
#[derive(Debug, Clone)]
pub struct IndexedDocument {
    /// The original message text
    pub text: String,
    /// Sender of the line
    pub sender: String,
    /// Persona role of the sender
    pub role: String,
    /// Embedding vector
    pub embedding: Vec<f32>,
}

/// A nearest-neighbour index over embedded transcript lines.
pub struct SemanticIndex {
    embedder: Arc<dyn Embedder>,
    documents: Vec<IndexedDocument>,
    dimension: usize,
}

impl std::fmt::Debug for SemanticIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticIndex")
            .field("embedder", &self.embedder.name())
            .field("documents", &self.documents.len())
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl SemanticIndex {
    /// Embed `messages` in one batch and build the index.
    ///
    /// Embedding failures propagate as-is; there is no retry here.
    pub async fn build(
        embedder: Arc<dyn Embedder>,
        messages: &[CanonicalMessage],
    ) -> Result<Self, MemoryError> {
        if messages.is_empty() {
            return Err(MemoryError::EmptyIndex);
        }

        let request = EmbeddingRequest {
            model: embedder.model().to_string(),
            inputs: messages.iter().map(|m| m.message.clone()).collect(),
            purpose: EmbeddingPurpose::Document,
        };

        debug!(
            embedder = %embedder.name(),
            count = request.inputs.len(),
            "Embedding transcript"
        );

        let response = embedder.embed(request).await?;
        if response.embeddings.len() != messages.len() {
            return Err(MemoryError::CountMismatch {
                expected: messages.len(),
                actual: response.embeddings.len(),
            });
        }

        let dimension = response.embeddings[0].len();
        let mut documents = Vec::with_capacity(messages.len());
        for (message, embedding) in messages.iter().zip(response.embeddings) {
            if embedding.len() != dimension || dimension == 0 {
                return Err(MemoryError::DimensionMismatch {
                    expected: dimension,
                    actual: embedding.len(),
                });
            }
            documents.push(IndexedDocument {
                text: message.message.clone(),
                sender: message.sender.clone(),
                role: message.role.clone(),
                embedding,
            });
        }

        info!(
            documents = documents.len(),
            dimension,
            model = %response.model,
            "Semantic index built"
        );

        Ok(Self {
            embedder,
            documents,
            dimension,
        })
    }

    /// Vector dimension shared by every document.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Rank documents against an already-embedded query.
    pub fn search_by_vector(
        &self,
        query: &[f32],
        k: usize,
        fetch_candidates: usize,
    ) -> Result<Vec<SearchHit>, MemoryError> {
        if query.len() != self.dimension {
            return Err(MemoryError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let pool = fetch_candidates.max(k);
        let mut candidates = crate::vector::top_k_by_similarity(
            query,
            self.documents.iter().map(|d| d.embedding.as_slice()),
            pool,
        );
        candidates.truncate(k);

        Ok(candidates
            .into_iter()
            .map(|(i, score)| {
                let doc = &self.documents[i];
                SearchHit {
                    text: doc.text.clone(),
                    sender: doc.sender.clone(),
                    role: doc.role.clone(),
                    score,
                }
            })
            .collect())
    }
}

#[async_trait]
impl SemanticSearch for SemanticIndex {
    async fn search(
        &self,
        query: &str,
        k: usize,
        fetch_candidates: usize,
    ) -> Result<Vec<SearchHit>, MemoryError> {
        let response = self
            .embedder
            .embed(EmbeddingRequest {
                model: self.embedder.model().to_string(),
                inputs: vec![query.to_string()],
                purpose: EmbeddingPurpose::Query,
            })
            .await?;

        let query_vec = response
            .embeddings
            .into_iter()
            .next()
            .ok_or(MemoryError::CountMismatch {
                expected: 1,
                actual: 0,
            })?;

        let hits = self.search_by_vector(&query_vec, k, fetch_candidates)?;
        debug!(k, fetch_candidates, hits = hits.len(), "Semantic search");
        Ok(hits)
    }

    fn len(&self) -> usize {
        self.documents.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mimic_core::error::ProviderError;
    use mimic_core::provider::EmbeddingResponse;
    use std::sync::Mutex;

    /// Embeds text as keyword counts over a tiny fixed vocabulary.
    struct KeywordEmbedder {
        calls: Mutex<Vec<(usize, EmbeddingPurpose)>>,
    }

    const VOCAB: [&str; 4] = ["coffee", "meeting", "report", "dog"];

    impl KeywordEmbedder {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
            }
        }

        fn vector(text: &str) -> Vec<f32> {
            let lower = text.to_lowercase();
            let mut v: Vec<f32> = VOCAB
                .iter()
                .map(|w| lower.matches(w).count() as f32)
                .collect();
            v.push(0.01); // keep every vector non-zero
            v
        }
    }

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        fn name(&self) -> &str {
            "keyword"
        }

        fn model(&self) -> &str {
            "keyword-v1"
        }

        async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
            self.calls
                .lock()
                .unwrap()
                .push((request.inputs.len(), request.purpose));
            Ok(EmbeddingResponse {
                embeddings: request.inputs.iter().map(|t| Self::vector(t)).collect(),
                model: "keyword-v1".into(),
            })
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        fn name(&self) -> &str {
            "failing"
        }

        fn model(&self) -> &str {
            "none"
        }

        async fn embed(&self, _request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
            Err(ProviderError::Network("connection reset".into()))
        }
    }

    /// Returns one vector too few.
    struct ShortEmbedder;

    #[async_trait]
    impl Embedder for ShortEmbedder {
        fn name(&self) -> &str {
            "short"
        }

        fn model(&self) -> &str {
            "short"
        }

        async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
            Ok(EmbeddingResponse {
                embeddings: vec![vec![1.0]; request.inputs.len().saturating_sub(1)],
                model: "short".into(),
            })
        }
    }

    fn msg(sender: &str, text: &str) -> CanonicalMessage {
        CanonicalMessage {
            sender: sender.into(),
            role: sender.split_whitespace().next().unwrap().into(),
            message: text.into(),
        }
    }

    fn transcript() -> Vec<CanonicalMessage> {
        vec![
            msg("Alice Smith", "walked the dog this morning"),
            msg("Bob", "coffee later?"),
            msg("Alice Smith", "the meeting moved to 3"),
            msg("Bob", "send me the report"),
            msg("Alice Smith", "coffee coffee coffee"),
        ]
    }

    #[tokio::test]
    async fn build_embeds_in_one_batch() {
        let embedder = Arc::new(KeywordEmbedder::new());
        let index = SemanticIndex::build(embedder.clone(), &transcript()).await.unwrap();

        assert_eq!(index.len(), 5);
        assert_eq!(index.dimension(), VOCAB.len() + 1);
        let calls = embedder.calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[(5, EmbeddingPurpose::Document)]);
    }

    #[tokio::test]
    async fn search_ranks_most_similar_first() {
        let embedder = Arc::new(KeywordEmbedder::new());
        let index = SemanticIndex::build(embedder.clone(), &transcript()).await.unwrap();

        let hits = index.search("any coffee?", 2, 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].text.contains("coffee"));
        assert!(hits[1].text.contains("coffee"));
        assert!(hits[0].score >= hits[1].score);
        assert_eq!(
            embedder.calls.lock().unwrap().last(),
            Some(&(1, EmbeddingPurpose::Query))
        );
    }

    #[tokio::test]
    async fn search_carries_metadata() {
        let index = SemanticIndex::build(Arc::new(KeywordEmbedder::new()), &transcript())
            .await
            .unwrap();

        let hits = index.search("the dog", 1, 10).await.unwrap();
        assert_eq!(hits[0].sender, "Alice Smith");
        assert_eq!(hits[0].role, "Alice");
        assert_eq!(hits[0].dialogue_line(), "Alice Smith: walked the dog this morning");
    }

    #[tokio::test]
    async fn k_larger_than_index_returns_everything() {
        let index = SemanticIndex::build(Arc::new(KeywordEmbedder::new()), &transcript())
            .await
            .unwrap();
        let hits = index.search("report", 8, 10).await.unwrap();
        assert_eq!(hits.len(), 5);
    }

    #[tokio::test]
    async fn fetch_below_k_is_raised_to_k() {
        let index = SemanticIndex::build(Arc::new(KeywordEmbedder::new()), &transcript())
            .await
            .unwrap();
        let hits = index.search("meeting", 3, 1).await.unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let err = SemanticIndex::build(Arc::new(KeywordEmbedder::new()), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::EmptyIndex));
    }

    #[tokio::test]
    async fn embedding_failure_propagates() {
        let err = SemanticIndex::build(Arc::new(FailingEmbedder), &transcript())
            .await
            .unwrap_err();
        match err {
            MemoryError::EmbeddingFailed(ProviderError::Network(msg)) => {
                assert!(msg.contains("connection reset"));
            }
            other => panic!("Expected EmbeddingFailed, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn count_mismatch_is_an_error() {
        let err = SemanticIndex::build(Arc::new(ShortEmbedder), &transcript())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MemoryError::CountMismatch {
                expected: 5,
                actual: 4
            }
        ));
    }

    #[tokio::test]
    async fn query_dimension_is_checked() {
        let index = SemanticIndex::build(Arc::new(KeywordEmbedder::new()), &transcript())
            .await
            .unwrap();
        let err = index.search_by_vector(&[1.0, 0.0], 3, 10).unwrap_err();
        assert!(matches!(err, MemoryError::DimensionMismatch { .. }));
    }
}
