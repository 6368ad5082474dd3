// Retriever: similarity search over the chunks of every registered reference

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tracing::info;

use super::doc_store::DocumentStore;
use super::{Retrieve, RetrieveWithin};
use crate::models::Document;
use crate::vector_index::VectorIndex;

pub struct RetrieverAgent {
    store: DocumentStore,
    index: VectorIndex,
    top_k: usize,
}

impl RetrieverAgent {
    pub fn new(store: DocumentStore, index: VectorIndex, top_k: usize) -> Self {
        Self { store, index, top_k: top_k.max(1) }
    }
}

#[async_trait]
impl RetrieveWithin for RetrieverAgent {
    async fn retrieve_within(&self, question: &str, reference_ids: &[String]) -> Result<Vec<Document>> {
        if reference_ids.is_empty() {
            return Ok(Vec::new());
        }

        let vector = self
            .index
            .embed(&[question.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("no embedding returned for question"))?;

        let documents = self.index.search(&vector, self.top_k, reference_ids).await?;
        info!("Retriever: {} candidates for '{}'", documents.len(), question);
        Ok(documents)
    }
}

#[async_trait]
impl Retrieve for RetrieverAgent {
    async fn retrieve(&self, question: &str) -> Result<Vec<Document>> {
        let reference_ids = self.store.reference_ids().await?;
        self.retrieve_within(question, &reference_ids).await
    }
}
