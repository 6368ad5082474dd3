// Client for the embedding and vector-db services. Chunks are tagged with the
// `reference_id` of the file or link they came from.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::models::Document;

const EMBED_BATCH: usize = 50;

#[derive(Clone)]
pub struct VectorIndex {
    client: reqwest::Client,
    embedding_url: String,
    vector_db_url: String,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    filter: SearchFilter<'a>,
}

#[derive(Debug, Serialize)]
struct SearchFilter<'a> {
    reference_id: &'a [String],
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct DocumentsResponse {
    #[serde(default)]
    documents: Vec<Map<String, Value>>,
}

impl VectorIndex {
    pub fn new(client: reqwest::Client, embedding_url: String, vector_db_url: String) -> Self {
        Self {
            client,
            embedding_url: embedding_url.trim_end_matches('/').to_string(),
            vector_db_url: vector_db_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let response: EmbedResponse = self
            .client
            .post(format!("{}/embed", self.embedding_url))
            .json(&json!({ "texts": texts }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.embeddings.len() != texts.len() {
            return Err(anyhow!(
                "embedding service returned {} vectors for {} texts",
                response.embeddings.len(),
                texts.len()
            ));
        }
        Ok(response.embeddings)
    }

    /// Embeds `texts` in batches and stores them with their metadata. Returns the number indexed.
    pub async fn index(&self, texts: &[String], metadata: &[Value]) -> Result<usize> {
        let mut indexed = 0;
        for (chunk_texts, chunk_metas) in texts.chunks(EMBED_BATCH).zip(metadata.chunks(EMBED_BATCH)) {
            let vectors = self.embed(chunk_texts).await?;
            self.client
                .post(format!("{}/index/add", self.vector_db_url))
                .json(&json!({ "vectors": vectors, "metadata": chunk_metas }))
                .send()
                .await?
                .error_for_status()?;
            indexed += chunk_texts.len();
        }
        info!("Indexed {} chunks", indexed);
        Ok(indexed)
    }

    /// Similarity search restricted to `reference_ids`, best match first.
    pub async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
        reference_ids: &[String],
    ) -> Result<Vec<Document>> {
        let request = SearchRequest {
            vector,
            top_k,
            filter: SearchFilter { reference_id: reference_ids },
        };
        let response: SearchResponse = self
            .client
            .post(format!("{}/index/search", self.vector_db_url))
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut hits = response.results;
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        debug!("Vector search returned {} hits", hits.len());
        Ok(hits
            .into_iter()
            .filter_map(|hit| chunk_to_document(hit.metadata))
            .collect())
    }

    pub async fn documents(&self, reference_ids: &[String]) -> Result<Vec<Document>> {
        let response: DocumentsResponse = self
            .client
            .post(format!("{}/index/documents", self.vector_db_url))
            .json(&json!({ "reference_ids": reference_ids }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response
            .documents
            .into_iter()
            .filter_map(chunk_to_document)
            .collect())
    }

    pub async fn delete(&self, reference_id: &str) -> Result<()> {
        self.client
            .post(format!("{}/index/delete", self.vector_db_url))
            .json(&json!({ "reference_id": reference_id }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn reset(&self) -> Result<()> {
        self.client
            .post(format!("{}/index/reset", self.vector_db_url))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Stored chunk metadata carries its text under `text`; the rest becomes document metadata.
fn chunk_to_document(mut metadata: Map<String, Value>) -> Option<Document> {
    match metadata.remove("text")? {
        Value::String(content) => Some(Document { content, metadata }),
        _ => None,
    }
}
