// Document Store: resolves registered references to their stored chunks

use anyhow::Result;

use crate::db::{self, DbPool};
use crate::models::Document;
use crate::vector_index::VectorIndex;

#[derive(Clone)]
pub struct DocumentStore {
    db_pool: DbPool,
    index: VectorIndex,
}

impl DocumentStore {
    pub fn new(db_pool: DbPool, index: VectorIndex) -> Self {
        Self { db_pool, index }
    }

    /// Every reference id registered through the upload routes.
    pub async fn reference_ids(&self) -> Result<Vec<String>> {
        Ok(db::reference_ids(&self.db_pool).await?)
    }

    /// Raw chunk text and metadata stored for the given references.
    pub async fn fetch(&self, reference_ids: &[String]) -> Result<Vec<Document>> {
        if reference_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.index.documents(reference_ids).await
    }
}
