use std::collections::BTreeMap;

use serde_json::json;
use tracing::{info, warn};
use warp::{Rejection, Reply};

use crate::agents::doc_store::DocumentStore;
use crate::db::{self, DbPool};
use crate::error::{reject, ApiError};
use crate::models::{FileDetails, FileReference};
use crate::vector_index::VectorIndex;

pub async fn handle_list_files(db_pool: DbPool) -> Result<impl Reply, Rejection> {
    let references = db::list_references(&db_pool).await.map_err(reject)?;
    Ok(warp::reply::json(&keyed_by_index(references)))
}

pub async fn handle_get_file(
    id: i32,
    db_pool: DbPool,
    store: DocumentStore,
) -> Result<impl Reply, Rejection> {
    let reference = db::get_reference(&db_pool, id)
        .await
        .map_err(reject)?
        .ok_or_else(|| reject(ApiError::NotFound(format!("file {id}"))))?;

    let chunks = store
        .fetch(std::slice::from_ref(&reference.reference_id))
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&FileDetails { reference, chunks }))
}

pub async fn handle_delete_file(
    id: i32,
    db_pool: DbPool,
    index: VectorIndex,
) -> Result<impl Reply, Rejection> {
    let reference = db::delete_reference(&db_pool, id)
        .await
        .map_err(reject)?
        .ok_or_else(|| reject(ApiError::NotFound(format!("file {id}"))))?;

    // The row is already gone; an index failure only leaves orphaned vectors behind.
    if let Err(e) = index.delete(&reference.reference_id).await {
        warn!("Failed to delete vectors for {}: {:#}", reference.reference_id, e);
    }
    info!("Deleted reference {}", reference.reference_id);
    Ok(warp::reply::json(&json!({ "result": "deleted", "reference_id": reference.reference_id })))
}

pub async fn handle_reset(db_pool: DbPool, index: VectorIndex) -> Result<impl Reply, Rejection> {
    // Rows first: a failed index reset only leaves vectors no reference points at.
    let removed = db::reset_references(&db_pool).await.map_err(reject)?;
    index.reset().await.map_err(reject)?;
    info!("Reset knowledge base, {} references removed", removed);
    Ok(warp::reply::json(&json!({ "result": "reset", "removed": removed })))
}

fn keyed_by_index(references: Vec<FileReference>) -> BTreeMap<String, FileReference> {
    references
        .into_iter()
        .map(|reference| (format!("index {}", reference.id), reference))
        .collect()
}
