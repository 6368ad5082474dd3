use bytes::Buf;
use futures::TryStreamExt;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;
use warp::multipart::{FormData, Part};
use warp::{Rejection, Reply};

use super::Ingestion;
use crate::db::{self, DbPool};
use crate::error::{reject, ApiError};
use crate::models::{Extraction, Passage, UploadLinkRequest, UploadResponse};

pub async fn handle_upload_file(
    mut form: FormData,
    db_pool: DbPool,
    ingestion: Ingestion,
) -> Result<impl Reply, Rejection> {
    let mut title = None;
    let mut filename = String::from("unknown_file");
    let mut content_type = String::from("application/octet-stream");
    let mut file_bytes = Vec::new();

    while let Some(part) = form
        .try_next()
        .await
        .map_err(|e| reject(ApiError::BadRequest(format!("invalid multipart body: {e}"))))?
    {
        let name = part.name().to_string();
        match name.as_str() {
            "file" => {
                filename = part.filename().unwrap_or("unknown").to_string();
                content_type = part
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                file_bytes = read_part(part).await?;
            }
            "title" => {
                let data = read_part(part).await?;
                title = String::from_utf8(data).ok().filter(|t| !t.trim().is_empty());
            }
            other => warn!("Ignoring unexpected form field '{}'", other),
        }
    }

    if file_bytes.is_empty() {
        return Err(reject(ApiError::BadRequest("No file uploaded".to_string())));
    }
    info!("Uploading file '{}' ({} bytes)", filename, file_bytes.len());

    let part = reqwest::multipart::Part::bytes(file_bytes)
        .file_name(filename.clone())
        .mime_str(&content_type)
        .map_err(reject)?;
    let form = reqwest::multipart::Form::new().part("file", part);
    let extraction: Extraction = ingestion
        .http
        .post(format!("{}/extract", ingestion.ingestion_url))
        .multipart(form)
        .send()
        .await
        .and_then(|res| res.error_for_status())
        .map_err(reject)?
        .json()
        .await
        .map_err(reject)?;

    let response = register(
        &db_pool,
        &ingestion,
        extraction.passages,
        title,
        Source::File(&filename),
    )
    .await?;
    Ok(warp::reply::json(&response))
}

pub async fn handle_upload_link(
    request: UploadLinkRequest,
    db_pool: DbPool,
    ingestion: Ingestion,
) -> Result<impl Reply, Rejection> {
    let url = request.data.trim();
    if url.is_empty() {
        return Err(reject(ApiError::BadRequest("data must be a URL".to_string())));
    }
    info!("Uploading link {}", url);

    let extraction: Extraction = ingestion
        .http
        .post(format!("{}/extract-url", ingestion.ingestion_url))
        .json(&json!({ "url": url }))
        .send()
        .await
        .and_then(|res| res.error_for_status())
        .map_err(reject)?
        .json()
        .await
        .map_err(reject)?;

    let response = register(&db_pool, &ingestion, extraction.passages, request.title, Source::Link(url)).await?;
    Ok(warp::reply::json(&response))
}

#[derive(Clone, Copy)]
enum Source<'a> {
    File(&'a str),
    Link(&'a str),
}

/// Indexes the passages under a fresh reference id, then records the reference.
async fn register(
    db_pool: &DbPool,
    ingestion: &Ingestion,
    passages: Vec<Passage>,
    title: Option<String>,
    source: Source<'_>,
) -> Result<UploadResponse, Rejection> {
    let reference_id = Uuid::new_v4().to_string();
    let label = match source {
        Source::File(name) | Source::Link(name) => name,
    };
    let (texts, metadata) = passage_records(&passages, &reference_id, title.as_deref(), label);
    if texts.is_empty() {
        return Err(reject(ApiError::BadRequest(format!("no text could be extracted from {label}"))));
    }

    let (file_name, web_link) = match source {
        Source::File(name) => (Some(name), None),
        Source::Link(url) => (None, Some(url)),
    };
    let registered = async {
        let indexed = ingestion.index.index(&texts, &metadata).await?;
        let reference =
            db::insert_reference(db_pool, title.as_deref(), file_name, web_link, &reference_id).await?;
        Ok::<_, ApiError>((indexed, reference))
    }
    .await;

    // Vectors without a row are unreachable; roll the index back.
    let (indexed, reference) = match registered {
        Ok(registered) => registered,
        Err(e) => {
            if let Err(cleanup) = ingestion.index.delete(&reference_id).await {
                warn!("Failed to remove vectors of unregistered {}: {:#}", reference_id, cleanup);
            }
            return Err(reject(e));
        }
    };
    info!("Registered reference {} ({} chunks)", reference.reference_id, indexed);

    Ok(UploadResponse {
        result: "success".to_string(),
        reference_id: reference.reference_id,
        title: reference.title,
        passages_count: indexed,
    })
}

/// Chunk texts and the metadata stored alongside their vectors. Blank passages are dropped.
fn passage_records(
    passages: &[Passage],
    reference_id: &str,
    title: Option<&str>,
    file_name: &str,
) -> (Vec<String>, Vec<Value>) {
    passages
        .iter()
        .filter(|p| !p.text.trim().is_empty())
        .map(|p| {
            let meta = json!({
                "text": p.text,
                "reference_id": reference_id,
                "title": title,
                "file_name": file_name,
                "page": p.page,
            });
            (p.text.clone(), meta)
        })
        .unzip()
}

async fn read_part(part: Part) -> Result<Vec<u8>, Rejection> {
    part.stream()
        .try_fold(Vec::new(), |mut vec, data| async move {
            vec.extend_from_slice(data.chunk());
            Ok(vec)
        })
        .await
        .map_err(|e| reject(ApiError::BadRequest(format!("failed to read form field: {e}"))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::stub_services::{spawn_services, unreachable_pool, Calls};

    #[test]
    fn blank_passages_are_not_indexed() {
        let passages = vec![
            Passage { text: "Ownership rules".to_string(), page: Some(1) },
            Passage { text: "   ".to_string(), page: Some(2) },
            Passage { text: "Borrowing".to_string(), page: None },
        ];

        let (texts, metadata) = passage_records(&passages, "ref-1", Some("Rust book"), "book.pdf");

        assert_eq!(texts, ["Ownership rules", "Borrowing"]);
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata[0]["reference_id"], "ref-1");
        assert_eq!(metadata[0]["title"], "Rust book");
        assert_eq!(metadata[0]["file_name"], "book.pdf");
        assert_eq!(metadata[0]["page"], 1);
        assert_eq!(metadata[1]["text"], "Borrowing");
        assert!(metadata[1]["page"].is_null());
    }

    #[tokio::test]
    async fn failed_registration_removes_indexed_vectors() {
        let (ingestion, calls) = spawn_services();
        let request = UploadLinkRequest {
            title: Some("Rust book".to_string()),
            data: "https://doc.rust-lang.org/book/".to_string(),
        };

        let result = handle_upload_link(request, unreachable_pool(), ingestion).await;

        assert!(result.is_err());
        assert_eq!(*calls.embed_batches.lock().unwrap(), [2]);
        assert_eq!(Calls::count(&calls.index_adds), 1);
        assert_eq!(Calls::count(&calls.index_deletes), 1);
    }

    #[tokio::test]
    async fn blank_link_is_rejected_before_extraction() {
        let (ingestion, calls) = spawn_services();
        let request = UploadLinkRequest { title: None, data: "   ".to_string() };

        let result = handle_upload_link(request, unreachable_pool(), ingestion).await;

        assert!(result.is_err());
        assert!(calls.embed_batches.lock().unwrap().is_empty());
    }
}
