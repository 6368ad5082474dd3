use std::convert::Infallible;
use std::sync::Arc;

use warp::{Filter, Rejection, Reply};

use crate::agents::doc_store::DocumentStore;
use crate::agents::RetrieveWithin;
use crate::db::DbPool;
use crate::graph::CorrectiveRag;
use crate::middleware::{rate_limit, Limiter};
use crate::redis_client::RedisClient;
use crate::vector_index::VectorIndex;

mod files;
mod ingest;
mod query;
#[cfg(test)]
mod stub_services;

/// Shared handles the route filters inject into handlers.
#[derive(Clone)]
pub struct AppContext {
    pub db_pool: DbPool,
    pub redis: Option<RedisClient>,
    pub http: reqwest::Client,
    pub ingestion_url: String,
    pub index: VectorIndex,
    pub store: DocumentStore,
    pub retriever: Arc<dyn RetrieveWithin>,
    pub pipeline: Arc<CorrectiveRag>,
    pub limiter: Limiter,
    pub cache_ttl_secs: u64,
}

/// Settings for the ingestion handlers.
#[derive(Clone)]
pub struct Ingestion {
    pub http: reqwest::Client,
    pub ingestion_url: String,
    pub index: VectorIndex,
}

/// Answer cache settings for the corrective RAG route.
#[derive(Clone)]
pub struct AnswerCache {
    pub redis: Option<RedisClient>,
    pub ttl_secs: u64,
}

pub fn routes(ctx: AppContext) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let api = warp::path("api").and(warp::path("v1"));
    let ingestion = Ingestion {
        http: ctx.http.clone(),
        ingestion_url: ctx.ingestion_url.clone(),
        index: ctx.index.clone(),
    };
    let cache = AnswerCache {
        redis: ctx.redis.clone(),
        ttl_secs: ctx.cache_ttl_secs,
    };

    let upload_file_route = api
        .and(warp::path!("upload" / "file"))
        .and(warp::post())
        .and(warp::multipart::form().max_length(100 * 1024 * 1024)) // 100MB max
        .and(with_db(ctx.db_pool.clone()))
        .and(with_ingestion(ingestion.clone()))
        .and_then(ingest::handle_upload_file);

    let upload_link_route = api
        .and(warp::path!("upload" / "link"))
        .and(warp::post())
        .and(warp::body::json())
        .and(with_db(ctx.db_pool.clone()))
        .and(with_ingestion(ingestion))
        .and_then(ingest::handle_upload_link);

    let list_files_route = api
        .and(warp::path!("files"))
        .and(warp::get())
        .and(with_db(ctx.db_pool.clone()))
        .and_then(files::handle_list_files);

    let get_file_route = api
        .and(warp::path!("files" / i32))
        .and(warp::get())
        .and(with_db(ctx.db_pool.clone()))
        .and(with_store(ctx.store.clone()))
        .and_then(files::handle_get_file);

    let delete_file_route = api
        .and(warp::path!("files" / i32))
        .and(warp::delete())
        .and(with_db(ctx.db_pool.clone()))
        .and(with_index(ctx.index.clone()))
        .and_then(files::handle_delete_file);

    let reset_route = api
        .and(warp::path!("files"))
        .and(warp::delete())
        .and(with_db(ctx.db_pool.clone()))
        .and(with_index(ctx.index.clone()))
        .and_then(files::handle_reset);

    let rag_route = rag_route(ctx.retriever, ctx.pipeline.clone(), ctx.limiter.clone());
    let srag_route = srag_route(ctx.pipeline, cache, ctx.limiter);

    upload_file_route
        .or(upload_link_route)
        .or(list_files_route)
        .or(get_file_route)
        .or(delete_file_route)
        .or(reset_route)
        .or(rag_route)
        .or(srag_route)
}

fn rag_route(
    retriever: Arc<dyn RetrieveWithin>,
    pipeline: Arc<CorrectiveRag>,
    limiter: Limiter,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "v1" / "rag" / "generate-answer" / String)
        .and(warp::get())
        .and(rate_limit(limiter))
        .and(warp::query())
        .and(with_retriever(retriever))
        .and(with_pipeline(pipeline))
        .and_then(query::handle_rag_answer)
}

fn srag_route(
    pipeline: Arc<CorrectiveRag>,
    cache: AnswerCache,
    limiter: Limiter,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "v1" / "srag" / "generate")
        .and(warp::get())
        .and(rate_limit(limiter))
        .and(warp::query())
        .and(with_pipeline(pipeline))
        .and(with_cache(cache))
        .and_then(query::handle_srag)
}

fn with_db(db_pool: DbPool) -> impl Filter<Extract = (DbPool,), Error = Infallible> + Clone {
    warp::any().map(move || db_pool.clone())
}

fn with_ingestion(ingestion: Ingestion) -> impl Filter<Extract = (Ingestion,), Error = Infallible> + Clone {
    warp::any().map(move || ingestion.clone())
}

fn with_store(store: DocumentStore) -> impl Filter<Extract = (DocumentStore,), Error = Infallible> + Clone {
    warp::any().map(move || store.clone())
}

fn with_index(index: VectorIndex) -> impl Filter<Extract = (VectorIndex,), Error = Infallible> + Clone {
    warp::any().map(move || index.clone())
}

fn with_retriever(
    retriever: Arc<dyn RetrieveWithin>,
) -> impl Filter<Extract = (Arc<dyn RetrieveWithin>,), Error = Infallible> + Clone {
    warp::any().map(move || retriever.clone())
}

fn with_pipeline(
    pipeline: Arc<CorrectiveRag>,
) -> impl Filter<Extract = (Arc<CorrectiveRag>,), Error = Infallible> + Clone {
    warp::any().map(move || pipeline.clone())
}

fn with_cache(cache: AnswerCache) -> impl Filter<Extract = (AnswerCache,), Error = Infallible> + Clone {
    warp::any().map(move || cache.clone())
}
