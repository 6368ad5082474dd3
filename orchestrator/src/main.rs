use std::sync::Arc;

use tracing::{info, warn};
use warp::Filter;

mod agents;
mod api;
mod config;
mod db;
mod error;
mod graph;
mod metrics;
mod middleware;
mod models;
mod redis_client;
mod vector_index;

use agents::doc_store::DocumentStore;
use agents::llm::LlmClient;
use agents::retriever::RetrieverAgent;
use agents::Agents;
use graph::CorrectiveRag;
use vector_index::VectorIndex;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    info!("Starting corrective RAG orchestrator");

    let db_pool = db::create_pool(&config.database_url).await?;
    info!("Database connection pool created");

    sqlx::migrate!("./migrations").run(&db_pool).await?;
    info!("Database migrations applied");

    // Answers are still served without the cache
    let redis = match redis_client::RedisClient::new(&config.redis_url).await {
        Ok(client) => {
            info!("Redis connection established");
            Some(client)
        }
        Err(e) => {
            warn!("Redis unavailable, answer cache disabled: {:#}", e);
            None
        }
    };

    let http = reqwest::Client::new();
    let index = VectorIndex::new(
        http.clone(),
        config.embedding_service_url.clone(),
        config.vector_db_service_url.clone(),
    );
    let store = DocumentStore::new(db_pool.clone(), index.clone());
    let retriever = Arc::new(RetrieverAgent::new(
        store.clone(),
        index.clone(),
        config.retrieval_top_k,
    ));
    let llm = Arc::new(LlmClient::new(http.clone(), &config));
    let agents = Agents::new(&config, llm, retriever.clone(), http.clone());
    let limits = config.loop_limits();
    info!(
        max_retrieval_attempts = limits.max_retrieval_attempts,
        max_generation_attempts = limits.max_generation_attempts,
        max_steps = limits.max_steps,
        "Corrective RAG loop configured"
    );
    let pipeline = Arc::new(CorrectiveRag::new(agents, limits));

    let api_routes = api::routes(api::AppContext {
        db_pool,
        redis,
        http,
        ingestion_url: config.ingestion_service_url.trim_end_matches('/').to_string(),
        index,
        store,
        retriever,
        pipeline,
        limiter: middleware::rate_limiter(config.rate_limit_per_minute),
        cache_ttl_secs: config.srag_cache_ttl_secs,
    });

    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::json(&serde_json::json!({"status": "healthy"})));

    let metrics = warp::path("metrics").and(warp::get()).map(|| {
        use prometheus::{Encoder, TextEncoder};
        let encoder = TextEncoder::new();
        let mut buffer = vec![];
        if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
            warn!("Failed to encode metrics: {}", e);
        }
        warp::reply::with_header(buffer, "Content-Type", encoder.format_type())
    });

    let routes = health
        .or(metrics)
        .or(api_routes)
        .recover(error::handle_rejection)
        .with(warp::log("api"))
        .with(middleware::cors());

    let addr = ([0, 0, 0, 0], config.port);
    info!("Server listening on {}", addr.1);

    warp::serve(routes).run(addr).await;

    Ok(())
}
