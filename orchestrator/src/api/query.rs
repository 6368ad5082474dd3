use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};
use warp::{Rejection, Reply};

use super::AnswerCache;
use crate::agents::{Generate, RetrieveWithin, SRAG_EVENTS_CHANNEL};
use crate::error::{reject, ApiError, PipelineError};
use crate::graph::CorrectiveRag;
use crate::models::{QuestionParams, RagResponse, SragResponse};
use crate::redis_client::answer_key;

fn validated(params: &QuestionParams) -> Result<&str, Rejection> {
    let question = params.question.trim();
    if question.is_empty() {
        return Err(reject(ApiError::BadRequest("question must not be empty".to_string())));
    }
    Ok(question)
}

/// Runs the corrective RAG loop. Useful answers are cached; every finished run is published.
pub async fn handle_srag(
    params: QuestionParams,
    pipeline: Arc<CorrectiveRag>,
    cache: AnswerCache,
) -> Result<impl Reply, Rejection> {
    let question = validated(&params)?;
    let key = answer_key(question);

    if let Some(mut redis) = cache.redis.clone() {
        match redis.get::<SragResponse>(&key).await {
            Ok(Some(cached)) => {
                info!("Serving cached answer for '{}'", question);
                return Ok(warp::reply::json(&cached.asked_as(question)));
            }
            Ok(None) => {}
            Err(e) => warn!("Answer cache lookup failed: {:#}", e),
        }
    }

    let answer = pipeline.answer(question).await.map_err(reject)?;
    let response = SragResponse::from(answer);
    info!("Question finished as {} after {} steps", response.status, response.steps);

    if let Some(mut redis) = cache.redis {
        if response.status == "useful" {
            if let Err(e) = redis.set_with_expiry(&key, &response, cache.ttl_secs).await {
                warn!("Failed to cache answer: {:#}", e);
            }
        }
        let event = json!({
            "question": response.question,
            "status": response.status,
            "steps": response.steps,
        });
        if let Err(e) = redis.publish(SRAG_EVENTS_CHANNEL, &event.to_string()).await {
            warn!("Failed to publish run event: {:#}", e);
        }
    }

    Ok(warp::reply::json(&response))
}

/// Single retrieve-then-generate pass over one reference, without grading.
pub async fn handle_rag_answer(
    reference_id: String,
    params: QuestionParams,
    retriever: Arc<dyn RetrieveWithin>,
    pipeline: Arc<CorrectiveRag>,
) -> Result<impl Reply, Rejection> {
    let question = validated(&params)?;

    let documents = retriever
        .retrieve_within(question, std::slice::from_ref(&reference_id))
        .await
        .map_err(|e| reject(PipelineError::Retrieval(e)))?;
    let answer = pipeline
        .agents()
        .generator
        .generate(question, &documents)
        .await
        .map_err(|e| reject(PipelineError::Generation(e)))?;

    Ok(warp::reply::json(&RagResponse {
        reference_id,
        question: question.to_string(),
        answer,
        sources: documents.len(),
    }))
}
