use thiserror::Error;
use warp::http::StatusCode;
use warp::{reject::Reject, Rejection, Reply};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Pipeline error: {0}")]
    PipelineError(#[from] PipelineError),

    #[error("Upstream service error: {0:#}")]
    UpstreamError(anyhow::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}

impl Reject for ApiError {}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::UpstreamError(err)
    }
}

/// Failures that end a corrective RAG run without an answer.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("retrieval failed: {0:#}")]
    Retrieval(anyhow::Error),

    #[error("generation failed: {0:#}")]
    Generation(anyhow::Error),

    #[error("web search failed: {0:#}")]
    WebSearch(anyhow::Error),

    #[error("gave up after {steps} steps without producing an answer")]
    NoAnswer { steps: usize },
}

pub fn reject(err: impl Into<ApiError>) -> Rejection {
    warp::reject::custom(err.into())
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Rejection> {
    if let Some(api_err) = err.find::<ApiError>() {
        let (code, message) = match api_err {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "Resource not found"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "Bad request"),
            ApiError::RateLimitExceeded => (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded"),
            ApiError::PipelineError(PipelineError::NoAnswer { .. }) => {
                (StatusCode::GATEWAY_TIMEOUT, "No answer could be produced")
            }
            ApiError::PipelineError(_) | ApiError::UpstreamError(_) | ApiError::HttpError(_) => {
                (StatusCode::BAD_GATEWAY, "Upstream service failed")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        };

        let json = warp::reply::json(&serde_json::json!({
            "error": message,
            "details": api_err.to_string(),
        }));

        Ok(warp::reply::with_status(json, code))
    } else {
        Err(err)
    }
}
