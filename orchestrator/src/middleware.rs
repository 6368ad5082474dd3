use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use warp::{Filter, Rejection};

use crate::error::ApiError;

pub type Limiter = Arc<DefaultDirectRateLimiter>;

pub fn cors() -> warp::cors::Builder {
    warp::cors()
        .allow_any_origin()
        .allow_headers(vec![
            "User-Agent",
            "Sec-Fetch-Mode",
            "Referer",
            "Origin",
            "Access-Control-Request-Method",
            "Access-Control-Request-Headers",
            "Content-Type",
            "Authorization",
            "Accept",
            "Content-Length",
        ])
        .allow_methods(vec!["POST", "GET", "OPTIONS", "DELETE", "PUT"])
}

pub fn rate_limiter(per_minute: u32) -> Limiter {
    let per_minute = NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::direct(Quota::per_minute(per_minute)))
}

/// Rejects with `RateLimitExceeded` once the shared quota is spent.
pub fn rate_limit(limiter: Limiter) -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::any()
        .and_then(move || {
            let limiter = limiter.clone();
            async move {
                match limiter.check() {
                    Ok(()) => Ok(()),
                    Err(_) => Err(warp::reject::custom(ApiError::RateLimitExceeded)),
                }
            }
        })
        .untuple_one()
}
