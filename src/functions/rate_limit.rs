/// Rate limiting for the functions server
use crate::config::RateLimitConfig;
use crate::error::PartnerError;
use crate::functions::FunctionsContext;
use crate::metrics;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::num::NonZeroU32;

/// In-memory limiter over all function requests
pub struct FunctionRateLimiter {
    limiter: Option<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl FunctionRateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        if !config.enabled {
            return Self { limiter: None };
        }

        let quota = Quota::per_second(
            NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::new(50).unwrap()),
        )
        .allow_burst(NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::new(25).unwrap()));

        Self {
            limiter: Some(GovernorLimiter::direct(quota)),
        }
    }

    /// Check the limit for one incoming request
    pub fn check(&self) -> Result<(), PartnerError> {
        match &self.limiter {
            None => Ok(()),
            Some(limiter) => match limiter.check() {
                Ok(_) => Ok(()),
                Err(_) => Err(PartnerError::RateLimited {
                    retry_after: std::time::Duration::from_secs(1),
                }),
            },
        }
    }
}

/// Axum middleware applying the limiter to every request
pub async fn rate_limit_middleware(
    State(ctx): State<FunctionsContext>,
    req: Request,
    next: Next,
) -> Result<Response, PartnerError> {
    if let Err(e) = ctx.limiter.check() {
        metrics::RATE_LIMITED_REQUESTS.inc();
        return Err(e);
    }

    Ok(next.run(req).await)
}
