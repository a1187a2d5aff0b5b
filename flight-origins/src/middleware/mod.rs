//! Middleware for rate limiting and request tracking

pub mod rate_limit;
pub mod request_tracking;

pub use rate_limit::{enforce_rate_limit, ClientRateLimiter, RateLimitRule};
pub use request_tracking::{
    request_id_layer, request_id_propagation_layer, sensitive_headers_layer, MakeUuidRequestId,
    SENSITIVE_HEADERS,
};
