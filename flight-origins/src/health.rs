//! Health check handler

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{cache::CacheStats, state::AppState};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Time the report was produced
    pub timestamp: DateTime<Utc>,

    /// Version
    pub version: String,

    /// Live cache entries
    pub cache_size: usize,

    /// Cache sizing
    pub cache_info: CacheInfo,

    /// Configured rate limit expression, or `disabled`
    pub rate_limit: String,
}

/// Cache sizing as reported by `/health`
#[derive(Debug, Serialize, Deserialize)]
pub struct CacheInfo {
    pub current_size: usize,
    pub maxsize: usize,
    /// Seconds
    pub ttl: u64,
}

impl From<CacheStats> for CacheInfo {
    fn from(stats: CacheStats) -> Self {
        Self {
            current_size: stats.current_size,
            maxsize: stats.max_size,
            ttl: stats.ttl.as_secs(),
        }
    }
}

/// Liveness report with cache and rate limit details
///
/// Always returns 200 OK while the process is serving.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.cache_stats().await;
    let rate_limit = if state.config().rate_limit.enabled {
        state.config().rate_limit.limit.clone()
    } else {
        "disabled".to_string()
    };

    let response = HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cache_size: stats.current_size,
        cache_info: stats.into(),
        rate_limit,
    };

    (StatusCode::OK, Json(response))
}
