//! Route handlers and the application router

use axum::{
    extract::{Query, State},
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;

use crate::{
    airport::AirportCode,
    error::Result,
    health::health,
    middleware::rate_limit::enforce_rate_limit,
    pipeline::RankedResult,
    state::AppState,
    templates::{lookup_page, HtmlTemplate, IndexPage},
};

/// Query string accepted by `GET /`
#[derive(Debug, Default, Deserialize)]
pub struct HomeQuery {
    /// Message to show above the form
    pub error: Option<String>,
}

/// Body of `POST /flights`
#[derive(Debug, Default, Deserialize)]
pub struct LookupForm {
    /// Submitted code, exactly as typed; a missing field counts as empty
    #[serde(default)]
    pub airport_code: String,
}

/// Render the lookup form
pub async fn home(Query(query): Query<HomeQuery>) -> impl IntoResponse {
    HtmlTemplate::new(IndexPage::form(query.error))
}

/// Validate the submitted code and render its ranking or the failure
pub async fn flights(State(state): State<AppState>, Form(form): Form<LookupForm>) -> impl IntoResponse {
    let outcome = lookup(&state, &form.airport_code).await;
    lookup_page(&form.airport_code, outcome)
}

async fn lookup(state: &AppState, raw: &str) -> Result<(AirportCode, RankedResult)> {
    let code = AirportCode::parse(raw)?;
    let ranked = state.lookup().arrivals_by_country(&code).await?;
    Ok((code, ranked))
}

/// Build the application router
///
/// When rate limiting is enabled every route shares one per-client limiter,
/// which runs before any handler work.
pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/", get(home))
        .route("/flights", post(flights))
        .route("/health", get(health));

    let routes = match state.limiter().cloned() {
        Some(limiter) => routes.route_layer(from_fn_with_state(limiter, enforce_rate_limit)),
        None => routes,
    };

    routes.with_state(state)
}
