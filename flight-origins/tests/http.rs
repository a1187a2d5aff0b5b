use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::extract::ConnectInfo;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use flight_origins::prelude::*;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

type Respond = Box<dyn Fn() -> Result<Value> + Send + Sync>;

struct StubSource {
    respond: Respond,
    calls: AtomicUsize,
}

impl StubSource {
    fn new(respond: impl Fn() -> Result<Value> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            respond: Box::new(respond),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScheduleSource for StubSource {
    async fn fetch_arrivals(&self, _code: &AirportCode) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.respond)()
    }
}

fn schedule(countries: &[&str]) -> Value {
    let data: Vec<Value> = countries
        .iter()
        .map(|country| {
            json!({ "flight": { "airport": { "origin": { "position": {
                "country": { "name": country }
            } } } } })
        })
        .collect();
    json!([{ "airport": { "pluginData": { "schedule": { "arrivals": { "data": data } } } } }])
}

fn config() -> Config {
    let mut config = Config::default();
    config.flight_api.api_key = "test-key".to_string();
    config
}

fn app_with(config: Config, source: Arc<StubSource>) -> Router {
    let state = AppState::builder()
        .config(config.clone())
        .source(source)
        .build()
        .unwrap();
    Server::new(config).app(state)
}

fn app(source: Arc<StubSource>) -> Router {
    app_with(config(), source)
}

fn submit(code: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/flights")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("airport_code={}", code)))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn from_client(mut request: Request<Body>, addr: &str) -> Request<Body> {
    let addr: SocketAddr = addr.parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(addr));
    request
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_home_renders_form() {
    let response = app(StubSource::new(|| Ok(json!([]))))
        .oneshot(get("/"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let html = body_text(response).await;
    assert!(html.contains("name=\"airport_code\""));
}

#[tokio::test]
async fn test_home_shows_error_from_query() {
    let response = app(StubSource::new(|| Ok(json!([]))))
        .oneshot(get("/?error=Something%20went%20wrong"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Something went wrong"));
}

#[tokio::test]
async fn test_invalid_code_never_reaches_source() {
    let source = StubSource::new(|| Ok(schedule(&["France"])));
    let app = app(source.clone());

    for input in ["LHRX", "LH", ""] {
        let response = app.clone().oneshot(submit(input)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "input {input:?}");
        let html = body_text(response).await;
        assert!(html.contains("Please enter a valid 3-letter airport code"));
        assert!(html.contains(&format!("value=\"{}\"", input)));
    }

    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn test_ranking_is_rendered_and_cached() {
    let source = StubSource::new(|| Ok(schedule(&["Germany", "France", "France"])));
    let app = app(source.clone());

    let response = app.clone().oneshot(submit("lhr")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("LHR"));
    let france = html.find("France").unwrap();
    let germany = html.find("Germany").unwrap();
    assert!(france < germany);

    let again = body_text(app.clone().oneshot(submit("LHR")).await.unwrap()).await;
    assert_eq!(html, again);
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_minimal_configuration_refetches() {
    let source = StubSource::new(|| Ok(schedule(&["France"])));
    let mut config = config();
    config.cache.enabled = false;
    config.rate_limit.enabled = false;
    config.flight_api.max_attempts = 1;
    let app = app_with(config, source.clone());

    for _ in 0..2 {
        let response = app.clone().oneshot(submit("CDG")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_empty_schedule_is_not_found() {
    let source = StubSource::new(|| Ok(json!([])));
    let app = app(source.clone());

    let response = app.clone().oneshot(submit("xyz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response)
        .await
        .contains("No flight data found for airport code: XYZ"));

    // Not cached
    app.oneshot(submit("XYZ")).await.unwrap();
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_timeout_is_gateway_timeout() {
    let source = StubSource::new(|| Err(Error::Timeout(Duration::from_secs(60))));
    let response = app(source).oneshot(submit("JFK")).await.unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let html = body_text(response).await;
    assert!(html.contains("Request timed out after 60 seconds"));
    assert!(html.contains("value=\"JFK\""));
}

#[tokio::test]
async fn test_upstream_error_surfaces_status_and_body() {
    let source = StubSource::new(|| {
        Err(Error::Upstream {
            status: 401,
            body: "Invalid API key".to_string(),
        })
    });
    let response = app(source).oneshot(submit("JFK")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(body_text(response)
        .await
        .contains("API Error: 401 - Invalid API key"));
}

#[tokio::test]
async fn test_unexpected_error_is_reported() {
    let source = StubSource::new(|| Err(Error::Unexpected("connection reset".to_string())));
    let response = app(source).oneshot(submit("JFK")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(response)
        .await
        .contains("An unexpected error occurred: connection reset"));
}

#[tokio::test]
async fn test_health_report() {
    let source = StubSource::new(|| Ok(schedule(&["France"])));
    let app = app(source);
    app.clone().oneshot(submit("LHR")).await.unwrap();

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["cache_size"], 1);
    assert_eq!(body["cache_info"]["current_size"], 1);
    assert_eq!(body["cache_info"]["maxsize"], 100);
    assert_eq!(body["cache_info"]["ttl"], 300);
    assert_eq!(body["rate_limit"], "30/minute");

    let timestamp = body["timestamp"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
}

#[tokio::test]
async fn test_thirty_first_request_is_rejected_before_lookup() {
    let source = StubSource::new(|| Ok(schedule(&["France"])));
    let app = app(source.clone());
    let client = "203.0.113.9:50000";

    for _ in 0..30 {
        let response = app
            .clone()
            .oneshot(from_client(get("/health"), client))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(from_client(submit("LHR"), client))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = response.headers()[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after >= 1);

    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["code"], "RATE_LIMIT_EXCEEDED");
    assert_eq!(body["status"], 429);
    assert_eq!(source.calls(), 0);

    // Another client still has its full allowance
    let response = app
        .oneshot(from_client(submit("LHR"), "203.0.113.10:50000"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_rate_limit_disabled() {
    let mut config = config();
    config.rate_limit.enabled = false;
    let app = app_with(config, StubSource::new(|| Ok(json!([]))));

    for _ in 0..40 {
        let response = app.clone().oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    let body: Value =
        serde_json::from_str(&body_text(app.oneshot(get("/health")).await.unwrap()).await).unwrap();
    assert_eq!(body["rate_limit"], "disabled");
}
