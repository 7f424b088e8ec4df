use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use fable_api::config::ServerConfig;
use fable_api::router::build_app_router;
use fable_api::state::AppState;
use fable_provider::PollConfig;

/// Build a test `ServerConfig` pointing at the given mock base URLs.
///
/// Poll timings are millisecond-scale so generation tests finish quickly.
pub fn test_config(provider_base: &str, llm_base: &str) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        provider_base_url: provider_base.to_string(),
        provider_api_key: "test-key".to_string(),
        llm_base_url: llm_base.to_string(),
        llm_api_key: "test-key".to_string(),
        generation_poll: PollConfig {
            initial_delay: Duration::from_millis(10),
            interval: Duration::from_millis(10),
            max_attempts: 5,
        },
    }
}

/// Build the full application router plus its state, so tests can seed
/// snapshots and stories directly.
///
/// This mirrors the router construction in `main.rs`, so integration tests
/// exercise the same middleware stack (CORS, request ID, timeout, tracing,
/// panic recovery) that production uses.
pub fn build_test_app(provider_base: &str, llm_base: &str) -> (Router, AppState) {
    let config = test_config(provider_base, llm_base);
    let state = AppState::from_config(config.clone());
    let app = build_app_router(state.clone(), &config);
    (app, state)
}

/// Serve a mock upstream (provider or LLM) on a loopback port.
pub async fn serve_mock(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve mock");
    });
    format!("http://{addr}")
}

/// Send a GET request to the app.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    app.oneshot(request).await.expect("send request")
}

/// Send a JSON request with the given method to the app.
pub async fn send_json(
    app: Router,
    method: Method,
    uri: &str,
    body: serde_json::Value,
) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("build request");
    app.oneshot(request).await.expect("send request")
}

/// Collect a response body into JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body is JSON")
}
