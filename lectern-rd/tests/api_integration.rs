//! API integration tests
//!
//! Drives the Axum router in-process. Control endpoints run against a
//! scripted engine; capability degradation runs against the voiceless
//! NullEngine.


use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use fake_engine::{FakeEngine, FakeEngineHandle};
use http_body_util::BodyExt;
use lectern_rd::api::{create_router, AppContext};
use lectern_rd::config::{FetchConfig, NarrationConfig};
use lectern_rd::narrator::Narrator;
use lectern_rd::speech::engine::NullEngine;
use lectern_rd::state::SharedState;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn fast_tuning() -> NarrationConfig {
    NarrationConfig {
        cancel_settle_ms: 10,
        advance_delay_ms: 10,
        stop_settle_ms: 20,
        ..NarrationConfig::default()
    }
}

/// Router backed by the scripted engine (narration supported)
fn scripted_app() -> (Router, FakeEngineHandle, Arc<SharedState>) {
    let state = Arc::new(SharedState::new());
    let (engine, engine_rx, handle) = FakeEngine::new();
    let narrator = Narrator::spawn(
        Box::new(engine),
        engine_rx,
        fast_tuning(),
        Arc::clone(&state),
    );
    let ctx = AppContext {
        state: Arc::clone(&state),
        narrator,
        http: reqwest::Client::new(),
        fetch: FetchConfig::default(),
    };
    (create_router(ctx), handle, state)
}

/// Router backed by the voiceless engine (narration unsupported)
fn unsupported_app() -> Router {
    let state = Arc::new(SharedState::new());
    let (engine, engine_rx) = NullEngine::new();
    let narrator = Narrator::spawn(
        Box::new(engine),
        engine_rx,
        fast_tuning(),
        Arc::clone(&state),
    );
    let ctx = AppContext {
        state,
        narrator,
        http: reqwest::Client::new(),
        fetch: FetchConfig::default(),
    };
    create_router(ctx)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _engine, _state) = scripted_app();

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["module"], "reader_daemon");
}

#[tokio::test]
async fn test_speak_then_state_reports_playing() {
    let (app, engine, _state) = scripted_app();

    let response = app
        .clone()
        .oneshot(post_json(
            "/narration/speak",
            r#"{"text": "First paragraph, long enough to narrate.\n\nSecond paragraph, also long enough."}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["segment_count"], 2);
    assert_eq!(json["supported"], true);

    // Poll state until the first utterance starts
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let response = app.clone().oneshot(get("/narration/state")).await.unwrap();
        let state = json_body(response).await;
        if state["is_playing"] == true {
            assert_eq!(state["current_segment"], 0);
            assert_eq!(state["segment_count"], 2);
            break;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("narration never started; last state: {}", state);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert_eq!(engine.speak_count(), 1);
}

#[tokio::test]
async fn test_speak_requires_text_or_segments() {
    let (app, _engine, _state) = scripted_app();

    let response = app
        .oneshot(post_json("/narration/speak", r#"{}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_speak_rejects_out_of_range_start_index() {
    let (app, _engine, _state) = scripted_app();

    let response = app
        .oneshot(post_json(
            "/narration/speak",
            r#"{"segments": ["Only one segment, long enough."], "start_index": 5}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rate_endpoint_reports_clamped_value() {
    let (app, _engine, _state) = scripted_app();

    let response = app
        .clone()
        .oneshot(post_json("/narration/rate", r#"{"rate": 5.0}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["rate"], 2.0);

    let response = app
        .oneshot(post_json("/narration/rate", r#"{"rate": 0.01}"#))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["rate"], 0.5);
}

#[tokio::test]
async fn test_transport_controls_accept_empty_bodies() {
    let (app, _engine, _state) = scripted_app();

    for uri in ["/narration/pause", "/narration/resume", "/narration/stop"] {
        let response = app.clone().oneshot(post_empty(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "POST {}", uri);
    }

    let response = app
        .oneshot(post_json("/narration/jump", r#"{"index": 3}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_voices_listed_from_engine() {
    let (app, _engine, _state) = scripted_app();

    // Voices are recorded asynchronously at narrator startup
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let response = app.clone().oneshot(get("/narration/voices")).await.unwrap();
        let json = json_body(response).await;
        if json["voices"].as_array().is_some_and(|v| !v.is_empty()) {
            assert_eq!(json["voices"][0]["id"], "fake-en");
            break;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("voices never populated: {}", json);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn test_unsupported_engine_degrades_speak() {
    let app = unsupported_app();

    let response = app
        .clone()
        .oneshot(post_json(
            "/narration/speak",
            r#"{"text": "Some text that is long enough to narrate."}"#,
        ))
        .await
        .unwrap();
    // Not an error: surfaced as a capability flag
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["supported"], false);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let response = app.oneshot(get("/narration/state")).await.unwrap();
    let state = json_body(response).await;
    assert_eq!(state["is_playing"], false);
    assert_eq!(state["supported"], false);
}

#[tokio::test]
async fn test_content_fetch_rejects_non_http_url() {
    let (app, _engine, _state) = scripted_app();

    let response = app
        .oneshot(post_json("/content/fetch", r#"{"url": "ftp://example.com"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_events_endpoint_streams() {
    let (app, _engine, _state) = scripted_app();

    let response = app.oneshot(get("/events")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/event-stream"));
}
