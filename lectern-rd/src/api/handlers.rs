//! HTTP request handlers
//!
//! Implements REST endpoints for narration control and content acquisition.
//! Handlers stay thin: translate JSON to narrator commands and read the
//! shared snapshot back.

use crate::api::server::AppContext;
use crate::content;
use crate::speech::engine::Voice;
use crate::state::NarrationSnapshot;
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
pub struct SpeakRequest {
    /// Raw text, segmented server-side
    pub text: Option<String>,
    /// Pre-segmented source, used verbatim when present
    pub segments: Option<Vec<String>>,
    #[serde(default)]
    pub start_index: usize,
    /// Optional rate override applied before narration begins (clamped)
    pub rate: Option<f32>,
}

#[derive(Debug, Serialize)]
pub struct SpeakResponse {
    supported: bool,
    segment_count: usize,
    start_index: usize,
}

#[derive(Debug, Deserialize)]
pub struct JumpRequest {
    index: usize,
}

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    rate: f32,
}

#[derive(Debug, Serialize)]
pub struct RateResponse {
    /// The clamped rate actually applied
    rate: f32,
}

#[derive(Debug, Serialize)]
pub struct VoicesResponse {
    voices: Vec<Voice>,
}

#[derive(Debug, Deserialize)]
pub struct FetchRequest {
    url: String,
}

#[derive(Debug, Serialize)]
pub struct FetchResponse {
    title: Option<String>,
    segments: Vec<String>,
}

type HandlerError = (StatusCode, Json<StatusResponse>);

fn bad_request(message: impl Into<String>) -> HandlerError {
    (
        StatusCode::BAD_REQUEST,
        Json(StatusResponse {
            status: format!("error: {}", message.into()),
        }),
    )
}

fn internal_error(e: impl std::fmt::Display) -> HandlerError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(StatusResponse {
            status: format!("error: {}", e),
        }),
    )
}

// ============================================================================
// Health Endpoint
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "reader_daemon".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Narration Control Endpoints
// ============================================================================

/// POST /narration/speak - Begin narrating a new segment source
pub async fn speak(
    State(ctx): State<AppContext>,
    Json(req): Json<SpeakRequest>,
) -> Result<Json<SpeakResponse>, HandlerError> {
    let segments = match (req.segments, req.text) {
        (Some(segments), _) => segments,
        (None, Some(text)) => content::split_segments(&text),
        (None, None) => return Err(bad_request("provide 'segments' or 'text'")),
    };

    if segments.is_empty() {
        return Err(bad_request("segment source is empty"));
    }
    if req.start_index >= segments.len() {
        return Err(bad_request(format!(
            "start_index {} out of range (0..{})",
            req.start_index,
            segments.len()
        )));
    }

    let segment_count = segments.len();
    info!(
        "Speak request: {} segments, starting at {}",
        segment_count, req.start_index
    );

    if let Some(rate) = req.rate {
        if !rate.is_finite() {
            return Err(bad_request("rate must be a finite number"));
        }
        ctx.narrator.set_rate(rate).map_err(internal_error)?;
    }

    let snapshot = ctx.state.snapshot().await;
    ctx.narrator
        .speak(segments, req.start_index)
        .map_err(internal_error)?;

    Ok(Json(SpeakResponse {
        supported: snapshot.supported,
        segment_count,
        start_index: req.start_index,
    }))
}

/// POST /narration/pause - Pause at segment granularity
pub async fn pause(State(ctx): State<AppContext>) -> Result<Json<StatusResponse>, HandlerError> {
    info!("Pause command received");
    ctx.narrator.pause().map_err(internal_error)?;
    Ok(Json(StatusResponse {
        status: "ok".to_string(),
    }))
}

/// POST /narration/resume - Resume the paused segment from its beginning
pub async fn resume(State(ctx): State<AppContext>) -> Result<Json<StatusResponse>, HandlerError> {
    info!("Resume command received");
    ctx.narrator.resume().map_err(internal_error)?;
    Ok(Json(StatusResponse {
        status: "ok".to_string(),
    }))
}

/// POST /narration/stop - Stop and reset the cursor (idempotent)
pub async fn stop(State(ctx): State<AppContext>) -> Result<Json<StatusResponse>, HandlerError> {
    info!("Stop command received");
    ctx.narrator.stop().map_err(internal_error)?;
    Ok(Json(StatusResponse {
        status: "ok".to_string(),
    }))
}

/// POST /narration/jump - Jump to a segment and play from there
pub async fn jump(
    State(ctx): State<AppContext>,
    Json(req): Json<JumpRequest>,
) -> Result<Json<StatusResponse>, HandlerError> {
    info!("Jump command received: segment {}", req.index);
    ctx.narrator.jump_to(req.index).map_err(internal_error)?;
    Ok(Json(StatusResponse {
        status: "ok".to_string(),
    }))
}

/// POST /narration/rate - Set playback rate (clamped, never rejected)
pub async fn set_rate(
    State(ctx): State<AppContext>,
    Json(req): Json<RateRequest>,
) -> Result<Json<RateResponse>, HandlerError> {
    if !req.rate.is_finite() {
        return Err(bad_request("rate must be a finite number"));
    }
    let applied = ctx.narrator.set_rate(req.rate).map_err(internal_error)?;
    info!("Rate set to {} (requested {})", applied, req.rate);
    Ok(Json(RateResponse { rate: applied }))
}

/// GET /narration/state - Current narrator snapshot
pub async fn get_state(State(ctx): State<AppContext>) -> Json<NarrationSnapshot> {
    Json(ctx.state.snapshot().await)
}

/// GET /narration/voices - Voices reported by the engine
pub async fn get_voices(State(ctx): State<AppContext>) -> Json<VoicesResponse> {
    Json(VoicesResponse {
        voices: ctx.state.voices().await,
    })
}

// ============================================================================
// Content Acquisition
// ============================================================================

/// POST /content/fetch - Fetch a page and return its narratable segments
pub async fn fetch_content(
    State(ctx): State<AppContext>,
    Json(req): Json<FetchRequest>,
) -> Result<Json<FetchResponse>, HandlerError> {
    if !req.url.starts_with("http://") && !req.url.starts_with("https://") {
        return Err(bad_request("url must be http(s)"));
    }

    match content::fetch_article(&ctx.http, &req.url, ctx.fetch.max_body_bytes).await {
        Ok(article) => {
            let segments = content::split_segments(&article.text);
            Ok(Json(FetchResponse {
                title: article.title,
                segments,
            }))
        }
        Err(e) => {
            error!("Content fetch failed: {}", e);
            Err((
                StatusCode::BAD_GATEWAY,
                Json(StatusResponse {
                    status: format!("error: {}", e),
                }),
            ))
        }
    }
}
