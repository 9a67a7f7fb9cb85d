//! HTTP router setup
//!
//! Builds the Axum router with control endpoints and the SSE stream. The
//! binary binds and serves it; tests drive it in-process.

use crate::config::FetchConfig;
use crate::narrator::NarratorHandle;
use crate::state::SharedState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application context passed to all handlers
///
/// Implements Clone, which gives `FromRef<AppContext>` for free via Axum's
/// blanket implementation.
#[derive(Clone)]
pub struct AppContext {
    pub state: Arc<SharedState>,
    pub narrator: NarratorHandle,
    /// Client for content fetching (timeout and UA set at startup)
    pub http: reqwest::Client,
    pub fetch: FetchConfig,
}

/// Create the API router
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        // Health endpoint
        .route("/health", get(super::handlers::health))
        // Narration control
        .route("/narration/speak", post(super::handlers::speak))
        .route("/narration/pause", post(super::handlers::pause))
        .route("/narration/resume", post(super::handlers::resume))
        .route("/narration/stop", post(super::handlers::stop))
        .route("/narration/jump", post(super::handlers::jump))
        .route("/narration/rate", post(super::handlers::set_rate))
        .route("/narration/state", get(super::handlers::get_state))
        .route("/narration/voices", get(super::handlers::get_voices))
        // Content acquisition glue
        .route("/content/fetch", post(super::handlers::fetch_content))
        // SSE event stream
        .route("/events", get(super::sse::event_stream))
        // Attach application context
        .with_state(ctx)
        // Request tracing and CORS for local UI access
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
