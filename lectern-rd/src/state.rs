//! Shared narration state
//!
//! Thread-safe state shared between the narrator actor (sole writer) and the
//! HTTP handlers (readers). Event broadcasting to SSE clients goes through
//! the common EventBus.

use crate::speech::engine::Voice;
use lectern_common::events::{EventBus, ReaderEvent};
use serde::Serialize;
use tokio::sync::{broadcast, RwLock};

/// Read-only snapshot of the narrator for rendering
#[derive(Debug, Clone, Serialize)]
pub struct NarrationSnapshot {
    /// Whether the platform has a usable speech engine with voices
    pub supported: bool,
    pub is_playing: bool,
    pub is_paused: bool,
    pub rate: f32,
    pub current_segment: usize,
    pub segment_count: usize,
    pub has_ever_started: bool,
}

impl Default for NarrationSnapshot {
    fn default() -> Self {
        Self {
            supported: false,
            is_playing: false,
            is_paused: false,
            rate: 1.0,
            current_segment: 0,
            segment_count: 0,
            has_ever_started: false,
        }
    }
}

/// Shared state accessible by all components
pub struct SharedState {
    /// Latest narrator snapshot
    snapshot: RwLock<NarrationSnapshot>,

    /// Voices reported by the engine at startup
    voices: RwLock<Vec<Voice>>,

    /// Event broadcaster for SSE events
    events: EventBus,
}

impl SharedState {
    /// Create new shared state with default values
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(NarrationSnapshot::default()),
            voices: RwLock::new(Vec::new()),
            events: EventBus::new(100),
        }
    }

    /// Broadcast an event to all SSE listeners
    pub fn broadcast_event(&self, event: ReaderEvent) {
        self.events.emit_lossy(event);
    }

    /// Subscribe to the event stream for SSE
    pub fn subscribe_events(&self) -> broadcast::Receiver<ReaderEvent> {
        self.events.subscribe()
    }

    /// Get the latest narrator snapshot
    pub async fn snapshot(&self) -> NarrationSnapshot {
        self.snapshot.read().await.clone()
    }

    /// Replace the narrator snapshot (narrator actor only)
    pub async fn set_snapshot(&self, snapshot: NarrationSnapshot) {
        *self.snapshot.write().await = snapshot;
    }

    /// Get the voices reported by the engine
    pub async fn voices(&self) -> Vec<Voice> {
        self.voices.read().await.clone()
    }

    /// Record the engine's voices (set once at startup)
    pub async fn set_voices(&self, voices: Vec<Voice>) {
        *self.voices.write().await = voices;
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
