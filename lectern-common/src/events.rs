//! Event types for the Lectern event system
//!
//! Lectern uses hybrid communication:
//! - **EventBus** (tokio::broadcast): one-to-many event broadcasting
//! - **Command channels** (tokio::mpsc): request → single handler
//! - **Shared state** (Arc<RwLock<T>>): read-heavy access
//!
//! Every event that reaches the UI (via SSE) is a `ReaderEvent`.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Lectern event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReaderEvent {
    /// Playback state changed
    PlaybackStateChanged {
        state: PlaybackState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A segment began narrating (also emitted with index 0 on stop,
    /// so the UI cursor resets in lockstep)
    SegmentChanged {
        index: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A narration session began (new segment source accepted)
    NarrationStarted {
        session_id: Uuid,
        segment_count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Narration ran past the last narratable segment
    NarrationCompleted {
        session_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback rate changed (already clamped)
    RateChanged {
        rate: f32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl ReaderEvent {
    /// Get event type as string for SSE event-field tagging and filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            ReaderEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
            ReaderEvent::SegmentChanged { .. } => "SegmentChanged",
            ReaderEvent::NarrationStarted { .. } => "NarrationStarted",
            ReaderEvent::NarrationCompleted { .. } => "NarrationCompleted",
            ReaderEvent::RateChanged { .. } => "RateChanged",
        }
    }
}

/// User-visible playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    Paused,
    Stopped,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
            PlaybackState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Broadcast event bus shared by all Lectern components
///
/// Backed by tokio::broadcast, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ReaderEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ReaderEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ReaderEvent,
    ) -> std::result::Result<usize, broadcast::error::SendError<ReaderEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the no-subscriber case
    ///
    /// For events where it's acceptable that no component is listening yet
    /// (e.g. state changes before the first SSE client connects).
    pub fn emit_lossy(&self, event: ReaderEvent) {
        if let Err(e) = self.tx.send(event) {
            tracing::trace!("No subscribers for event: {}", e.0.event_type());
        }
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
