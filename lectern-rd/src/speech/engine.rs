//! Speech engine adapter contract
//!
//! The engine is a shared, mutable, single-slot resource: at most one
//! utterance is in flight, `cancel` aborts it asynchronously, and lifecycle
//! callbacks arrive on the adapter's own thread. Adapters forward those
//! callbacks as [`EngineEvent`]s over an unbounded channel created at
//! construction; the narrator actor is the only consumer.
//!
//! Engine-level pause/resume is deliberately not part of this contract:
//! platform support is inconsistent, and the narrator implements pause at
//! segment granularity on top of `cancel` instead.

use crate::error::Result;
use serde::Serialize;
use tokio::sync::mpsc;

/// Utterance lifecycle events, delivered asynchronously by the adapter
///
/// A cancelled utterance surfaces as `Ended` just like a natural completion;
/// the narrator's transition-intent guard tells the two apart.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The in-flight utterance began vocalizing
    Started,
    /// The in-flight utterance finished or was cancelled
    Ended,
    /// The in-flight utterance failed
    Errored { message: String },
}

/// Per-utterance parameters
///
/// Volume is fixed at the engine maximum and pitch at neutral; only the
/// rate multiplier varies per session.
#[derive(Debug, Clone, Copy)]
pub struct UtteranceParams {
    /// Playback rate multiplier, already clamped to [0.5, 2.0]
    pub rate: f32,
}

/// An available voice
#[derive(Debug, Clone, Serialize)]
pub struct Voice {
    pub id: String,
    pub name: String,
    pub language: String,
}

/// Platform speech capability, owned exclusively by the narrator actor
pub trait SpeechEngine: Send {
    /// Submit one utterance. Returns once the engine has accepted it; the
    /// `Started`/`Ended` lifecycle arrives later on the event channel.
    fn speak(&mut self, text: &str, params: &UtteranceParams) -> Result<()>;

    /// Abort the in-flight utterance, if any. Asynchronous: the engine may
    /// still deliver an `Ended` event for the cancelled utterance.
    fn cancel(&mut self);

    /// Available voices. An empty list means narration is unsupported.
    fn voices(&self) -> Vec<Voice>;
}

/// Engine used when the platform has no speech capability
///
/// Reports no voices, so the narrator degrades every `speak` to a no-op and
/// the daemon stays alive in "unsupported" mode.
pub struct NullEngine {
    // Keeps the event channel open so the narrator's receiver never closes
    _events: mpsc::UnboundedSender<EngineEvent>,
}

impl NullEngine {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { _events: tx }, rx)
    }
}

impl SpeechEngine for NullEngine {
    fn speak(&mut self, _text: &str, _params: &UtteranceParams) -> Result<()> {
        Err(crate::error::Error::Speech(
            "speech synthesis unavailable".to_string(),
        ))
    }

    fn cancel(&mut self) {}

    fn voices(&self) -> Vec<Voice> {
        Vec::new()
    }
}
