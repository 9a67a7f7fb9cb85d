//! Narration orchestration
//!
//! Drives the speech engine utterance-by-utterance over an ordered segment
//! source, exposing seek/pause/resume/rate semantics the engine itself does
//! not provide.
//!
//! Split in two:
//! - [`machine`] — the synchronous state machine (state + guarded
//!   transitions, no I/O)
//! - [`Narrator`] — the actor that owns the engine and interprets the
//!   machine's effects: engine calls, delay timers, event broadcasting,
//!   shared-state updates
//!
//! All orchestrator logic runs on the actor's single task; engine callbacks
//! and control calls alike arrive as messages on its input queue.

pub mod machine;

pub use machine::{clamp_rate, Machine, Phase, TransitionReason, MAX_RATE, MIN_RATE};

use crate::config::NarrationConfig;
use crate::error::{Error, Result};
use crate::speech::engine::{EngineEvent, SpeechEngine, UtteranceParams};
use crate::state::{NarrationSnapshot, SharedState};
use lectern_common::events::ReaderEvent;
use machine::{Effect, Input};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The narrator actor
///
/// Owns the speech engine exclusively; no other component may touch it.
pub struct Narrator {
    engine: Box<dyn SpeechEngine>,
    machine: Machine,
    state: Arc<SharedState>,
    input_tx: mpsc::UnboundedSender<Input>,
    input_rx: mpsc::UnboundedReceiver<Input>,
    engine_rx: mpsc::UnboundedReceiver<EngineEvent>,
    session_id: Uuid,
}

impl Narrator {
    /// Spawn the narrator actor and return its control handle
    ///
    /// Queries the engine's voices once: an engine with no voices leaves the
    /// narrator in "unsupported" mode, where `speak` degrades to a no-op.
    pub fn spawn(
        engine: Box<dyn SpeechEngine>,
        engine_rx: mpsc::UnboundedReceiver<EngineEvent>,
        tuning: NarrationConfig,
        state: Arc<SharedState>,
    ) -> NarratorHandle {
        let (input_tx, input_rx) = mpsc::unbounded_channel();

        let voices = engine.voices();
        let supported = !voices.is_empty();

        let narrator = Narrator {
            engine,
            machine: Machine::new(tuning, supported),
            state: Arc::clone(&state),
            input_tx: input_tx.clone(),
            input_rx,
            engine_rx,
            session_id: Uuid::nil(),
        };

        tokio::spawn(async move {
            if !supported {
                info!("Speech narration unsupported: engine reports no voices");
            }
            narrator.state.set_voices(voices).await;
            narrator
                .state
                .set_snapshot(narrator.machine.snapshot())
                .await;
            narrator.run().await;
        });

        NarratorHandle {
            tx: input_tx,
            state,
        }
    }

    async fn run(mut self) {
        debug!("Narrator actor started");
        let mut engine_open = true;

        loop {
            let input = tokio::select! {
                cmd = self.input_rx.recv() => match cmd {
                    Some(input) => input,
                    // All handles dropped: daemon is shutting down
                    None => break,
                },
                event = self.engine_rx.recv(), if engine_open => match event {
                    Some(event) => Input::Engine(event),
                    None => {
                        engine_open = false;
                        continue;
                    }
                },
            };

            self.step(input).await;
        }

        self.engine.cancel();
        debug!("Narrator actor stopped");
    }

    /// Run one input through the machine and carry out its effects
    ///
    /// A rejected utterance submission feeds back as an engine error input
    /// (the failed segment is skipped, never retried), hence the worklist.
    async fn step(&mut self, input: Input) {
        let mut inputs = VecDeque::from([input]);

        while let Some(input) = inputs.pop_front() {
            for effect in self.machine.handle(input) {
                if let Some(followup) = self.apply(effect) {
                    inputs.push_back(followup);
                }
            }
        }

        self.state.set_snapshot(self.machine.snapshot()).await;
    }

    fn apply(&mut self, effect: Effect) -> Option<Input> {
        match effect {
            Effect::Cancel => {
                self.engine.cancel();
                None
            }
            Effect::Speak { index, text } => {
                let params = UtteranceParams {
                    rate: self.machine.rate(),
                };
                debug!(
                    "Submitting utterance for segment {} ({} chars)",
                    index,
                    text.chars().count()
                );
                match self.engine.speak(&text, &params) {
                    Ok(()) => None,
                    Err(e) => {
                        warn!("Utterance for segment {} rejected: {}", index, e);
                        Some(Input::Engine(EngineEvent::Errored {
                            message: e.to_string(),
                        }))
                    }
                }
            }
            Effect::Schedule { delay, epoch } => {
                let tx = self.input_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(Input::Continue { epoch });
                });
                None
            }
            Effect::NotifySegment { index } => {
                self.state.broadcast_event(ReaderEvent::SegmentChanged {
                    index,
                    timestamp: chrono::Utc::now(),
                });
                None
            }
            Effect::NotifyState => {
                let state = self.machine.playback_state();
                info!("Playback state changed: {}", state);
                self.state
                    .broadcast_event(ReaderEvent::PlaybackStateChanged {
                        state,
                        timestamp: chrono::Utc::now(),
                    });
                None
            }
            Effect::NotifyRate { rate } => {
                self.state.broadcast_event(ReaderEvent::RateChanged {
                    rate,
                    timestamp: chrono::Utc::now(),
                });
                None
            }
            Effect::NotifySession { segment_count } => {
                self.session_id = Uuid::new_v4();
                info!(
                    "Narration session {} accepted: {} segments",
                    self.session_id, segment_count
                );
                self.state.broadcast_event(ReaderEvent::NarrationStarted {
                    session_id: self.session_id,
                    segment_count,
                    timestamp: chrono::Utc::now(),
                });
                None
            }
            Effect::NotifyCompleted => {
                info!("Narration session {} completed", self.session_id);
                self.state.broadcast_event(ReaderEvent::NarrationCompleted {
                    session_id: self.session_id,
                    timestamp: chrono::Utc::now(),
                });
                None
            }
        }
    }
}

/// Cloneable control surface for the narrator actor
///
/// Control calls are fire-and-forget messages; observable results arrive via
/// the shared snapshot and the event bus.
#[derive(Clone)]
pub struct NarratorHandle {
    tx: mpsc::UnboundedSender<Input>,
    state: Arc<SharedState>,
}

impl NarratorHandle {
    /// Begin narrating `segments` from `start_index`, replacing any active
    /// source
    pub fn speak(&self, segments: Vec<String>, start_index: usize) -> Result<()> {
        self.send(Input::Speak {
            segments: Arc::new(segments),
            start_index,
        })
    }

    /// Pause at segment granularity (the current segment restarts on resume)
    pub fn pause(&self) -> Result<()> {
        self.send(Input::Pause)
    }

    /// Resume narration at the segment recorded when pausing
    pub fn resume(&self) -> Result<()> {
        self.send(Input::Resume)
    }

    /// Stop narration and reset the cursor to segment 0 (idempotent)
    pub fn stop(&self) -> Result<()> {
        self.send(Input::Stop)
    }

    /// Jump to a segment and play from there, whatever the prior state
    pub fn jump_to(&self, index: usize) -> Result<()> {
        self.send(Input::Jump { index })
    }

    /// Set the playback rate; returns the clamped value actually applied
    pub fn set_rate(&self, rate: f32) -> Result<f32> {
        self.send(Input::SetRate { rate })?;
        Ok(clamp_rate(rate))
    }

    /// Latest narrator snapshot
    pub async fn snapshot(&self) -> NarrationSnapshot {
        self.state.snapshot().await
    }

    fn send(&self, input: Input) -> Result<()> {
        self.tx
            .send(input)
            .map_err(|_| Error::InvalidState("narrator is not running".to_string()))
    }
}
