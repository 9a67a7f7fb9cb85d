//! Narration state machine
//!
//! The machine is the synchronous core of the orchestrator: every engine
//! callback, control call and timer expiry is an explicit [`Input`], and each
//! input maps to a new state plus a list of [`Effect`]s for the actor to
//! carry out. No I/O or timers live here, so the race-sensitive guard logic
//! is testable as a plain function.
//!
//! # Guard discipline
//!
//! The engine's cancellation is asynchronous and its teardown callback is
//! indistinguishable from a natural end-of-utterance. Every intentional
//! cancel therefore records a [`TransitionReason`] in the same step, and the
//! end/error handler checks it first: while a reason is set (or no utterance
//! is active) the callback is absorbed instead of auto-advancing.
//!
//! # Epochs
//!
//! Continuations are delivered as delayed [`Input::Continue`] messages. Every
//! control operation bumps the epoch; a continuation carrying a stale epoch
//! is dropped. This is what keeps an already-superseded "advance to next
//! segment" timer from firing into the middle of a pause or jump.

use crate::config::NarrationConfig;
use crate::speech::engine::EngineEvent;
use crate::speech::sanitize::{narratable, sanitize};
use crate::state::NarrationSnapshot;
use lectern_common::PlaybackState;
use std::sync::Arc;
use std::time::Duration;

/// Lowest accepted rate multiplier
pub const MIN_RATE: f32 = 0.5;
/// Highest accepted rate multiplier
pub const MAX_RATE: f32 = 2.0;

/// Clamp a requested rate into the accepted range (never rejected)
pub fn clamp_rate(rate: f32) -> f32 {
    rate.clamp(MIN_RATE, MAX_RATE)
}

/// User-visible phase of the narrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Playing,
    Paused,
}

/// Why the in-flight utterance is being torn down
///
/// One tagged value consumed atomically by the event handler, rather than a
/// set of independent booleans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionReason {
    None,
    Pausing,
    Jumping,
    Stopping,
    RateChanging,
}

/// Deferred work executed when the matching `Continue` arrives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    /// Start narrating at this segment (scanning forward past short ones)
    Speak { index: usize },
    /// Drop a pause/stop intent flag that outlived its grace window
    ClearIntent,
}

/// Inputs fed into the machine by the actor
#[derive(Debug, Clone)]
pub enum Input {
    Speak {
        segments: Arc<Vec<String>>,
        start_index: usize,
    },
    Pause,
    Resume,
    Stop,
    Jump {
        index: usize,
    },
    SetRate {
        rate: f32,
    },
    Engine(EngineEvent),
    Continue {
        epoch: u64,
    },
}

/// Side effects requested by a transition, interpreted by the actor
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Abort the in-flight utterance on the engine
    Cancel,
    /// Submit the sanitized text of segment `index` to the engine
    Speak { index: usize, text: String },
    /// Post `Continue { epoch }` back into the input queue after `delay`
    Schedule { delay: Duration, epoch: u64 },
    /// Segment `index` began narrating (or the cursor reset on stop)
    NotifySegment { index: usize },
    /// The user-visible playback state changed
    NotifyState,
    /// The rate changed (already clamped)
    NotifyRate { rate: f32 },
    /// A new narration session was accepted
    NotifySession { segment_count: usize },
    /// Narration ran past the last narratable segment
    NotifyCompleted,
}

/// The narration state machine
pub struct Machine {
    tuning: NarrationConfig,
    supported: bool,
    segments: Arc<Vec<String>>,
    phase: Phase,
    intent: TransitionReason,
    pending: Option<Pending>,
    epoch: u64,
    /// Segment index of the at-most-one in-flight utterance
    active: Option<usize>,
    /// Last segment that began narrating (resume/restart target)
    index: usize,
    rate: f32,
    has_ever_started: bool,
}

impl Machine {
    pub fn new(tuning: NarrationConfig, supported: bool) -> Self {
        Self {
            tuning,
            supported,
            segments: Arc::new(Vec::new()),
            phase: Phase::Idle,
            intent: TransitionReason::None,
            pending: None,
            epoch: 0,
            active: None,
            index: 0,
            rate: 1.0,
            has_ever_started: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn intent(&self) -> TransitionReason {
        self.intent
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn playback_state(&self) -> PlaybackState {
        match self.phase {
            Phase::Idle => PlaybackState::Stopped,
            Phase::Playing => PlaybackState::Playing,
            Phase::Paused => PlaybackState::Paused,
        }
    }

    pub fn snapshot(&self) -> NarrationSnapshot {
        NarrationSnapshot {
            supported: self.supported,
            is_playing: self.phase != Phase::Idle,
            is_paused: self.phase == Phase::Paused,
            rate: self.rate,
            current_segment: self.index,
            segment_count: self.segments.len(),
            has_ever_started: self.has_ever_started,
        }
    }

    /// Feed one input through the transition function
    pub fn handle(&mut self, input: Input) -> Vec<Effect> {
        match input {
            Input::Speak {
                segments,
                start_index,
            } => self.on_speak(segments, start_index),
            Input::Pause => self.on_pause(),
            Input::Resume => self.on_resume(),
            Input::Stop => self.on_stop(),
            Input::Jump { index } => self.on_jump(index),
            Input::SetRate { rate } => self.on_set_rate(rate),
            Input::Engine(event) => self.on_engine(event),
            Input::Continue { epoch } => self.on_continue(epoch),
        }
    }

    fn on_speak(&mut self, segments: Arc<Vec<String>>, start_index: usize) -> Vec<Effect> {
        if !self.supported || segments.is_empty() {
            return Vec::new();
        }

        self.epoch += 1;
        self.segments = segments;
        self.intent = TransitionReason::None;
        self.active = None;
        self.pending = Some(Pending::Speak { index: start_index });

        vec![
            Effect::Cancel,
            Effect::NotifySession {
                segment_count: self.segments.len(),
            },
            Effect::Schedule {
                delay: self.tuning.cancel_settle(),
                epoch: self.epoch,
            },
        ]
    }

    fn on_pause(&mut self) -> Vec<Effect> {
        if self.phase != Phase::Playing {
            return Vec::new();
        }

        // The resume target is whatever the engine is actually on: the
        // submitted utterance if one is in flight (its start callback may not
        // have been processed yet), else a deferred advance target
        if let Some(active) = self.active {
            self.index = active;
        } else if let Some(Pending::Speak { index }) = self.pending {
            self.index = index;
        }

        self.epoch += 1;
        self.intent = TransitionReason::Pausing;
        self.active = None;
        self.phase = Phase::Paused;
        self.pending = Some(Pending::ClearIntent);

        vec![
            Effect::Cancel,
            Effect::NotifyState,
            Effect::Schedule {
                delay: self.tuning.stop_settle(),
                epoch: self.epoch,
            },
        ]
    }

    fn on_resume(&mut self) -> Vec<Effect> {
        if self.phase != Phase::Paused {
            return Vec::new();
        }

        self.epoch += 1;
        self.intent = TransitionReason::None;
        self.active = None;
        self.phase = Phase::Playing;
        self.pending = Some(Pending::Speak { index: self.index });

        vec![
            Effect::Cancel,
            Effect::NotifyState,
            Effect::Schedule {
                delay: self.tuning.cancel_settle(),
                epoch: self.epoch,
            },
        ]
    }

    fn on_stop(&mut self) -> Vec<Effect> {
        self.epoch += 1;
        self.intent = TransitionReason::Stopping;
        self.active = None;
        self.phase = Phase::Idle;
        self.index = 0;
        self.pending = Some(Pending::ClearIntent);

        // The cursor reset is reported even when nothing was playing, so the
        // UI position resets in lockstep
        vec![
            Effect::Cancel,
            Effect::NotifySegment { index: 0 },
            Effect::NotifyState,
            Effect::Schedule {
                delay: self.tuning.stop_settle(),
                epoch: self.epoch,
            },
        ]
    }

    fn on_jump(&mut self, index: usize) -> Vec<Effect> {
        if !self.supported || self.segments.is_empty() {
            return Vec::new();
        }

        self.epoch += 1;
        self.intent = TransitionReason::Jumping;
        self.active = None;
        // Jumping is an explicit "play from here": it never leaves the
        // machine paused, whatever the prior state
        self.phase = Phase::Playing;
        self.pending = Some(Pending::Speak { index });

        vec![
            Effect::Cancel,
            Effect::NotifyState,
            Effect::Schedule {
                delay: self.tuning.cancel_settle(),
                epoch: self.epoch,
            },
        ]
    }

    fn on_set_rate(&mut self, rate: f32) -> Vec<Effect> {
        let clamped = clamp_rate(rate);
        self.rate = clamped;

        let mut effects = vec![Effect::NotifyRate { rate: clamped }];

        // The engine applies rate only at utterance start, so a live change
        // restarts the in-flight segment under the new rate
        if self.phase == Phase::Playing {
            if let Some(active) = self.active {
                self.index = active;
                self.epoch += 1;
                self.intent = TransitionReason::RateChanging;
                self.active = None;
                self.pending = Some(Pending::Speak { index: active });
                effects.push(Effect::Cancel);
                effects.push(Effect::Schedule {
                    delay: self.tuning.cancel_settle(),
                    epoch: self.epoch,
                });
            }
        }

        effects
    }

    fn on_engine(&mut self, event: EngineEvent) -> Vec<Effect> {
        match event {
            EngineEvent::Started => {
                // A started callback from a cancelled utterance must not
                // resurrect Playing
                if self.intent != TransitionReason::None {
                    return Vec::new();
                }
                let Some(active) = self.active else {
                    return Vec::new();
                };

                let state_changed = self.phase != Phase::Playing;
                self.index = active;
                self.phase = Phase::Playing;
                self.has_ever_started = true;

                let mut effects = vec![Effect::NotifySegment { index: self.index }];
                if state_changed {
                    effects.push(Effect::NotifyState);
                }
                effects
            }
            EngineEvent::Ended | EngineEvent::Errored { .. } => {
                if self.intent != TransitionReason::None {
                    // Side effect of an intentional interruption: absorb.
                    // Pause/stop intents are done once their teardown
                    // callback is seen; jump/rate keep guarding until their
                    // continuation speaks.
                    if matches!(
                        self.intent,
                        TransitionReason::Pausing | TransitionReason::Stopping
                    ) {
                        self.intent = TransitionReason::None;
                    }
                    return Vec::new();
                }
                if self.active.is_none() {
                    // Stray callback with nothing in flight
                    return Vec::new();
                }

                // Natural completion (errors advance too: a failed segment is
                // skipped, never retried)
                self.active = None;
                self.pending = Some(Pending::Speak {
                    index: self.index + 1,
                });
                vec![Effect::Schedule {
                    delay: self.tuning.advance_delay(),
                    epoch: self.epoch,
                }]
            }
        }
    }

    fn on_continue(&mut self, epoch: u64) -> Vec<Effect> {
        if epoch != self.epoch {
            return Vec::new();
        }
        let Some(pending) = self.pending.take() else {
            return Vec::new();
        };

        match pending {
            Pending::ClearIntent => {
                if matches!(
                    self.intent,
                    TransitionReason::Pausing | TransitionReason::Stopping
                ) {
                    self.intent = TransitionReason::None;
                }
                Vec::new()
            }
            Pending::Speak { index } => {
                self.intent = TransitionReason::None;
                self.start_at(index)
            }
        }
    }

    /// Begin narrating at `from`, scanning forward past segments that are
    /// empty or too short to narrate
    fn start_at(&mut self, from: usize) -> Vec<Effect> {
        let mut idx = from;
        while idx < self.segments.len() {
            let text = sanitize(&self.segments[idx], self.tuning.max_utterance_chars);
            if narratable(&text, self.tuning.min_segment_chars) {
                self.active = Some(idx);
                return vec![Effect::Speak { index: idx, text }];
            }
            idx += 1;
        }

        // Ran past the last narratable segment
        let was_idle = self.phase == Phase::Idle;
        self.phase = Phase::Idle;
        self.index = 0;
        self.active = None;

        let mut effects = vec![Effect::NotifyCompleted];
        if !was_idle {
            effects.push(Effect::NotifyState);
        }
        effects
    }
}
