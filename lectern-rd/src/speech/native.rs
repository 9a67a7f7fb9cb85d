//! Native platform speech engine
//!
//! Wraps the platform speech capability (speech-dispatcher on Linux, SAPI on
//! Windows, AVFoundation on macOS) via the `tts` crate. Utterance lifecycle
//! callbacks arrive on the crate's backend thread and are forwarded into the
//! narrator's event channel.

use crate::error::{Error, Result};
use crate::speech::engine::{EngineEvent, SpeechEngine, UtteranceParams, Voice};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use tts::Tts;

/// Platform speech engine adapter
pub struct NativeEngine {
    tts: Tts,
    voices: Vec<Voice>,
}

impl NativeEngine {
    /// Initialize the platform engine and wire its utterance callbacks
    ///
    /// Fails when the platform has no speech capability or the backend
    /// cannot report utterance boundaries (without callbacks the narrator
    /// could never advance past the first segment).
    pub fn new(
        preferred_language: &str,
    ) -> Result<(Self, mpsc::UnboundedReceiver<EngineEvent>)> {
        let mut tts =
            Tts::default().map_err(|e| Error::Speech(format!("engine init failed: {}", e)))?;

        let features = tts.supported_features();
        if !features.utterance_callbacks {
            return Err(Error::Speech(
                "engine does not report utterance boundaries".to_string(),
            ));
        }

        let (tx, rx) = mpsc::unbounded_channel();

        let begin_tx = tx.clone();
        tts.on_utterance_begin(Some(Box::new(move |_| {
            let _ = begin_tx.send(EngineEvent::Started);
        })))
        .map_err(|e| Error::Speech(format!("callback registration failed: {}", e)))?;

        let end_tx = tx.clone();
        tts.on_utterance_end(Some(Box::new(move |_| {
            let _ = end_tx.send(EngineEvent::Ended);
        })))
        .map_err(|e| Error::Speech(format!("callback registration failed: {}", e)))?;

        // A cancelled utterance reports "stop"; the narrator's intent guard
        // distinguishes it from natural completion, so both map to Ended.
        let stop_tx = tx;
        tts.on_utterance_stop(Some(Box::new(move |_| {
            let _ = stop_tx.send(EngineEvent::Ended);
        })))
        .map_err(|e| Error::Speech(format!("callback registration failed: {}", e)))?;

        let voices = match tts.voices() {
            Ok(list) => list
                .iter()
                .map(|v| Voice {
                    id: v.id(),
                    name: v.name(),
                    language: v.language().to_string(),
                })
                .collect(),
            Err(e) => {
                warn!("Voice enumeration failed: {}", e);
                Vec::new()
            }
        };

        // Prefer a voice in the configured language, like the engine default
        // otherwise
        if features.voice {
            if let Ok(list) = tts.voices() {
                if let Some(preferred) = list
                    .iter()
                    .find(|v| v.language().to_string().starts_with(preferred_language))
                {
                    debug!("Selecting voice {} ({})", preferred.name(), preferred.id());
                    if let Err(e) = tts.set_voice(preferred) {
                        warn!("Failed to select preferred voice: {}", e);
                    }
                }
            }
        }

        // Fixed utterance parameters: maximum volume, neutral pitch
        if features.volume {
            let volume = tts.max_volume();
            if let Err(e) = tts.set_volume(volume) {
                warn!("Failed to set volume: {}", e);
            }
        }
        if features.pitch {
            let pitch = tts.normal_pitch();
            if let Err(e) = tts.set_pitch(pitch) {
                warn!("Failed to set pitch: {}", e);
            }
        }

        Ok((Self { tts, voices }, rx))
    }
}

impl SpeechEngine for NativeEngine {
    fn speak(&mut self, text: &str, params: &UtteranceParams) -> Result<()> {
        let features = self.tts.supported_features();
        if features.rate {
            let platform_rate = map_rate(
                params.rate,
                self.tts.min_rate(),
                self.tts.normal_rate(),
                self.tts.max_rate(),
            );
            if let Err(e) = self.tts.set_rate(platform_rate) {
                warn!("Failed to set rate: {}", e);
            }
        }

        self.tts
            .speak(text, false)
            .map(|_| ())
            .map_err(|e| Error::Speech(format!("utterance rejected: {}", e)))
    }

    fn cancel(&mut self) {
        if let Err(e) = self.tts.stop() {
            warn!("Failed to stop engine: {}", e);
        }
    }

    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }
}

/// Map the 0.5–2.0 rate multiplier onto the platform rate range
///
/// Platform ranges are arbitrary (speech-dispatcher spans -100..100 around a
/// normal of 0), so the multiplier interpolates between normal and the range
/// edge rather than multiplying the platform value directly.
fn map_rate(multiplier: f32, min: f32, normal: f32, max: f32) -> f32 {
    let m = multiplier.clamp(crate::narrator::MIN_RATE, crate::narrator::MAX_RATE);
    if m >= 1.0 {
        let span = crate::narrator::MAX_RATE - 1.0;
        normal + (max - normal) * ((m - 1.0) / span)
    } else {
        let span = 1.0 - crate::narrator::MIN_RATE;
        min + (normal - min) * ((m - crate::narrator::MIN_RATE) / span)
    }
}
