//! Speech engine adapters
//!
//! The narrator drives a platform speech engine through the [`SpeechEngine`]
//! trait: a single-slot resource that accepts one utterance at a time and
//! reports its lifecycle asynchronously over an event channel.

pub mod engine;
pub mod native;
pub mod sanitize;

pub use engine::{EngineEvent, NullEngine, SpeechEngine, UtteranceParams, Voice};
pub use native::NativeEngine;
