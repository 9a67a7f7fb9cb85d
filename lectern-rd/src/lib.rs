//! # Lectern Reader Daemon (lectern-rd)
//!
//! Content-to-audio reading service.
//!
//! **Purpose:** Accept or fetch text, split it into ordered segments, and
//! narrate them through the platform speech engine with full transport
//! control (play, pause, resume, stop, jump, rate) over an HTTP/SSE
//! interface.
//!
//! **Architecture:** A single narrator actor owns the speech engine and a
//! guarded state machine; HTTP handlers send it commands and read shared
//! snapshots; events reach the UI via SSE.

pub mod api;
pub mod config;
pub mod content;
pub mod error;
pub mod narrator;
pub mod speech;
pub mod state;

pub use error::{Error, Result};
pub use state::SharedState;
