//! REST API implementation for the reader daemon
//!
//! Thin HTTP handlers over the narrator's control surface plus the SSE
//! event stream that drives UI highlighting.

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{create_router, AppContext};
