//! Read-only HTTP API for monitoring the stream
//!
//! - GET /health - Health check
//! - GET /stream/status - Current supervisor snapshot
//! - GET /stream/info - Lifetime counters
//!
//! All mutations go through the control channel.

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
