//! HTTP API server for external control (editor plugins, scripts)
//!
//! This module provides a REST API over one live session:
//! - POST /session/connect, /session/disconnect, /session/initialize
//! - POST /session/text - Send a typed message
//! - POST /session/mic/toggle, /session/{camera,screen}/{start,stop}
//! - GET /session/status - Query session status
//! - GET / DELETE /session/transcript - Read or clear the transcript
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
