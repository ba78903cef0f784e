use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Connection lifecycle
        .route("/session/connect", post(handlers::connect))
        .route("/session/disconnect", post(handlers::disconnect))
        .route("/session/initialize", post(handlers::initialize))
        .route("/session/status", get(handlers::get_status))
        // Conversation
        .route("/session/text", post(handlers::send_text))
        .route(
            "/session/transcript",
            get(handlers::get_transcript).delete(handlers::clear_transcript),
        )
        // Capture control
        .route("/session/mic/toggle", post(handlers::toggle_mic))
        .route("/session/camera/start", post(handlers::start_camera))
        .route("/session/camera/stop", post(handlers::stop_camera))
        .route("/session/screen/start", post(handlers::start_screen))
        .route("/session/screen/stop", post(handlers::stop_screen))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
