use super::state::AppState;
use crate::error::SessionError;
use crate::session::{ResourceState, SessionStatus};
use crate::transcript::TranscriptSnapshot;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SendTextRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub status: String,
    pub message: String,
}

impl ActionResponse {
    fn ok(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            status: "ok".to_string(),
            message: message.into(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct MicResponse {
    pub microphone: ResourceState,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Session failure rendered as `{"error": ..}` with a status code matching
/// its kind
pub struct ApiError(SessionError);

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            SessionError::Configuration(_) => StatusCode::BAD_REQUEST,
            SessionError::UnknownTool(_) => StatusCode::NOT_FOUND,
            SessionError::AlreadyConnected
            | SessionError::NotConnected
            | SessionError::NotInitialized => StatusCode::CONFLICT,
            SessionError::Initialization(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            warn!("Request rejected: {}", self.0);
        }

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ============================================================================
// Handlers
// ============================================================================

/// POST /session/connect
pub async fn connect(State(state): State<AppState>) -> ApiResult<Json<ActionResponse>> {
    info!("Connect requested");
    state.session.connect().await?;
    Ok(ActionResponse::ok("Connected"))
}

/// POST /session/disconnect
pub async fn disconnect(State(state): State<AppState>) -> ApiResult<Json<ActionResponse>> {
    info!("Disconnect requested");
    state.session.disconnect().await?;
    Ok(ActionResponse::ok("Disconnected"))
}

/// POST /session/initialize
/// Prepare local audio playback and capture
pub async fn initialize(State(state): State<AppState>) -> ApiResult<Json<ActionResponse>> {
    state.session.initialize().await?;
    Ok(ActionResponse::ok("Audio initialized"))
}

/// POST /session/text
pub async fn send_text(
    State(state): State<AppState>,
    Json(req): Json<SendTextRequest>,
) -> ApiResult<Json<ActionResponse>> {
    state.session.send_text(req.text).await?;
    Ok(ActionResponse::ok("Text sent"))
}

/// POST /session/mic/toggle
pub async fn toggle_mic(State(state): State<AppState>) -> ApiResult<Json<MicResponse>> {
    let microphone = state.session.toggle_mic().await?;
    Ok(Json(MicResponse { microphone }))
}

/// POST /session/camera/start
pub async fn start_camera(State(state): State<AppState>) -> ApiResult<Json<ActionResponse>> {
    state.session.start_camera_capture().await?;
    Ok(ActionResponse::ok("Camera capture started"))
}

/// POST /session/camera/stop
pub async fn stop_camera(State(state): State<AppState>) -> ApiResult<Json<ActionResponse>> {
    state.session.stop_camera_capture().await?;
    Ok(ActionResponse::ok("Camera capture stopped"))
}

/// POST /session/screen/start
pub async fn start_screen(State(state): State<AppState>) -> ApiResult<Json<ActionResponse>> {
    state.session.start_screen_share().await?;
    Ok(ActionResponse::ok("Screen sharing started"))
}

/// POST /session/screen/stop
pub async fn stop_screen(State(state): State<AppState>) -> ApiResult<Json<ActionResponse>> {
    state.session.stop_screen_share().await?;
    Ok(ActionResponse::ok("Screen sharing stopped"))
}

/// GET /session/status
pub async fn get_status(State(state): State<AppState>) -> ApiResult<Json<SessionStatus>> {
    Ok(Json(state.session.status().await?))
}

/// GET /session/transcript
/// Committed history plus the live rendering of the current turn
pub async fn get_transcript(
    State(state): State<AppState>,
) -> ApiResult<Json<TranscriptSnapshot>> {
    Ok(Json(state.session.transcript().await?))
}

/// DELETE /session/transcript
pub async fn clear_transcript(State(state): State<AppState>) -> ApiResult<Json<ActionResponse>> {
    state.session.clear_transcript().await?;
    Ok(ActionResponse::ok("Transcript cleared"))
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
