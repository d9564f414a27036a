//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    CallListResponse, CallResponse, CreateCallRequest, ErrorResponse, QueuedResponse,
    RecognitionErrorRequest, ScriptResponse, SetVoiceRequest, SuccessResponse, UtteranceRequest,
    VoicesQuery, VoicesResponse,
};
use super::AppState;
use crate::runtime::CallError;
use crate::script::{get_script, AgentType};
use crate::state_machine::Event;
use crate::voice::VoiceError;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Call lifecycle
        .route("/api/calls", get(list_calls).post(create_call))
        .route("/api/calls/:id", get(get_call))
        .route("/api/calls/:id/end", post(end_call))
        // Live updates
        .route("/api/calls/:id/stream", get(stream_call))
        // Caller input
        .route("/api/calls/:id/utterance", post(send_utterance))
        .route(
            "/api/calls/:id/recognition-error",
            post(report_recognition_error),
        )
        .route("/api/calls/:id/listen", post(resume_listening))
        // Voice selection
        .route("/api/calls/:id/voice", post(set_voice))
        .route("/api/voices", get(list_voices))
        // Scripts
        .route("/api/scripts/:agent_type", get(get_agent_script))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Call Lifecycle
// ============================================================

async fn create_call(
    State(state): State<AppState>,
    Json(req): Json<CreateCallRequest>,
) -> Result<Json<CallResponse>, AppError> {
    let agent_type = req
        .agent_type
        .as_deref()
        .map_or(AgentType::Primary, AgentType::resolve);
    if agent_type == AgentType::Fallback {
        tracing::warn!(
            requested = ?req.agent_type,
            "Unknown agent type, starting on the fallback script"
        );
    }

    let call = state
        .calls
        .start_call(agent_type, req.voice.as_deref())
        .await?;

    Ok(Json(CallResponse {
        call: call.snapshot(),
    }))
}

async fn list_calls(State(state): State<AppState>) -> Json<CallListResponse> {
    Json(CallListResponse {
        calls: state.calls.list().await,
    })
}

async fn get_call(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CallResponse>, AppError> {
    let call = state.calls.snapshot(&id).await?;
    Ok(Json(CallResponse {
        call: call.snapshot(),
    }))
}

async fn end_call(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CallResponse>, AppError> {
    let call = state.calls.end_call(&id).await?;
    Ok(Json(CallResponse {
        call: call.snapshot(),
    }))
}

// ============================================================
// SSE Streaming
// ============================================================

async fn stream_call(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (call, broadcast_rx) = state.calls.subscribe(&id).await?;
    Ok(sse_stream(call.snapshot(), broadcast_rx))
}

// ============================================================
// Caller Input
// ============================================================

async fn send_utterance(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UtteranceRequest>,
) -> Result<Json<QueuedResponse>, AppError> {
    if req.text.trim().is_empty() {
        return Err(AppError::BadRequest("Utterance text is empty".to_string()));
    }

    // Stored exactly as sent
    state
        .calls
        .send_event(&id, Event::utterance(req.text, req.confidence))
        .await?;

    Ok(Json(QueuedResponse { queued: true }))
}

async fn report_recognition_error(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RecognitionErrorRequest>,
) -> Result<Json<QueuedResponse>, AppError> {
    tracing::warn!(session_id = %id, error = %req.message, "Speech recognition failed");
    state
        .calls
        .send_event(
            &id,
            Event::RecognitionFailed {
                message: req.message,
                at: Utc::now(),
            },
        )
        .await?;

    Ok(Json(QueuedResponse { queued: true }))
}

async fn resume_listening(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<QueuedResponse>, AppError> {
    state
        .calls
        .send_event(&id, Event::ResumeListening { at: Utc::now() })
        .await?;

    Ok(Json(QueuedResponse { queued: true }))
}

// ============================================================
// Voices
// ============================================================

async fn set_voice(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SetVoiceRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.calls.set_voice(&id, &req.voice_id).await?;
    Ok(Json(SuccessResponse { success: true }))
}

async fn list_voices(
    State(state): State<AppState>,
    Query(query): Query<VoicesQuery>,
) -> Result<Json<VoicesResponse>, AppError> {
    let provider = query
        .provider
        .unwrap_or_else(|| state.calls.config().voice_provider.clone());
    let voices = state.calls.voices(Some(provider.as_str())).await?;
    Ok(Json(VoicesResponse { provider, voices }))
}

// ============================================================
// Scripts
// ============================================================

/// Unknown names get the fallback script rather than an error
async fn get_agent_script(Path(agent_type): Path<String>) -> Json<ScriptResponse> {
    let script = get_script(&agent_type);
    Json(ScriptResponse {
        steps: script.steps(),
        script,
    })
}

async fn get_version() -> &'static str {
    concat!("fleetcall ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    ServiceUnavailable(String),
    Internal(String),
}

impl From<CallError> for AppError {
    fn from(e: CallError) -> Self {
        let message = e.to_string();
        match e {
            CallError::NotFound(_) => AppError::NotFound(message),
            CallError::Closed(_) => AppError::Internal(message),
            CallError::Voice(VoiceError::Unsupported(_) | VoiceError::UnknownVoice(_)) => {
                AppError::BadRequest(message)
            }
            CallError::Voice(_) => AppError::ServiceUnavailable(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
