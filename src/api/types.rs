//! API request and response types

use crate::script::{Script, Step};
use crate::voice::VoiceInfo;
use serde::{Deserialize, Serialize};

/// Request to start a call
#[derive(Debug, Default, Deserialize)]
pub struct CreateCallRequest {
    /// Agent to start with (`primary` when absent)
    #[serde(default)]
    pub agent_type: Option<String>,
    /// Voice provider name (configured default when absent)
    #[serde(default)]
    pub voice: Option<String>,
}

/// Recognized or typed caller speech
#[derive(Debug, Deserialize)]
pub struct UtteranceRequest {
    pub text: String,
    #[serde(default)]
    pub confidence: Option<f32>,
}

/// Caller-side recognizer failure
#[derive(Debug, Deserialize)]
pub struct RecognitionErrorRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct SetVoiceRequest {
    pub voice_id: String,
}

#[derive(Debug, Deserialize)]
pub struct VoicesQuery {
    pub provider: Option<String>,
}

/// Response with one call snapshot
#[derive(Debug, Serialize)]
pub struct CallResponse {
    pub call: serde_json::Value,
}

/// Response with live call ids
#[derive(Debug, Serialize)]
pub struct CallListResponse {
    pub calls: Vec<String>,
}

/// Response for queued events
#[derive(Debug, Serialize)]
pub struct QueuedResponse {
    pub queued: bool,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct VoicesResponse {
    pub provider: String,
    pub voices: Vec<VoiceInfo>,
}

/// A conversation script with its step order spelled out
#[derive(Debug, Serialize)]
pub struct ScriptResponse {
    pub steps: Vec<Step>,
    #[serde(flatten)]
    pub script: &'static Script,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
