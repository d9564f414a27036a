//! Voice provider error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VoiceError {
    /// Provider name is not one we know how to build
    #[error("Unsupported voice provider: {0}")]
    Unsupported(String),

    /// Provider exists but cannot be used (missing credentials, etc.)
    #[error("Voice provider unavailable: {0}")]
    Unavailable(String),

    #[error("Unknown voice: {0}")]
    UnknownVoice(String),

    #[error("Voice request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Voice API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Speech cancelled")]
    Cancelled,
}
