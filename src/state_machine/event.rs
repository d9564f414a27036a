//! Events that can occur on a call

use crate::script::AgentType;
use chrono::{DateTime, Utc};

/// Events that trigger state transitions.
///
/// Every event carries the time it was observed so the transition
/// function never reads the clock.
#[derive(Debug, Clone)]
pub enum Event {
    /// Call connected; speak the greeting
    Start { at: DateTime<Utc> },

    /// Recognized (or typed) caller speech
    UserUtterance {
        text: String,
        confidence: Option<f32>,
        at: DateTime<Utc>,
    },

    /// Handoff to `target` is complete
    TransferReady {
        target: AgentType,
        at: DateTime<Utc>,
    },

    /// Speech synthesis failed
    SpeechFailed { message: String, at: DateTime<Utc> },

    /// Speech recognition failed
    RecognitionFailed { message: String, at: DateTime<Utc> },

    /// Caller-side listener restarted after a recognition failure
    ResumeListening { at: DateTime<Utc> },

    /// Caller or operator hung up
    End { at: DateTime<Utc> },
}

impl Event {
    pub fn start() -> Self {
        Event::Start { at: Utc::now() }
    }

    pub fn utterance(text: impl Into<String>, confidence: Option<f32>) -> Self {
        Event::UserUtterance {
            text: text.into(),
            confidence,
            at: Utc::now(),
        }
    }

    pub fn end() -> Self {
        Event::End { at: Utc::now() }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Event::Start { .. } => "start",
            Event::UserUtterance { .. } => "user_utterance",
            Event::TransferReady { .. } => "transfer_ready",
            Event::SpeechFailed { .. } => "speech_failed",
            Event::RecognitionFailed { .. } => "recognition_failed",
            Event::ResumeListening { .. } => "resume_listening",
            Event::End { .. } => "end",
        }
    }
}
