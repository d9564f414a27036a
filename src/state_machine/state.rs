//! Call state types

use crate::script::{script_for, AgentType, Script, Step};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

// ============================================================================
// Call Phase
// ============================================================================

/// Where the call is in its lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallPhase {
    /// Created, greeting not yet spoken
    #[default]
    Idle,

    /// Waiting for the caller to speak
    Listening,

    /// Recognition stopped after an error; typed input still accepted
    Paused,

    /// Handing off to another agent; input is suspended
    Transferring { target: AgentType },

    /// Call is over (terminal)
    Ended,
}

impl CallPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, CallPhase::Ended)
    }
}

// ============================================================================
// Transcript and lifecycle log
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Agent,
    User,
}

/// One line of what was said on the call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleKind {
    CallStarted,
    TransferRequested,
    TransferCompleted,
    SpeechError,
    RecognitionError,
    ListeningResumed,
    CallEnded,
}

/// Something that happened to the call, as opposed to something said on it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LifecycleEvent {
    pub kind: LifecycleKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Conversation State
// ============================================================================

/// Full state of one call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationState {
    pub session_id: String,
    pub agent_type: AgentType,
    pub current_step: Step,
    pub collected_data: BTreeMap<String, String>,
    pub phase: CallPhase,
    /// Set after a speech failure; the call continues text-only
    #[serde(default)]
    pub voice_degraded: bool,
    #[serde(default)]
    pub transcript: Vec<TranscriptEntry>,
    #[serde(default)]
    pub events: Vec<LifecycleEvent>,
}

impl ConversationState {
    pub fn new(session_id: impl Into<String>, agent_type: AgentType) -> Self {
        Self {
            session_id: session_id.into(),
            agent_type,
            current_step: Step::Greeting,
            collected_data: BTreeMap::new(),
            phase: CallPhase::Idle,
            voice_degraded: false,
            transcript: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn script(&self) -> &'static Script {
        script_for(self.agent_type)
    }

    pub fn is_listening(&self) -> bool {
        matches!(self.phase, CallPhase::Listening)
    }

    pub fn is_transferring(&self) -> bool {
        matches!(self.phase, CallPhase::Transferring { .. })
    }

    pub(crate) fn say(&mut self, text: &str, at: DateTime<Utc>) {
        self.transcript.push(TranscriptEntry {
            speaker: Speaker::Agent,
            text: text.to_string(),
            timestamp: at,
            confidence: None,
        });
    }

    pub(crate) fn hear(&mut self, text: &str, confidence: Option<f32>, at: DateTime<Utc>) {
        self.transcript.push(TranscriptEntry {
            speaker: Speaker::User,
            text: text.to_string(),
            timestamp: at,
            confidence,
        });
    }

    pub(crate) fn log(&mut self, kind: LifecycleKind, detail: Option<String>, at: DateTime<Utc>) {
        self.events.push(LifecycleEvent {
            kind,
            detail,
            timestamp: at,
        });
    }

    /// Wire form for clients: the state plus derived flags
    pub fn snapshot(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        if let Some(obj) = value.as_object_mut() {
            obj.insert("is_listening".into(), self.is_listening().into());
            obj.insert("is_transferring".into(), self.is_transferring().into());
        }
        value
    }
}

// ============================================================================
// Call Context
// ============================================================================

/// Default pause between the transfer phrase and the new agent's greeting
pub const DEFAULT_HANDOFF_DELAY: Duration = Duration::from_secs(2);

/// Immutable configuration for one call
#[derive(Debug, Clone)]
pub struct CallContext {
    pub session_id: String,
    pub handoff_delay: Duration,
}

impl CallContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            handoff_delay: DEFAULT_HANDOFF_DELAY,
        }
    }

    pub fn with_handoff_delay(mut self, delay: Duration) -> Self {
        self.handoff_delay = delay;
        self
    }
}
