//! Effects produced by state transitions

use crate::script::AgentType;
use std::time::Duration;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Say this through the voice provider (and show it to clients)
    Speak { text: String },

    /// Stop any audio that is playing
    StopAudio,

    /// Tell the caller-side recognizer to listen
    StartListening,

    /// Tell the caller-side recognizer to stop
    StopListening,

    /// Announce the handoff and deliver `TransferReady` after `delay`
    RequestTransfer { target: AgentType, delay: Duration },

    /// Publish the new state to clients
    PublishState,
}

impl Effect {
    pub fn speak(text: impl Into<String>) -> Self {
        Effect::Speak { text: text.into() }
    }
}
