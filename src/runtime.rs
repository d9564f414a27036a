//! Runtime for executing calls
//!
//! Each call owns one `CallRuntime` task. The manager keeps a handle per
//! live call and routes API requests to it.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::CallRuntime;

use crate::config::CallConfig;
use crate::script::AgentType;
use crate::state_machine::state::CallPhase;
use crate::state_machine::{CallContext, ConversationState, Event};
use crate::voice::{build_provider, VoiceError, VoiceInfo, VoiceProvider};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch, RwLock};
use tokio_util::sync::CancellationToken;

/// Runtime type used for real calls
pub type ProductionRuntime = CallRuntime<dyn VoiceProvider>;

/// Events sent to SSE clients
#[derive(Debug, Clone)]
pub enum CallEvent {
    StateChange {
        /// Full snapshot, including derived `is_listening` / `is_transferring`
        state: serde_json::Value,
    },
    AgentSpeech {
        text: String,
    },
    Audio {
        media_type: String,
        /// Base64-encoded clip
        data: String,
    },
    Listening {
        active: bool,
    },
    TransferRequested {
        target: AgentType,
    },
    Ended,
    Error {
        message: String,
    },
}

#[derive(Debug, Error)]
pub enum CallError {
    #[error("Call not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Voice(#[from] VoiceError),

    #[error("Call {0} is no longer running")]
    Closed(String),
}

/// Handle to interact with a running call
#[derive(Clone)]
pub struct CallHandle {
    pub event_tx: mpsc::Sender<Event>,
    pub broadcast_tx: broadcast::Sender<CallEvent>,
    pub state_rx: watch::Receiver<ConversationState>,
    /// Cancelled when the call is being torn down
    pub stop: CancellationToken,
    pub voice: Arc<dyn VoiceProvider>,
}

/// Manager for all call runtimes
pub struct CallManager {
    config: CallConfig,
    calls: RwLock<HashMap<String, CallHandle>>,
}

impl CallManager {
    pub fn new(config: CallConfig) -> Self {
        Self {
            config,
            calls: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &CallConfig {
        &self.config
    }

    /// Start a call and wait for its greeting transition.
    ///
    /// The voice provider is built first; if it cannot be, no call exists.
    pub async fn start_call(
        &self,
        agent_type: AgentType,
        voice_provider: Option<&str>,
    ) -> Result<ConversationState, CallError> {
        let provider_name = voice_provider.unwrap_or(&self.config.voice_provider);
        let voice = build_provider(provider_name, &self.config.premium)?;

        let session_id = uuid::Uuid::new_v4().to_string();
        let context =
            CallContext::new(&session_id).with_handoff_delay(self.config.handoff_delay);
        let initial = ConversationState::new(&session_id, agent_type);

        let (event_tx, event_rx) = mpsc::channel(32);
        let (broadcast_tx, _) = broadcast::channel(128);
        let (state_tx, state_rx) = watch::channel(initial.clone());
        let stop = CancellationToken::new();

        let runtime: ProductionRuntime = CallRuntime::new(
            context,
            initial,
            voice.clone(),
            self.config.speak_options,
            event_rx,
            event_tx.clone(),
            broadcast_tx.clone(),
            state_tx,
            stop.clone(),
        );

        let id = session_id.clone();
        tokio::spawn(async move {
            runtime.run().await;
            tracing::info!(session_id = %id, "Call runtime finished");
        });

        let handle = CallHandle {
            event_tx,
            broadcast_tx,
            state_rx,
            stop,
            voice,
        };
        self.calls
            .write()
            .await
            .insert(session_id.clone(), handle.clone());

        tracing::info!(
            session_id = %session_id,
            agent_type = %agent_type,
            voice = %provider_name,
            "Call started"
        );

        handle
            .event_tx
            .send(Event::start())
            .await
            .map_err(|_| CallError::Closed(session_id.clone()))?;

        let mut state_rx = handle.state_rx;
        let started = state_rx
            .wait_for(|s| s.phase != CallPhase::Idle)
            .await
            .map(|s| (*s).clone());
        started.map_err(|_| CallError::Closed(session_id))
    }

    /// Get a handle to a live call
    pub async fn handle(&self, session_id: &str) -> Result<CallHandle, CallError> {
        self.calls
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| CallError::NotFound(session_id.to_string()))
    }

    /// Send an event to a call
    pub async fn send_event(&self, session_id: &str, event: Event) -> Result<(), CallError> {
        let handle = self.handle(session_id).await?;
        handle
            .event_tx
            .send(event)
            .await
            .map_err(|_| CallError::Closed(session_id.to_string()))
    }

    /// Latest state of a call
    pub async fn snapshot(&self, session_id: &str) -> Result<ConversationState, CallError> {
        let handle = self.handle(session_id).await?;
        let state = handle.state_rx.borrow().clone();
        Ok(state)
    }

    /// Subscribe to call updates, returning the state at subscription time
    pub async fn subscribe(
        &self,
        session_id: &str,
    ) -> Result<(ConversationState, broadcast::Receiver<CallEvent>), CallError> {
        let handle = self.handle(session_id).await?;
        let rx = handle.broadcast_tx.subscribe();
        let state = handle.state_rx.borrow().clone();
        Ok((state, rx))
    }

    /// Ids of all live calls
    pub async fn list(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.calls.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Select the voice for later speech on a call
    pub async fn set_voice(&self, session_id: &str, voice_id: &str) -> Result<(), CallError> {
        let handle = self.handle(session_id).await?;
        handle.voice.set_voice(voice_id)?;
        Ok(())
    }

    /// Voices offered by a provider (the configured default when `None`)
    pub async fn voices(&self, provider: Option<&str>) -> Result<Vec<VoiceInfo>, CallError> {
        let name = provider.unwrap_or(&self.config.voice_provider);
        let voice = build_provider(name, &self.config.premium)?;
        Ok(voice.voices().await?)
    }

    /// End a call and forget it.
    ///
    /// Cancels in-flight speech before queueing `End`, then returns the
    /// final state.
    pub async fn end_call(&self, session_id: &str) -> Result<ConversationState, CallError> {
        let handle = self
            .calls
            .write()
            .await
            .remove(session_id)
            .ok_or_else(|| CallError::NotFound(session_id.to_string()))?;

        handle.stop.cancel();
        if handle.event_tx.send(Event::end()).await.is_err() {
            tracing::debug!(session_id, "Runtime already stopped before end");
        }

        let mut state_rx = handle.state_rx;
        let ended = state_rx
            .wait_for(|s| s.phase.is_terminal())
            .await
            .map(|s| (*s).clone());
        let state = ended.unwrap_or_else(|_| state_rx.borrow().clone());

        tracing::info!(
            session_id,
            collected = state.collected_data.len(),
            "Call ended"
        );
        Ok(state)
    }
}
