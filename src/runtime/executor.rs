//! Call runtime executor

use super::CallEvent;
use crate::state_machine::{transition, CallContext, ConversationState, Effect, Event, TransitionError};
use crate::voice::{SpeakOptions, VoiceError, VoiceProvider};
use base64::prelude::{Engine as _, BASE64_STANDARD};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Drives one call: feeds events through `transition` and executes effects
pub struct CallRuntime<V>
where
    V: VoiceProvider + ?Sized + 'static,
{
    context: CallContext,
    state: ConversationState,
    voice: Arc<V>,
    speak_options: SpeakOptions,
    event_rx: mpsc::Receiver<Event>,
    event_tx: mpsc::Sender<Event>,
    broadcast_tx: broadcast::Sender<CallEvent>,
    state_tx: watch::Sender<ConversationState>,
    /// Cancelled when the call is torn down; aborts speech and pending handoffs
    stop: CancellationToken,
    rng: StdRng,
}

impl<V> CallRuntime<V>
where
    V: VoiceProvider + ?Sized + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        context: CallContext,
        state: ConversationState,
        voice: Arc<V>,
        speak_options: SpeakOptions,
        event_rx: mpsc::Receiver<Event>,
        event_tx: mpsc::Sender<Event>,
        broadcast_tx: broadcast::Sender<CallEvent>,
        state_tx: watch::Sender<ConversationState>,
        stop: CancellationToken,
    ) -> Self {
        Self {
            context,
            state,
            voice,
            speak_options,
            event_rx,
            event_tx,
            broadcast_tx,
            state_tx,
            stop,
            rng: StdRng::from_entropy(),
        }
    }

    /// Use a fixed random source (deterministic greetings in tests)
    #[allow(dead_code)] // Used by tests
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub async fn run(mut self) {
        tracing::info!(
            session_id = %self.context.session_id,
            agent_type = %self.state.agent_type,
            voice = %self.voice.name(),
            "Starting call runtime"
        );

        // Events are handled strictly one at a time
        while let Some(event) = self.event_rx.recv().await {
            if let Err(e) = self.process_event(event).await {
                tracing::warn!(
                    session_id = %self.context.session_id,
                    error = %e,
                    "Rejected event"
                );
            }

            if self.state.phase.is_terminal() {
                let _ = self.broadcast_tx.send(CallEvent::Ended);
                break;
            }
        }

        tracing::info!(session_id = %self.context.session_id, "Call runtime stopped");
    }

    async fn process_event(&mut self, event: Event) -> Result<(), TransitionError> {
        // Effects may generate follow-up events (speech failures)
        let mut events_to_process = vec![event];

        while let Some(current_event) = events_to_process.pop() {
            let event_name = current_event.name();

            // Pure state transition
            let result = match transition(&self.state, &self.context, current_event, &mut self.rng)
            {
                Ok(r) => r,
                Err(e) => {
                    let _ = self.broadcast_tx.send(CallEvent::Error {
                        message: e.to_string(),
                    });
                    return Err(e);
                }
            };

            self.state = result.new_state;

            tracing::debug!(
                session_id = %self.context.session_id,
                event = event_name,
                agent_type = %self.state.agent_type,
                step = %self.state.current_step,
                "Transition applied"
            );

            for effect in result.effects {
                if let Some(generated_event) = self.execute_effect(effect).await {
                    events_to_process.push(generated_event);
                }
            }

            // Readers of the latest state only see it once its effects ran
            self.state_tx.send_replace(self.state.clone());
        }

        Ok(())
    }

    async fn execute_effect(&self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::Speak { text } => return self.speak(&text).await,

            Effect::StopAudio => {
                self.voice.stop();
            }

            Effect::StartListening => {
                let _ = self.broadcast_tx.send(CallEvent::Listening { active: true });
            }

            Effect::StopListening => {
                let _ = self.broadcast_tx.send(CallEvent::Listening { active: false });
            }

            Effect::RequestTransfer { target, delay } => {
                tracing::info!(
                    session_id = %self.context.session_id,
                    to = %target,
                    delay_ms = %delay.as_millis(),
                    "Transfer requested"
                );
                let _ = self
                    .broadcast_tx
                    .send(CallEvent::TransferRequested { target });

                let event_tx = self.event_tx.clone();
                let stop = self.stop.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        () = stop.cancelled() => {}
                        () = tokio::time::sleep(delay) => {
                            let _ = event_tx
                                .send(Event::TransferReady { target, at: Utc::now() })
                                .await;
                        }
                    }
                });
            }

            Effect::PublishState => {
                let _ = self.broadcast_tx.send(CallEvent::StateChange {
                    state: self.state.snapshot(),
                });
            }
        }
        None
    }

    /// Show the text to clients, then voice it unless the call is text-only
    async fn speak(&self, text: &str) -> Option<Event> {
        let _ = self.broadcast_tx.send(CallEvent::AgentSpeech {
            text: text.to_string(),
        });

        if self.state.voice_degraded || self.stop.is_cancelled() {
            return None;
        }

        let result = tokio::select! {
            biased;
            () = self.stop.cancelled() => Err(VoiceError::Cancelled),
            r = self.voice.speak(text, &self.speak_options) => r,
        };

        match result {
            Ok(Some(clip)) => {
                let _ = self.broadcast_tx.send(CallEvent::Audio {
                    media_type: clip.media_type,
                    data: BASE64_STANDARD.encode(&clip.data),
                });
                None
            }
            Ok(None) => None,
            Err(VoiceError::Cancelled) => {
                tracing::debug!(session_id = %self.context.session_id, "Speech cancelled");
                self.voice.stop();
                None
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %self.context.session_id,
                    error = %e,
                    "Speech failed, continuing text-only"
                );
                Some(Event::SpeechFailed {
                    message: e.to_string(),
                    at: Utc::now(),
                })
            }
        }
    }
}
