//! Mock implementations for testing
//!
//! These mocks drive a real `CallRuntime` over tokio channels without any
//! audio or network I/O.

use super::{CallEvent, CallRuntime};
use crate::script::AgentType;
use crate::state_machine::{CallContext, ConversationState, Event};
use crate::voice::{AudioClip, SpeakOptions, VoiceError, VoiceInfo, VoiceProvider};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch, Notify};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Mock Voice Provider
// ============================================================================

/// Voice provider that records what it was asked to say
#[derive(Default)]
pub struct MockVoice {
    /// Record of every `speak` call
    pub spoken: Mutex<Vec<String>>,
    /// Error message returned from every `speak`, when set
    failure: Option<String>,
    /// Clip returned from every successful `speak`
    audio: Option<AudioClip>,
    /// How long each `speak` takes
    delay: Option<Duration>,
    stops: AtomicUsize,
    /// Notified when a `speak` starts (for test synchronization)
    pub speak_started: Arc<Notify>,
}

impl MockVoice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_audio(mut self, media_type: &str, data: &[u8]) -> Self {
        self.audio = Some(AudioClip {
            media_type: media_type.to_string(),
            data: data.to_vec(),
        });
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VoiceProvider for MockVoice {
    async fn speak(
        &self,
        text: &str,
        _options: &SpeakOptions,
    ) -> Result<Option<AudioClip>, VoiceError> {
        self.spoken.lock().unwrap().push(text.to_string());
        self.speak_started.notify_one();

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.failure {
            Some(message) => Err(VoiceError::Unavailable(message.clone())),
            None => Ok(self.audio.clone()),
        }
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    async fn voices(&self) -> Result<Vec<VoiceInfo>, VoiceError> {
        Ok(vec![VoiceInfo {
            id: "mock".to_string(),
            name: "Mock".to_string(),
        }])
    }

    fn set_voice(&self, _voice_id: &str) -> Result<(), VoiceError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// Test Runtime
// ============================================================================

/// A running call wired to a mock voice
pub struct TestRuntime {
    pub event_tx: mpsc::Sender<Event>,
    pub broadcast_rx: broadcast::Receiver<CallEvent>,
    pub state_rx: watch::Receiver<ConversationState>,
    pub stop: CancellationToken,
    pub voice: Arc<MockVoice>,
    _runtime_handle: tokio::task::JoinHandle<()>,
}

pub struct TestRuntimeBuilder {
    agent_type: AgentType,
    handoff_delay: Duration,
    voice: Option<MockVoice>,
}

impl TestRuntimeBuilder {
    pub fn new() -> Self {
        Self {
            agent_type: AgentType::Primary,
            handoff_delay: Duration::from_millis(20),
            voice: None,
        }
    }

    pub fn agent_type(mut self, agent_type: AgentType) -> Self {
        self.agent_type = agent_type;
        self
    }

    pub fn handoff_delay(mut self, delay: Duration) -> Self {
        self.handoff_delay = delay;
        self
    }

    pub fn voice(mut self, voice: MockVoice) -> Self {
        self.voice = Some(voice);
        self
    }

    pub fn build(self) -> TestRuntime {
        let voice = Arc::new(self.voice.unwrap_or_default());
        let context = CallContext::new("test-call").with_handoff_delay(self.handoff_delay);
        let initial = ConversationState::new("test-call", self.agent_type);

        let (event_tx, event_rx) = mpsc::channel(32);
        let (broadcast_tx, broadcast_rx) = broadcast::channel(128);
        let (state_tx, state_rx) = watch::channel(initial.clone());
        let stop = CancellationToken::new();

        let runtime = CallRuntime::new(
            context,
            initial,
            voice.clone(),
            SpeakOptions::default(),
            event_rx,
            event_tx.clone(),
            broadcast_tx,
            state_tx,
            stop.clone(),
        )
        .with_rng(StdRng::seed_from_u64(17));

        let handle = tokio::spawn(async move {
            runtime.run().await;
        });

        TestRuntime {
            event_tx,
            broadcast_rx,
            state_rx,
            stop,
            voice,
            _runtime_handle: handle,
        }
    }
}

impl Default for TestRuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRuntime {
    pub async fn send(&self, event: Event) {
        self.event_tx
            .send(event)
            .await
            .expect("Failed to send event");
    }

    pub async fn say(&self, text: &str) {
        self.send(Event::utterance(text, None)).await;
    }

    /// Wait until the state satisfies `predicate`, returning it
    pub async fn wait_for_state(
        &mut self,
        predicate: impl FnMut(&ConversationState) -> bool,
        timeout: Duration,
    ) -> Option<ConversationState> {
        match tokio::time::timeout(timeout, self.state_rx.wait_for(predicate)).await {
            Ok(Ok(state)) => Some((*state).clone()),
            _ => None,
        }
    }

    /// Collect broadcast events until one matches `predicate` (inclusive)
    pub async fn collect_until(
        &mut self,
        mut predicate: impl FnMut(&CallEvent) -> bool,
        timeout: Duration,
    ) -> Vec<CallEvent> {
        let mut seen = Vec::new();
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(Duration::from_millis(50), self.broadcast_rx.recv()).await {
                Ok(Ok(event)) => {
                    let done = predicate(&event);
                    seen.push(event);
                    if done {
                        break;
                    }
                }
                _ => continue,
            }
        }
        seen
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{script_for, Step, INTENT_CLARIFICATION};
    use crate::state_machine::state::{CallPhase, LifecycleKind};

    const WAIT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn test_mock_voice_records_and_fails() {
        let voice = MockVoice::failing("quota exceeded");
        let result = voice.speak("Hello", &SpeakOptions::default()).await;
        assert!(matches!(result, Err(VoiceError::Unavailable(m)) if m == "quota exceeded"));
        assert_eq!(voice.spoken(), vec!["Hello".to_string()]);
    }

    #[tokio::test]
    async fn test_start_speaks_greeting() {
        let mut rt = TestRuntimeBuilder::new()
            .voice(MockVoice::new().with_audio("audio/mpeg", b"ID3"))
            .build();

        rt.send(Event::start()).await;
        let events = rt
            .collect_until(|e| matches!(e, CallEvent::StateChange { .. }), WAIT)
            .await;

        let spoken = rt.voice.spoken();
        assert_eq!(spoken.len(), 1);
        assert!(script_for(AgentType::Primary)
            .greetings
            .contains(&spoken[0].as_str()));

        assert!(events
            .iter()
            .any(|e| matches!(e, CallEvent::AgentSpeech { text } if *text == spoken[0])));
        assert!(events.iter().any(|e| matches!(
            e,
            CallEvent::Audio { media_type, data } if media_type == "audio/mpeg" && data == "SUQz"
        )));
        assert!(events
            .iter()
            .any(|e| matches!(e, CallEvent::Listening { active: true })));

        let state = rt
            .wait_for_state(|s| s.is_listening(), WAIT)
            .await
            .expect("should be listening");
        assert_eq!(state.current_step, Step::Greeting);
    }

    #[tokio::test]
    async fn test_breakdown_handoff_after_delay() {
        let mut rt = TestRuntimeBuilder::new().build();

        rt.send(Event::start()).await;
        rt.say("my truck broke down on the highway").await;

        let state = rt
            .wait_for_state(
                |s| s.agent_type == AgentType::Breakdown && s.is_listening(),
                WAIT,
            )
            .await
            .expect("handoff should complete");

        assert_eq!(state.current_step, Step::Greeting);
        assert_eq!(
            state.events.iter().map(|e| e.kind).collect::<Vec<_>>(),
            vec![
                LifecycleKind::CallStarted,
                LifecycleKind::TransferRequested,
                LifecycleKind::TransferCompleted,
            ]
        );

        // Primary greeting, transfer phrase, breakdown greeting
        let spoken = rt.voice.spoken();
        assert_eq!(spoken.len(), 3);
        assert!(script_for(AgentType::Breakdown)
            .greetings
            .contains(&spoken[2].as_str()));

        let events = rt
            .collect_until(|e| matches!(e, CallEvent::TransferRequested { .. }), WAIT)
            .await;
        assert!(matches!(
            events.last(),
            Some(CallEvent::TransferRequested {
                target: AgentType::Breakdown
            })
        ));
    }

    #[tokio::test]
    async fn test_input_during_handoff_is_rejected() {
        let mut rt = TestRuntimeBuilder::new()
            .handoff_delay(Duration::from_millis(300))
            .build();

        rt.send(Event::start()).await;
        rt.say("I'd like to apply for a driver job").await;
        rt.wait_for_state(|s| s.is_transferring(), WAIT)
            .await
            .expect("should be transferring");

        rt.say("hello? are you there?").await;
        let events = rt
            .collect_until(|e| matches!(e, CallEvent::Error { .. }), WAIT)
            .await;
        assert!(matches!(events.last(), Some(CallEvent::Error { .. })));

        let state = rt
            .wait_for_state(|s| s.agent_type == AgentType::JobApplication, WAIT)
            .await
            .expect("handoff should still complete");
        assert!(!state
            .transcript
            .iter()
            .any(|t| t.text == "hello? are you there?"));
    }

    #[tokio::test]
    async fn test_unclassified_request_clarifies() {
        let mut rt = TestRuntimeBuilder::new().build();

        rt.send(Event::start()).await;
        rt.say("good morning").await;

        let state = rt
            .wait_for_state(|s| s.transcript.len() == 3, WAIT)
            .await
            .expect("clarification expected");
        assert_eq!(state.phase, CallPhase::Listening);
        assert_eq!(rt.voice.spoken()[1], INTENT_CLARIFICATION);
    }

    #[tokio::test]
    async fn test_end_interrupts_speech() {
        let mut rt = TestRuntimeBuilder::new()
            .voice(MockVoice::new().with_delay(Duration::from_secs(5)))
            .build();
        let speak_started = rt.voice.speak_started.clone();
        let start = tokio::time::Instant::now();

        rt.send(Event::start()).await;
        tokio::time::timeout(Duration::from_secs(1), speak_started.notified())
            .await
            .expect("greeting should start");

        rt.stop.cancel();
        rt.send(Event::end()).await;

        let state = rt
            .wait_for_state(|s| s.phase.is_terminal(), WAIT)
            .await
            .expect("call should end");
        assert!(
            start.elapsed() < Duration::from_secs(2),
            "End should not wait for speech, took {:?}",
            start.elapsed()
        );
        assert!(!state.is_listening());
        assert_eq!(
            state.events.last().map(|e| e.kind),
            Some(LifecycleKind::CallEnded)
        );
        assert!(rt.voice.stop_count() >= 1);

        let events = rt
            .collect_until(|e| matches!(e, CallEvent::Ended), WAIT)
            .await;
        assert!(matches!(events.last(), Some(CallEvent::Ended)));
    }

    #[tokio::test]
    async fn test_speech_failure_degrades_to_text() {
        let mut rt = TestRuntimeBuilder::new()
            .agent_type(AgentType::General)
            .voice(MockVoice::failing("synthesis unavailable"))
            .build();

        rt.send(Event::start()).await;
        let state = rt
            .wait_for_state(|s| s.voice_degraded, WAIT)
            .await
            .expect("speech failure should degrade the call");
        assert!(state.is_listening());
        assert_eq!(
            state.events.last().map(|e| e.kind),
            Some(LifecycleKind::SpeechError)
        );

        rt.say("Acme Freight").await;
        let events = rt
            .collect_until(
                |e| matches!(e, CallEvent::AgentSpeech { text } if text.contains("company")),
                WAIT,
            )
            .await;
        assert!(!events.is_empty());

        let state = rt
            .wait_for_state(|s| s.current_step == Step::Company, WAIT)
            .await
            .unwrap();
        assert_eq!(
            state.collected_data.get("caller_name").map(String::as_str),
            Some("Acme Freight")
        );
        // Only the greeting reached the provider
        assert_eq!(rt.voice.spoken().len(), 1);
    }

    #[tokio::test]
    async fn test_recognition_error_pauses_then_resumes() {
        let mut rt = TestRuntimeBuilder::new()
            .agent_type(AgentType::Breakdown)
            .build();

        rt.send(Event::start()).await;
        rt.send(Event::RecognitionFailed {
            message: "no-speech".to_string(),
            at: chrono::Utc::now(),
        })
        .await;
        rt.wait_for_state(|s| s.phase == CallPhase::Paused, WAIT)
            .await
            .expect("listening should pause");

        rt.send(Event::ResumeListening {
            at: chrono::Utc::now(),
        })
        .await;
        let state = rt
            .wait_for_state(|s| s.is_listening(), WAIT)
            .await
            .expect("listening should resume");
        assert_eq!(
            state.events.last().map(|e| e.kind),
            Some(LifecycleKind::ListeningResumed)
        );
    }

    #[tokio::test]
    async fn test_utterance_before_start_reports_error() {
        let mut rt = TestRuntimeBuilder::new().build();

        rt.say("hello").await;
        let events = rt
            .collect_until(|e| matches!(e, CallEvent::Error { .. }), WAIT)
            .await;
        assert!(matches!(
            events.last(),
            Some(CallEvent::Error { message }) if message.contains("not started")
        ));
        assert_eq!(rt.state_rx.borrow().phase, CallPhase::Idle);
    }
}
