//! Pure state transition function

use super::state::{CallPhase, LifecycleKind};
use super::{CallContext, ConversationState, Effect, Event};
use crate::script::{
    classify, Step, CONTINUATION_PROMPT, FALLBACK_GREETING, INTENT_CLARIFICATION,
};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

/// Spoken if a script somehow has no phrase for a transfer
const GENERIC_TRANSFER_PHRASE: &str = "One moment while I transfer you.";

/// Key under which the primary agent records the caller's opening request
pub const INITIAL_REQUEST_KEY: &str = "initial_request";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConversationState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConversationState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Text of every `Speak` effect, in order
    #[allow(dead_code)] // Used by tests
    pub fn spoken(&self) -> Vec<&str> {
        self.effects
            .iter()
            .filter_map(|e| match e {
                Effect::Speak { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Call has not started")]
    NotStarted,
    #[error("Call already started")]
    AlreadyStarted,
    #[error("Transfer in progress, input is suspended")]
    TransferInProgress,
    #[error("Call has ended")]
    CallEnded,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function.
///
/// Given the same state, event and random source it always produces the
/// same result, with no I/O. The random source only chooses between
/// greeting, transfer and closing variants.
pub fn transition<R: Rng + ?Sized>(
    state: &ConversationState,
    context: &CallContext,
    event: Event,
    rng: &mut R,
) -> Result<TransitionResult, TransitionError> {
    let mut next = state.clone();

    match (state.phase, event) {
        (CallPhase::Ended, _) => Err(TransitionError::CallEnded),

        // ============================================================
        // Call start
        // ============================================================
        (CallPhase::Idle, Event::Start { at }) => {
            let greeting = pick(next.script().greetings, FALLBACK_GREETING, rng);
            next.phase = CallPhase::Listening;
            next.current_step = Step::Greeting;
            next.log(
                LifecycleKind::CallStarted,
                Some(next.agent_type.to_string()),
                at,
            );
            next.say(greeting, at);
            Ok(TransitionResult::new(next)
                .with_effect(Effect::speak(greeting))
                .with_effect(Effect::StartListening)
                .with_effect(Effect::PublishState))
        }

        (_, Event::Start { .. }) => Err(TransitionError::AlreadyStarted),

        // ============================================================
        // Caller speech
        // ============================================================
        (CallPhase::Idle, Event::UserUtterance { .. }) => Err(TransitionError::NotStarted),

        (CallPhase::Transferring { .. }, Event::UserUtterance { .. }) => {
            Err(TransitionError::TransferInProgress)
        }

        (
            CallPhase::Listening | CallPhase::Paused,
            Event::UserUtterance {
                text,
                confidence,
                at,
            },
        ) => {
            next.hear(&text, confidence, at);
            if next.agent_type.is_specialized() {
                answer_question(next, &text, at, rng)
            } else {
                route_caller(next, context, &text, at, rng)
            }
        }

        // ============================================================
        // Transfer handoff
        // ============================================================
        (CallPhase::Transferring { target }, Event::TransferReady { target: ready, at })
            if target == ready =>
        {
            next.agent_type = target;
            next.current_step = Step::Greeting;
            next.phase = CallPhase::Listening;
            let greeting = pick(next.script().greetings, FALLBACK_GREETING, rng);
            next.log(
                LifecycleKind::TransferCompleted,
                Some(target.to_string()),
                at,
            );
            next.say(greeting, at);
            Ok(TransitionResult::new(next)
                .with_effect(Effect::speak(greeting))
                .with_effect(Effect::StartListening)
                .with_effect(Effect::PublishState))
        }

        // ============================================================
        // Voice I/O failures
        // ============================================================
        (_, Event::SpeechFailed { message, at }) => {
            next.voice_degraded = true;
            next.log(LifecycleKind::SpeechError, Some(message), at);
            Ok(TransitionResult::new(next).with_effect(Effect::PublishState))
        }

        (phase, Event::RecognitionFailed { message, at }) => {
            next.log(LifecycleKind::RecognitionError, Some(message), at);
            if phase == CallPhase::Listening {
                next.phase = CallPhase::Paused;
                Ok(TransitionResult::new(next)
                    .with_effect(Effect::StopListening)
                    .with_effect(Effect::PublishState))
            } else {
                Ok(TransitionResult::new(next).with_effect(Effect::PublishState))
            }
        }

        (CallPhase::Paused, Event::ResumeListening { at }) => {
            next.phase = CallPhase::Listening;
            next.log(LifecycleKind::ListeningResumed, None, at);
            Ok(TransitionResult::new(next)
                .with_effect(Effect::StartListening)
                .with_effect(Effect::PublishState))
        }

        // ============================================================
        // Hang up
        // ============================================================
        (_, Event::End { at }) => {
            next.phase = CallPhase::Ended;
            next.log(LifecycleKind::CallEnded, None, at);
            Ok(TransitionResult::new(next)
                .with_effect(Effect::StopAudio)
                .with_effect(Effect::StopListening)
                .with_effect(Effect::PublishState))
        }

        // ============================================================
        // Invalid Transitions
        // ============================================================
        (phase, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {phase:?} with event {}",
            event.name()
        ))),
    }
}

/// Primary agent: classify the request and either transfer or ask again
fn route_caller<R: Rng + ?Sized>(
    mut next: ConversationState,
    context: &CallContext,
    text: &str,
    at: DateTime<Utc>,
    rng: &mut R,
) -> Result<TransitionResult, TransitionError> {
    let Some(route) = classify(text) else {
        next.say(INTENT_CLARIFICATION, at);
        return Ok(TransitionResult::new(next)
            .with_effect(Effect::speak(INTENT_CLARIFICATION))
            .with_effect(Effect::PublishState));
    };

    let phrases = next
        .script()
        .transition(route.transition)
        .map_or(&[][..], |t| t.phrases);
    let phrase = pick(phrases, GENERIC_TRANSFER_PHRASE, rng);

    next.collected_data
        .insert(INITIAL_REQUEST_KEY.to_string(), text.to_string());
    next.phase = CallPhase::Transferring {
        target: route.target,
    };
    next.log(
        LifecycleKind::TransferRequested,
        Some(route.target.to_string()),
        at,
    );
    next.say(phrase, at);

    Ok(TransitionResult::new(next)
        .with_effect(Effect::speak(phrase))
        .with_effect(Effect::RequestTransfer {
            target: route.target,
            delay: context.handoff_delay,
        })
        .with_effect(Effect::PublishState))
}

/// Specialized agent: record the answer and ask the next question
fn answer_question<R: Rng + ?Sized>(
    mut next: ConversationState,
    text: &str,
    at: DateTime<Utc>,
    rng: &mut R,
) -> Result<TransitionResult, TransitionError> {
    let script = next.script();
    let step = next.current_step;

    if step == Step::Closing {
        next.say(CONTINUATION_PROMPT, at);
        return Ok(TransitionResult::new(next)
            .with_effect(Effect::speak(CONTINUATION_PROMPT))
            .with_effect(Effect::PublishState));
    }

    let Some(following) = script.next_step(step) else {
        return Err(TransitionError::InvalidTransition(format!(
            "Step {step} is not part of the {} script",
            next.agent_type
        )));
    };

    if let Some(key) = script.data_key(step) {
        next.collected_data.insert(key.to_string(), text.to_string());
    }

    let reply = if following == Step::Closing {
        pick(script.closings, CONTINUATION_PROMPT, rng)
    } else {
        script.question(following).map_or(CONTINUATION_PROMPT, |q| q.text)
    };

    next.current_step = following;
    next.say(reply, at);

    Ok(TransitionResult::new(next)
        .with_effect(Effect::speak(reply))
        .with_effect(Effect::PublishState))
}

fn pick<R: Rng + ?Sized>(
    options: &'static [&'static str],
    fallback: &'static str,
    rng: &mut R,
) -> &'static str {
    options.choose(rng).copied().unwrap_or(fallback)
}
