//! Server-Sent Events support

use crate::runtime::CallEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Stream an `init` event with the current snapshot, then live call events
pub fn sse_stream(
    snapshot: serde_json::Value,
    broadcast_rx: tokio::sync::broadcast::Receiver<CallEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let init = futures::stream::once(async move {
        Ok(Event::default()
            .event("init")
            .data(json!({ "type": "init", "call": snapshot }).to_string()))
    });

    let broadcasts = BroadcastStream::new(broadcast_rx).filter_map(|result| match result {
        Ok(event) => Some(Ok(call_event_to_axum(event))),
        Err(_) => None, // Skip lagged messages
    });

    Sse::new(init.chain(broadcasts)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn call_event_to_axum(event: CallEvent) -> Event {
    let (event_type, data) = event_payload(event);
    Event::default().event(event_type).data(data.to_string())
}

fn event_payload(event: CallEvent) -> (&'static str, serde_json::Value) {
    match event {
        CallEvent::StateChange { state } => (
            "state_change",
            json!({ "type": "state_change", "state": state }),
        ),
        CallEvent::AgentSpeech { text } => (
            "agent_speech",
            json!({ "type": "agent_speech", "text": text }),
        ),
        CallEvent::Audio { media_type, data } => (
            "audio",
            json!({ "type": "audio", "media_type": media_type, "data": data }),
        ),
        CallEvent::Listening { active } => (
            "listening",
            json!({ "type": "listening", "active": active }),
        ),
        CallEvent::TransferRequested { target } => (
            "transfer_requested",
            json!({ "type": "transfer_requested", "target": target }),
        ),
        CallEvent::Ended => ("ended", json!({ "type": "ended" })),
        CallEvent::Error { message } => (
            "error",
            json!({ "type": "error", "message": message }),
        ),
    }
}
