//! SSE framing (spec.md §6): `progress|a2a|route|mcp-progress|delta|final|error|done`.
//!
//! Grounded on `holler::sse`'s broadcast-to-`Event` conversion, adapted from
//! a fan-out broadcast channel to a per-request mpsc channel since this
//! stream belongs to exactly one request.

use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::response::sse::{Event, KeepAlive, Sse};
use bridge_core::Emitter;
use bridge_types::{A2aMessage, AgentResponse, ProgressEvent};
use futures::stream::Stream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;

/// Answer text is chunked into ~48 code-point pieces before the `final`
/// frame, matching the writer's fixed chunk size (spec.md §5).
const CHUNK_SIZE: usize = 48;

pub struct SseFrame {
    pub event: &'static str,
    pub data: serde_json::Value,
}

/// Forwards progress/a2a events onto a per-request channel; stops sending
/// once the receiver (the closed SSE socket) is gone.
pub struct ChannelEmitter {
    tx: UnboundedSender<SseFrame>,
    writable: Arc<AtomicBool>,
    request_id: String,
}

impl ChannelEmitter {
    pub fn new(request_id: impl Into<String>) -> (Self, UnboundedReceiver<SseFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, writable: Arc::new(AtomicBool::new(true)), request_id: request_id.into() }, rx)
    }

    fn send(&self, frame: SseFrame) {
        if !self.writable.load(Ordering::Relaxed) {
            return;
        }
        if self.tx.send(frame).is_err() {
            self.writable.store(false, Ordering::Relaxed);
        }
    }

    pub fn send_final(&self, response: &AgentResponse) {
        for chunk in chunk_answer(&response.answer) {
            self.send(SseFrame { event: "delta", data: serde_json::json!({ "text": chunk }) });
        }
        self.send(SseFrame {
            event: "final",
            data: serde_json::to_value(response).unwrap_or(serde_json::Value::Null),
        });
    }

    pub fn send_error(&self, message: impl Into<String>) {
        self.send(SseFrame { event: "error", data: serde_json::json!({ "message": message.into() }) });
    }

    pub fn send_done(&self, ok: bool) {
        self.send(SseFrame { event: "done", data: serde_json::json!({ "ok": ok }) });
    }
}

/// Maps a progress step name to the agent that owns it, for the A2A `from`
/// field (spec.md §4.4's step names double as agent identity here).
fn agent_for_step(step: &str) -> &'static str {
    match step {
        "route" => "plan_agent",
        "manifest_fetch" | "tools_list" => "tool_host_client",
        "tool_call" | "workflow_step" => "mcp_agent",
        _ => "orchestrator",
    }
}

impl Emitter for ChannelEmitter {
    fn emit_progress(&self, event: ProgressEvent) {
        let frame_type = match event.step.as_str() {
            "route" => "route",
            "tool_call" => "mcp-progress",
            _ => "progress",
        };
        let agent = agent_for_step(&event.step);
        let payload = serde_json::to_value(&event).unwrap_or(serde_json::Value::Null);
        self.send(SseFrame { event: frame_type, data: payload.clone() });
        self.emit_a2a(A2aMessage::now(&self.request_id, "orchestrator", agent, "progress", payload));
    }

    fn emit_a2a(&self, message: A2aMessage) {
        self.send(SseFrame { event: "a2a", data: serde_json::to_value(&message).unwrap_or(serde_json::Value::Null) });
    }
}

fn chunk_answer(answer: &str) -> Vec<String> {
    let chars: Vec<char> = answer.chars().collect();
    chars.chunks(CHUNK_SIZE).map(|c| c.iter().collect()).collect()
}

pub fn frames_to_sse(rx: UnboundedReceiver<SseFrame>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = UnboundedReceiverStream::new(rx).map(|frame| {
        Ok(Event::default().event(frame.event).data(frame.data.to_string()))
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(std::time::Duration::from_secs(15)).text("ping"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_answer_splits_by_code_points() {
        let answer = "a".repeat(100);
        let chunks = chunk_answer(&answer);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), CHUNK_SIZE);
        assert_eq!(chunks[2].chars().count(), 4);
    }
}
