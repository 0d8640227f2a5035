//! Progress emission (spec.md §9 "Progress emission"): a sink independent of
//! transport. The SSE writer and the non-streaming discard sink both
//! implement this trait; agents never know which one they're talking to.

use bridge_types::{A2aMessage, ProgressEvent};

pub trait Emitter: Send + Sync {
    fn emit_progress(&self, event: ProgressEvent);
    fn emit_a2a(&self, message: A2aMessage);
}

/// Used by the non-streaming `/api/mcp/chat` endpoint, where progress has no
/// observer.
pub struct NullEmitter;

impl Emitter for NullEmitter {
    fn emit_progress(&self, _event: ProgressEvent) {}
    fn emit_a2a(&self, _message: A2aMessage) {}
}
