//! Caller-facing event handlers.
//!
//! Unsolicited traffic is pushed to a [`Handlers`] implementation chosen
//! when the session is built. Every method defaults to a no-op, so a
//! caller overrides only what it listens to; [`NoHandlers`] ignores all.
//!
//! Handlers run on the transport's notification context. They must not
//! block and must not call back into the session.

use super::chunked::InboundMessage;

pub trait Handlers: Send + Sync + 'static {
    /// Script-channel text (device `print` output).
    fn on_print(&self, _text: &str) {}

    /// Raw data-channel payload, marker byte stripped.
    fn on_data(&self, _data: &[u8]) {}

    /// A binary message reassembled from data-channel chunks.
    fn on_message(&self, _message: &InboundMessage) {}

    /// The session dropped, voluntarily or not.
    fn on_disconnect(&self) {}
}

/// Handler set that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHandlers;

impl Handlers for NoHandlers {}
