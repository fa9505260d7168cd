//! Host-side link protocol.
//!
//! Framing and flow control for a point-to-point BLE GATT link carrying
//! two logical channels: script text and binary data.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                      Link Stack                            │
//! │                                                            │
//! │  ┌──────────┐   ┌──────────┐   ┌───────────────────────┐  │
//! │  │ Channels │──▶│ Chunked  │──▶│  Session (writes)     │──┼─▶ Transport
//! │  │ (API)    │   │ / text   │   │                       │  │
//! │  └──────────┘   └──────────┘   └───────────────────────┘  │
//! │       ▲                                    ▲               │
//! │       │ reply   ┌────────────┐  notify     │               │
//! │       └─────────│ Correlator │◀────────────┴───────────────┼── Transport
//! │                 └────────────┘   ──▶ Handlers              │
//! └────────────────────────────────────────────────────────────┘
//! ```

pub mod channels;
pub mod chunked;
pub mod correlator;
pub mod handlers;
pub mod session;
pub mod text;
pub mod transport;

pub use channels::ControlSignal;
pub use chunked::{InboundMessage, Reassembler, WireChunk, reassemble, split_message};
pub use correlator::{ArmedReply, Correlator, PendingReply, ReplyState};
pub use handlers::{Handlers, NoHandlers};
pub use session::{Session, SessionInfo};
pub use text::{escape_script_string, split_text};
pub use transport::{DeviceInfo, DeviceSelector, NotificationSink, NullTransport, Transport};
