//! Host-side client for a BLE script/data peripheral link.
//!
//! The framing codec and reply correlation sit behind a [`Session`] that
//! drives an abstract [`Transport`](link::Transport). The crate is
//! executor-agnostic; [`blocking`] wraps it for synchronous callers.

#![deny(unused_must_use)]

pub mod blocking;
pub mod config;
pub mod link;
pub mod upload;

mod error;

pub use config::LinkConfig;
pub use error::{ChannelKind, Error, FrameError, Result};
pub use link::{
    ControlSignal, DeviceInfo, DeviceSelector, Handlers, InboundMessage, NoHandlers,
    NotificationSink, Session, SessionInfo, Transport,
};
