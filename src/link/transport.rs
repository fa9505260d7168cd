//! Transport abstraction for the wireless link the session drives.
//!
//! A transport implementation owns device discovery, the GATT client,
//! and its own internal retry policy. The session only needs:
//! - find a device by selector within a timeout
//! - connect, handing over a [`NotificationSink`] for inbound events
//! - subscribe to the RX characteristic
//! - write to the TX characteristic
//! - report the negotiated MTU
//!
//! ## GATT Service Layout
//!
//! | Characteristic | UUID                                   | Perms  |
//! |----------------|----------------------------------------|--------|
//! | TX (host → dev)| `7a230002-5475-a6a4-654c-8431f6ad49c4` | Write  |
//! | RX (dev → host)| `7a230003-5475-a6a4-654c-8431f6ad49c4` | Notify |

use core::fmt;
use core::time::Duration;
use std::sync::Arc;

// ── Constants ────────────────────────────────────────────────

pub const SERVICE_UUID: u128 = 0x7a230001_5475_a6a4_654c_8431f6ad49c4;
pub const CHAR_TX: u128 = 0x7a230002_5475_a6a4_654c_8431f6ad49c4;
pub const CHAR_RX: u128 = 0x7a230003_5475_a6a4_654c_8431f6ad49c4;

/// ATT overhead per write: usable payload is `mtu - 3`.
pub const ATT_OVERHEAD: usize = 3;

/// Leading marker byte of every data-channel frame.
pub const DATA_MARKER: u8 = 0x01;

// ── Discovery ────────────────────────────────────────────────

/// Advertised identity of a discovered peripheral.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub address: String,
    pub name: Option<String>,
    pub services: Vec<u128>,
}

/// Which peripheral to attach to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSelector {
    /// Exact local name (e.g. "Frame 4F"); any named device if `None`.
    pub name: Option<String>,
    pub service: u128,
}

impl DeviceSelector {
    pub fn any() -> Self {
        Self {
            name: None,
            service: SERVICE_UUID,
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            service: SERVICE_UUID,
        }
    }

    /// Devices without an advertised name never match.
    pub fn matches(&self, device: &DeviceInfo) -> bool {
        let Some(name) = device.name.as_deref() else {
            return false;
        };
        device.services.contains(&self.service) && self.name.as_deref().is_none_or(|n| n == name)
    }
}

impl Default for DeviceSelector {
    fn default() -> Self {
        Self::any()
    }
}

// ── Inbound events ───────────────────────────────────────────

/// Callback surface the transport drives from its own event context.
///
/// Both methods may be called from any thread, concurrently with an
/// in-flight write.
pub trait NotificationSink: Send + Sync {
    /// One RX characteristic notification, delivered whole.
    fn on_notification(&self, data: &[u8]);

    /// The link dropped outside the caller's control.
    fn on_disconnected(&self);
}

// ── Transport trait ──────────────────────────────────────────

/// Point-to-point GATT client link.
pub trait Transport {
    /// Error type for this transport.
    type Error: fmt::Display;

    /// Scan for the first device matching `selector`.
    /// Returns `Ok(None)` when nothing matched within `timeout`.
    async fn find(
        &mut self,
        selector: &DeviceSelector,
        timeout: Duration,
    ) -> Result<Option<DeviceInfo>, Self::Error>;

    /// Connect to `device`. Inbound events go to `sink` until the next connect.
    async fn connect(
        &mut self,
        device: &DeviceInfo,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<(), Self::Error>;

    /// Enable notifications on `characteristic`.
    async fn subscribe(&mut self, characteristic: u128) -> Result<(), Self::Error>;

    /// Negotiated MTU of the live connection.
    fn mtu(&self) -> usize;

    /// Submit one write. Returns once the transport accepted it.
    async fn write(&mut self, characteristic: u128, data: &[u8]) -> Result<(), Self::Error>;

    /// Tear down the connection.
    async fn disconnect(&mut self) -> Result<(), Self::Error>;
}

/// A transport that never finds a device.
/// Useful as a placeholder before a real radio is wired in.
pub struct NullTransport;

impl Transport for NullTransport {
    type Error = &'static str;

    async fn find(
        &mut self,
        _selector: &DeviceSelector,
        _timeout: Duration,
    ) -> Result<Option<DeviceInfo>, &'static str> {
        Ok(None)
    }

    async fn connect(
        &mut self,
        _device: &DeviceInfo,
        _sink: Arc<dyn NotificationSink>,
    ) -> Result<(), &'static str> {
        Err("null transport cannot connect")
    }

    async fn subscribe(&mut self, _characteristic: u128) -> Result<(), &'static str> {
        Err("null transport has no characteristics")
    }

    fn mtu(&self) -> usize {
        0
    }

    async fn write(&mut self, _characteristic: u128, _data: &[u8]) -> Result<(), &'static str> {
        Err("null transport is not connected")
    }

    async fn disconnect(&mut self) -> Result<(), &'static str> {
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────
