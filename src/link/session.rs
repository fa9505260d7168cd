//! Connection session. Owns the single live transport link.
//!
//! Two flows touch a session:
//!
//! ```text
//!  caller ──send──▶ Session ──write──▶ Transport
//!                     │ ▲
//!        arm / wait   │ │ fulfill
//!                     ▼ │
//!                 Correlator ◀── LinkHandle ◀── notifications
//!                                     │         (transport context)
//!                                     └──────▶ Handlers
//! ```
//!
//! The send flow holds `&mut Session`, so sends are serialized by the
//! borrow checker. The notification flow reaches the shared state only
//! through the `LinkHandle` handed to the transport at connect time.
//! Each connect gets a new link generation; events carried by a handle
//! from an earlier generation are ignored.

use core::cell::{Cell, RefCell};
use core::sync::atomic::{AtomicU64, Ordering};
use core::time::Duration;
use std::sync::Arc;

use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::{debug, info, warn};

use super::chunked::Reassembler;
use super::correlator::{Correlator, ReplyState};
use super::handlers::{Handlers, NoHandlers};
use super::transport::{
    ATT_OVERHEAD, CHAR_RX, CHAR_TX, DATA_MARKER, DeviceSelector, NotificationSink, Transport,
};
use crate::config::LinkConfig;
use crate::error::{ChannelKind, Error, Result};

/// Extra byte reserved on the data channel for its marker.
pub const DATA_MARKER_SIZE: usize = 1;

/// Details of an established connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub address: String,
    pub name: Option<String>,
    pub mtu: usize,
}

// ── Shared link state ────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LinkState {
    connected: bool,
    mtu: usize,
    generation: u64,
}

impl LinkState {
    const INITIAL: Self = Self {
        connected: false,
        mtu: 0,
        generation: 0,
    };

    fn is_live(&self, generation: u64) -> bool {
        self.connected && self.generation == generation
    }
}

/// State reachable from both the send flow and the notification flow.
struct Shared<H> {
    link: BlockingMutex<CriticalSectionRawMutex, Cell<LinkState>>,
    generations: AtomicU64,
    correlator: Correlator,
    reassembler: BlockingMutex<CriticalSectionRawMutex, RefCell<Reassembler>>,
    handlers: H,
}

impl<H: Handlers> Shared<H> {
    fn new(handlers: H) -> Self {
        Self {
            link: BlockingMutex::new(Cell::new(LinkState::INITIAL)),
            generations: AtomicU64::new(0),
            correlator: Correlator::new(),
            reassembler: BlockingMutex::new(RefCell::new(Reassembler::new())),
            handlers,
        }
    }

    fn link(&self) -> LinkState {
        self.link.lock(Cell::get)
    }

    fn is_live(&self, generation: u64) -> bool {
        self.link().is_live(generation)
    }

    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Return link, correlator and reassembler to their initial state.
    fn reset(&self) {
        self.link.lock(|l| l.set(LinkState::INITIAL));
        self.correlator.release_all();
        self.reassembler.lock(|r| r.borrow_mut().reset());
    }

    fn attach(&self, generation: u64, mtu: usize) {
        self.reset();
        self.link.lock(|l| {
            l.set(LinkState {
                connected: true,
                mtu,
                generation,
            });
        });
    }

    /// Tear down the live link if it is still `generation` (any, if `None`).
    /// Returns whether a live link was dropped.
    fn detach(&self, generation: Option<u64>) -> bool {
        let dropped = self.link.lock(|l| {
            let link = l.get();
            let matches = generation.is_none_or(|g| g == link.generation);
            if link.connected && matches {
                l.set(LinkState::INITIAL);
                true
            } else {
                false
            }
        });
        if dropped {
            self.correlator.release_all();
            self.reassembler.lock(|r| r.borrow_mut().reset());
        }
        dropped
    }

    fn drop_link(&self, generation: Option<u64>, reason: &str) {
        if self.detach(generation) {
            info!("Link: disconnected ({})", reason);
            self.handlers.on_disconnect();
        }
    }

    /// Route one notification: the correlator first, then the handlers.
    fn route(&self, generation: u64, data: &[u8]) {
        if !self.is_live(generation) {
            warn!("Link: dropping notification from stale link");
            return;
        }
        let Some((&marker, rest)) = data.split_first() else {
            warn!("Link: dropping empty notification");
            return;
        };

        if marker == DATA_MARKER {
            self.correlator.data.fulfill(rest.to_vec());
            self.handlers.on_data(rest);

            let fed = self.reassembler.lock(|r| r.borrow_mut().feed(rest));
            match fed {
                Ok(Some(message)) => self.handlers.on_message(&message),
                Ok(None) => {}
                Err(e) => warn!("Link: discarding data chunk: {}", e),
            }
        } else {
            let text = String::from_utf8_lossy(data);
            self.correlator.script.fulfill(text.to_string());
            self.handlers.on_print(&text);
        }
    }
}

/// Notification entry point handed to the transport for one connection.
struct LinkHandle<H> {
    shared: Arc<Shared<H>>,
    generation: u64,
}

impl<H: Handlers> NotificationSink for LinkHandle<H> {
    fn on_notification(&self, data: &[u8]) {
        self.shared.route(self.generation, data);
    }

    fn on_disconnected(&self) {
        self.shared.drop_link(Some(self.generation), "transport");
    }
}

// ── Session ──────────────────────────────────────────────────

/// One logical connection to the peripheral.
pub struct Session<T: Transport, H: Handlers = NoHandlers> {
    transport: T,
    shared: Arc<Shared<H>>,
    config: LinkConfig,
    info: Option<SessionInfo>,
}

impl<T: Transport> Session<T, NoHandlers> {
    pub fn new(transport: T) -> Self {
        Self::with_handlers(transport, NoHandlers)
    }
}

impl<T: Transport, H: Handlers> Session<T, H> {
    pub fn with_handlers(transport: T, handlers: H) -> Self {
        Self {
            transport,
            shared: Arc::new(Shared::new(handlers)),
            config: LinkConfig::default(),
            info: None,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: LinkConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn handlers(&self) -> &H {
        &self.shared.handlers
    }

    /// Discover and attach to a device matching `selector` within `timeout`.
    ///
    /// An existing connection is dropped first.
    pub async fn connect(
        &mut self,
        selector: &DeviceSelector,
        timeout: Duration,
    ) -> Result<SessionInfo> {
        if self.is_connected() {
            info!("Link: replacing existing connection");
            self.disconnect().await?;
        }

        let device = self
            .transport
            .find(selector, timeout)
            .await
            .map_err(|e| Error::ConnectFailed(e.to_string()))?
            .ok_or(Error::NoDeviceFound)?;

        let generation = self.shared.next_generation();
        let handle = Arc::new(LinkHandle {
            shared: Arc::clone(&self.shared),
            generation,
        });
        self.transport
            .connect(&device, handle)
            .await
            .map_err(|e| Error::ConnectFailed(e.to_string()))?;

        let mtu = self.transport.mtu();
        self.shared.attach(generation, mtu);

        if let Err(e) = self.transport.subscribe(CHAR_RX).await {
            self.shared.detach(Some(generation));
            if let Err(cleanup) = self.transport.disconnect().await {
                warn!("Link: disconnect after failed subscribe: {}", cleanup);
            }
            return Err(Error::SubscriptionFailed(e.to_string()));
        }

        info!("Link: connected to {} (MTU={})", device.address, mtu);
        let info = SessionInfo {
            address: device.address,
            name: device.name,
            mtu,
        };
        self.info = Some(info.clone());
        Ok(info)
    }

    /// Connect using the configured device name and connect timeout.
    pub async fn connect_configured(&mut self) -> Result<SessionInfo> {
        let selector = match &self.config.device_name {
            Some(name) => DeviceSelector::named(name.clone()),
            None => DeviceSelector::any(),
        };
        let timeout = self.config.connect_timeout();
        self.connect(&selector, timeout).await
    }

    /// Release the link. Armed waiters resolve with [`Error::Disconnected`].
    ///
    /// Local state is reset even if the transport reports an error.
    pub async fn disconnect(&mut self) -> Result<()> {
        if !self.is_connected() {
            debug!("Link: disconnect while not connected");
            self.info = None;
            return Ok(());
        }
        let result = self.transport.disconnect().await;
        self.shared.drop_link(None, "local");
        self.info = None;
        result.map_err(|e| Error::Transport(e.to_string()))
    }

    pub fn is_connected(&self) -> bool {
        self.shared.link().connected
    }

    pub fn info(&self) -> Option<&SessionInfo> {
        self.info.as_ref().filter(|_| self.is_connected())
    }

    /// Negotiated MTU, or 0 when not connected.
    pub fn mtu(&self) -> usize {
        let link = self.shared.link();
        if link.connected { link.mtu } else { 0 }
    }

    /// Longest script write, or 0 when not connected.
    pub fn max_script_payload(&self) -> usize {
        self.mtu().saturating_sub(ATT_OVERHEAD)
    }

    /// Longest data-channel payload after its marker, or 0 when not connected.
    pub fn max_binary_payload(&self) -> usize {
        self.mtu().saturating_sub(ATT_OVERHEAD + DATA_MARKER_SIZE)
    }

    pub fn reply_state(&self, channel: ChannelKind) -> ReplyState {
        match channel {
            ChannelKind::Script => self.shared.correlator.script.state(),
            ChannelKind::Data => self.shared.correlator.data.state(),
        }
    }

    /// Perform exactly one transport write of `chunk`.
    pub async fn write(&mut self, chunk: &[u8]) -> Result<()> {
        let generation = self.live_generation()?;
        self.write_frame(generation, chunk).await
    }

    /// Generation of the live link, for pinning a multi-write operation.
    pub(crate) fn live_generation(&self) -> Result<u64> {
        let link = self.shared.link();
        if link.connected {
            Ok(link.generation)
        } else {
            Err(Error::NotConnected)
        }
    }

    /// Reply slots, detached from the session borrow so a waiter can be
    /// held across `write_frame`.
    pub(super) fn replies(&self) -> Replies<H> {
        Replies(Arc::clone(&self.shared))
    }

    /// Write one frame on link `generation`.
    ///
    /// Fails with [`Error::Disconnected`] if that link dropped since the
    /// operation started.
    pub(crate) async fn write_frame(&mut self, generation: u64, data: &[u8]) -> Result<()> {
        let link = self.shared.link();
        if !link.is_live(generation) {
            return Err(Error::Disconnected);
        }
        let max = link.mtu.saturating_sub(ATT_OVERHEAD);
        if data.len() > max {
            return Err(Error::PayloadTooLarge {
                len: data.len(),
                max,
            });
        }

        debug!("Link: TX {} bytes {:02x?}", data.len(), data);
        match self.transport.write(CHAR_TX, data).await {
            Ok(()) => Ok(()),
            Err(_) if !self.shared.is_live(generation) => Err(Error::Disconnected),
            Err(e) => Err(Error::Transport(e.to_string())),
        }
    }
}

/// Owned handle on a session's reply slots.
pub(super) struct Replies<H>(Arc<Shared<H>>);

impl<H> core::ops::Deref for Replies<H> {
    type Target = Correlator;

    fn deref(&self) -> &Correlator {
        &self.0.correlator
    }
}

// ── Tests ────────────────────────────────────────────────────
