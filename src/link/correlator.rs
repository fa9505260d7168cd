//! Reply correlation between the send flow and the notification flow.
//!
//! Each channel has one [`PendingReply`] slot. A blocking send arms it,
//! the notification path fulfills it, and a disconnect releases it.
//!
//! ```text
//!   arm()            fulfill()
//! Idle ───▶ Armed ───────────▶ Fulfilled ─┐
//!  ▲          │  deadline                 │ next arm()
//!  │          └──────────▶ TimedOut ──────┤
//!  └──────────────────────────────────────┘
//!        release() (disconnect) / drop
//! ```
//!
//! Every arm gets its own `Signal`, so a waiter from an earlier
//! connection can never observe a reply meant for a later one.

use core::cell::RefCell;
use core::time::Duration;
use std::sync::Arc;

use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::Instant;
use log::trace;

use crate::error::{ChannelKind, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyState {
    Idle,
    Armed,
    Fulfilled,
    TimedOut,
}

enum Resolution<T> {
    Fulfilled(T),
    Disconnected,
}

type ReplySignal<T> = Arc<Signal<CriticalSectionRawMutex, Resolution<T>>>;

struct Slot<T> {
    state: ReplyState,
    waiter: Option<ReplySignal<T>>,
}

/// Single-slot outstanding request on one channel.
pub struct PendingReply<T> {
    channel: ChannelKind,
    slot: BlockingMutex<CriticalSectionRawMutex, RefCell<Slot<T>>>,
}

impl<T: Send> PendingReply<T> {
    pub const fn new(channel: ChannelKind) -> Self {
        Self {
            channel,
            slot: BlockingMutex::new(RefCell::new(Slot {
                state: ReplyState::Idle,
                waiter: None,
            })),
        }
    }

    pub fn channel(&self) -> ChannelKind {
        self.channel
    }

    pub fn state(&self) -> ReplyState {
        self.slot.lock(|s| s.borrow().state)
    }

    pub fn is_armed(&self) -> bool {
        self.state() == ReplyState::Armed
    }

    /// Register interest in the next reply on this channel.
    ///
    /// Fails with [`Error::ReplyPending`] while another waiter is armed;
    /// the existing waiter is left untouched.
    pub fn arm(&self) -> Result<ArmedReply<'_, T>> {
        let signal = self.slot.lock(|s| {
            let mut slot = s.borrow_mut();
            if slot.waiter.is_some() {
                return Err(Error::ReplyPending(self.channel));
            }
            let signal: ReplySignal<T> = Arc::new(Signal::new());
            slot.waiter = Some(signal.clone());
            slot.state = ReplyState::Armed;
            Ok(signal)
        })?;
        trace!("{} reply armed", self.channel);
        Ok(ArmedReply {
            reply: self,
            signal,
        })
    }

    /// Hand an inbound payload to the armed waiter, if any.
    ///
    /// Returns `false` (dropping `value`) when nothing is armed.
    pub fn fulfill(&self, value: T) -> bool {
        let waiter = self.slot.lock(|s| {
            let mut slot = s.borrow_mut();
            let waiter = slot.waiter.take();
            if waiter.is_some() {
                slot.state = ReplyState::Fulfilled;
            }
            waiter
        });
        match waiter {
            Some(signal) => {
                trace!("{} reply fulfilled", self.channel);
                signal.signal(Resolution::Fulfilled(value));
                true
            }
            None => false,
        }
    }

    /// Release any armed waiter with [`Error::Disconnected`] and return to `Idle`.
    pub fn release(&self) {
        let waiter = self.slot.lock(|s| {
            let mut slot = s.borrow_mut();
            slot.state = ReplyState::Idle;
            slot.waiter.take()
        });
        if let Some(signal) = waiter {
            trace!("{} reply released by disconnect", self.channel);
            signal.signal(Resolution::Disconnected);
        }
    }

    /// Remove `signal` if it is still the armed waiter.
    fn disarm(&self, signal: &ReplySignal<T>, next: ReplyState) -> bool {
        self.slot.lock(|s| {
            let mut slot = s.borrow_mut();
            match &slot.waiter {
                Some(current) if Arc::ptr_eq(current, signal) => {
                    slot.waiter = None;
                    slot.state = next;
                    true
                }
                _ => false,
            }
        })
    }
}

/// Absolute deadline `timeout` from now, saturating at `Instant::MAX`.
fn deadline(timeout: Duration) -> Instant {
    let ticks = timeout.as_micros() * u128::from(embassy_time::TICK_HZ) / 1_000_000;
    let ticks = u64::try_from(ticks).unwrap_or(u64::MAX);
    Instant::now()
        .checked_add(embassy_time::Duration::from_ticks(ticks))
        .unwrap_or(Instant::MAX)
}

/// Proof of an armed slot. Dropping it without waiting disarms the slot.
pub struct ArmedReply<'a, T: Send> {
    reply: &'a PendingReply<T>,
    signal: ReplySignal<T>,
}

impl<T: Send> ArmedReply<'_, T> {
    /// Suspend until the reply arrives, the deadline passes, or the link drops.
    pub async fn wait(self, timeout: Duration) -> Result<T> {
        let resolution = match embassy_time::with_deadline(deadline(timeout), self.signal.wait())
            .await
        {
            Ok(resolution) => resolution,
            Err(_) => {
                if self.reply.disarm(&self.signal, ReplyState::TimedOut) {
                    trace!("{} reply timed out", self.reply.channel);
                    return Err(Error::DeviceTimeout);
                }
                // resolved between the deadline and the disarm
                match self.signal.try_take() {
                    Some(resolution) => resolution,
                    None => return Err(Error::DeviceTimeout),
                }
            }
        };

        match resolution {
            Resolution::Fulfilled(value) => Ok(value),
            Resolution::Disconnected => Err(Error::Disconnected),
        }
    }
}

impl<T: Send> Drop for ArmedReply<'_, T> {
    fn drop(&mut self) {
        self.reply.disarm(&self.signal, ReplyState::Idle);
    }
}

/// Reply slots for both channels.
pub struct Correlator {
    pub script: PendingReply<String>,
    pub data: PendingReply<Vec<u8>>,
}

impl Correlator {
    pub const fn new() -> Self {
        Self {
            script: PendingReply::new(ChannelKind::Script),
            data: PendingReply::new(ChannelKind::Data),
        }
    }

    /// Release both channels (disconnect path).
    pub fn release_all(&self) {
        self.script.release();
        self.data.release();
    }
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────
