//! Channel API: script, binary and control sends over a [`Session`].
//!
//! ```text
//! script:   [text bytes]                      ≤ mtu - 3
//! data:     [0x01][payload]                   payload ≤ mtu - 4
//! message:  [0x01][tag][len_hi][len_lo]...    then [0x01][tag]... per chunk
//! control:  [code]                            0x03 break, 0x04 reset
//! ```
//!
//! When a reply is requested the channel is armed right before the final
//! write, so a reply that races the write acknowledgement is not missed.
//! A failed write aborts the whole send; chunk runs are not resumable and
//! the caller must resend the full message.

use core::time::Duration;

use super::chunked::split_message;
use super::handlers::Handlers;
use super::session::Session;
use super::transport::{DATA_MARKER, Transport};
use crate::error::{ChannelKind, Error, Result};

/// Single-byte control frames on the script characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ControlSignal {
    /// Break the currently executing script.
    Break = 0x03,
    /// Reset the script virtual machine.
    Reset = 0x04,
}

impl ControlSignal {
    pub const fn code(self) -> u8 {
        self as u8
    }
}

fn data_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(1 + payload.len());
    frame.push(DATA_MARKER);
    frame.extend_from_slice(payload);
    frame
}

impl<T: Transport, H: Handlers> Session<T, H> {
    /// Send a script as one write; optionally wait for its `print` reply.
    pub async fn send_script(
        &mut self,
        text: &str,
        await_reply: bool,
        timeout: Duration,
    ) -> Result<Option<String>> {
        let generation = self.live_generation()?;
        let max = self.max_script_payload();
        if text.len() > max {
            return Err(Error::PayloadTooLarge {
                len: text.len(),
                max,
            });
        }

        if !await_reply {
            self.write_frame(generation, text.as_bytes()).await?;
            return Ok(None);
        }

        let replies = self.replies();
        let armed = replies.script.arm()?;
        self.write_frame(generation, text.as_bytes()).await?;
        armed.wait(timeout).await.map(Some)
    }

    /// Send a script and wait for its reply using the configured deadline.
    pub async fn eval(&mut self, text: &str) -> Result<String> {
        let timeout = self.config().reply_timeout();
        let reply = self.send_script(text, true, timeout).await?;
        reply.ok_or(Error::DeviceTimeout)
    }

    /// Send one raw data-channel frame of at most `max_binary_payload()` bytes.
    pub async fn send_data(
        &mut self,
        data: &[u8],
        await_reply: bool,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>> {
        let generation = self.live_generation()?;
        let max = self.max_binary_payload();
        if data.len() > max {
            return Err(Error::PayloadTooLarge {
                len: data.len(),
                max,
            });
        }
        let frame = data_frame(data);

        if !await_reply {
            self.write_frame(generation, &frame).await?;
            return Ok(None);
        }

        let replies = self.replies();
        let armed = replies.data.arm()?;
        self.write_frame(generation, &frame).await?;
        armed.wait(timeout).await.map(Some)
    }

    /// Split a tagged payload into chunks and send them in order.
    pub async fn send_message(
        &mut self,
        tag: u8,
        payload: &[u8],
        await_reply: bool,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>> {
        let generation = self.live_generation()?;
        let replies = self.replies();
        if await_reply && replies.data.is_armed() {
            return Err(Error::ReplyPending(ChannelKind::Data));
        }

        let chunks = split_message(tag, payload, self.max_binary_payload())?;
        let Some((last, body)) = chunks.split_last() else {
            return Ok(None);
        };
        log::debug!(
            "Link: message tag={} len={} in {} chunks",
            tag,
            payload.len(),
            chunks.len()
        );

        for chunk in body {
            self.write_frame(generation, &data_frame(chunk.as_bytes()))
                .await?;
        }

        let armed = if await_reply {
            Some(replies.data.arm()?)
        } else {
            None
        };
        self.write_frame(generation, &data_frame(last.as_bytes()))
            .await?;

        match armed {
            Some(armed) => armed.wait(timeout).await.map(Some),
            None => Ok(None),
        }
    }

    /// Fire-and-forget single-byte control frame.
    pub async fn send_control_signal(&mut self, code: u8) -> Result<()> {
        let generation = self.live_generation()?;
        self.write_frame(generation, &[code]).await
    }

    pub async fn send_signal(&mut self, signal: ControlSignal) -> Result<()> {
        self.send_control_signal(signal.code()).await
    }

    /// Reset the device's script virtual machine.
    pub async fn send_reset_signal(&mut self) -> Result<()> {
        self.send_signal(ControlSignal::Reset).await
    }

    /// Break any currently executing script.
    pub async fn send_break_signal(&mut self) -> Result<()> {
        self.send_signal(ControlSignal::Break).await
    }
}
