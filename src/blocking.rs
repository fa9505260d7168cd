//! Synchronous facade over [`Session`].
//!
//! Each call drives the async operation to completion on the calling
//! thread with `futures_lite::future::block_on`. The transport must
//! deliver notifications from its own thread or runtime; a transport
//! that needs this thread to poll its event loop will deadlock here.

use core::time::Duration;
use std::path::Path;

use futures_lite::future::block_on;

use crate::error::Result;
use crate::link::channels::ControlSignal;
use crate::link::handlers::{Handlers, NoHandlers};
use crate::link::session::{Session, SessionInfo};
use crate::link::transport::{DeviceSelector, Transport};

pub struct BlockingSession<T: Transport, H: Handlers = NoHandlers> {
    inner: Session<T, H>,
}

impl<T: Transport, H: Handlers> BlockingSession<T, H> {
    pub fn new(inner: Session<T, H>) -> Self {
        Self { inner }
    }

    pub fn session(&self) -> &Session<T, H> {
        &self.inner
    }

    pub fn into_inner(self) -> Session<T, H> {
        self.inner
    }

    pub fn connect(&mut self, selector: &DeviceSelector, timeout: Duration) -> Result<SessionInfo> {
        block_on(self.inner.connect(selector, timeout))
    }

    pub fn disconnect(&mut self) -> Result<()> {
        block_on(self.inner.disconnect())
    }

    pub fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    pub fn max_script_payload(&self) -> usize {
        self.inner.max_script_payload()
    }

    pub fn max_binary_payload(&self) -> usize {
        self.inner.max_binary_payload()
    }

    pub fn send_script(
        &mut self,
        text: &str,
        await_reply: bool,
        timeout: Duration,
    ) -> Result<Option<String>> {
        block_on(self.inner.send_script(text, await_reply, timeout))
    }

    pub fn send_data(
        &mut self,
        data: &[u8],
        await_reply: bool,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>> {
        block_on(self.inner.send_data(data, await_reply, timeout))
    }

    pub fn send_message(
        &mut self,
        tag: u8,
        payload: &[u8],
        await_reply: bool,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>> {
        block_on(self.inner.send_message(tag, payload, await_reply, timeout))
    }

    pub fn send_control_signal(&mut self, code: u8) -> Result<()> {
        block_on(self.inner.send_control_signal(code))
    }

    pub fn send_signal(&mut self, signal: ControlSignal) -> Result<()> {
        block_on(self.inner.send_signal(signal))
    }

    pub fn upload_file(&mut self, local_path: impl AsRef<Path>, device_path: &str) -> Result<()> {
        block_on(self.inner.upload_file(local_path, device_path))
    }

    pub fn upload_file_from_string(&mut self, content: &str, device_path: &str) -> Result<()> {
        block_on(self.inner.upload_file_from_string(content, device_path))
    }
}
