//! Mock transport adapter for integration tests.
//!
//! Records every TX write and lets tests play the peripheral: push
//! notifications, drop the link, or reply automatically to writes.

use framelink::link::chunked::InboundMessage;
use framelink::link::transport::SERVICE_UUID;
use framelink::{DeviceInfo, DeviceSelector, Handlers, NotificationSink, Transport};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const FRAME_ADDRESS: &str = "F0:0D:00:00:4F:01";
pub const FRAME_NAME: &str = "Frame 4F";

type Responder = Box<dyn FnMut(usize, &[u8]) -> Vec<Vec<u8>> + Send>;

// ── Peripheral side ───────────────────────────────────────────

#[derive(Default)]
struct PeripheralState {
    sink: Option<Arc<dyn NotificationSink>>,
    writes: Vec<Vec<u8>>,
    subscribed: Vec<u128>,
    responder: Option<Responder>,
    connects: u32,
    disconnects: u32,
}

/// Test-side handle on the simulated device.
#[derive(Clone, Default)]
pub struct Peripheral {
    inner: Arc<Mutex<PeripheralState>>,
}

#[allow(dead_code)]
impl Peripheral {
    /// Deliver one notification to the host, as the radio would.
    pub fn notify(&self, data: &[u8]) {
        let sink = self.inner.lock().unwrap().sink.clone();
        if let Some(sink) = sink {
            sink.on_notification(data);
        }
    }

    /// Drop the link from the device side.
    pub fn drop_link(&self) {
        let sink = self.inner.lock().unwrap().sink.take();
        if let Some(sink) = sink {
            sink.on_disconnected();
        }
    }

    /// Reply to writes: `f(write_index, bytes)` returns notifications to send back.
    pub fn respond_with(&self, f: impl FnMut(usize, &[u8]) -> Vec<Vec<u8>> + Send + 'static) {
        self.inner.lock().unwrap().responder = Some(Box::new(f));
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.inner.lock().unwrap().writes.clone()
    }

    pub fn subscribed(&self) -> Vec<u128> {
        self.inner.lock().unwrap().subscribed.clone()
    }

    pub fn connects(&self) -> u32 {
        self.inner.lock().unwrap().connects
    }

    pub fn disconnects(&self) -> u32 {
        self.inner.lock().unwrap().disconnects
    }
}

// ── MockTransport ─────────────────────────────────────────────

pub struct MockTransport {
    pub peripheral: Peripheral,
    pub devices: Vec<DeviceInfo>,
    pub mtu: usize,
    pub fail_connect: bool,
    pub fail_subscribe: bool,
    /// Index of the TX write that is rejected.
    pub fail_write_at: Option<usize>,
    /// Index of the TX write during which the device drops the link.
    pub drop_at: Option<usize>,
}

#[allow(dead_code)]
impl MockTransport {
    /// A single advertising Frame with the given negotiated MTU.
    pub fn frame(mtu: usize) -> Self {
        Self {
            peripheral: Peripheral::default(),
            devices: vec![DeviceInfo {
                address: FRAME_ADDRESS.into(),
                name: Some(FRAME_NAME.into()),
                services: vec![SERVICE_UUID],
            }],
            mtu,
            fail_connect: false,
            fail_subscribe: false,
            fail_write_at: None,
            drop_at: None,
        }
    }

    pub fn empty() -> Self {
        Self {
            devices: Vec::new(),
            ..Self::frame(23)
        }
    }

    pub fn handle(&self) -> Peripheral {
        self.peripheral.clone()
    }
}

impl Transport for MockTransport {
    type Error = String;

    async fn find(
        &mut self,
        selector: &DeviceSelector,
        _timeout: Duration,
    ) -> Result<Option<DeviceInfo>, String> {
        Ok(self.devices.iter().find(|d| selector.matches(d)).cloned())
    }

    async fn connect(
        &mut self,
        _device: &DeviceInfo,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<(), String> {
        if self.fail_connect {
            return Err("connection refused".into());
        }
        let mut state = self.peripheral.inner.lock().unwrap();
        state.sink = Some(sink);
        state.connects += 1;
        Ok(())
    }

    async fn subscribe(&mut self, characteristic: u128) -> Result<(), String> {
        if self.fail_subscribe {
            return Err("CCCD write failed".into());
        }
        self.peripheral
            .inner
            .lock()
            .unwrap()
            .subscribed
            .push(characteristic);
        Ok(())
    }

    fn mtu(&self) -> usize {
        self.mtu
    }

    async fn write(&mut self, _characteristic: u128, data: &[u8]) -> Result<(), String> {
        let index = self.peripheral.inner.lock().unwrap().writes.len();
        if self.drop_at == Some(index) {
            self.peripheral.drop_link();
            return Err("link lost".into());
        }
        if self.fail_write_at == Some(index) {
            return Err("write rejected".into());
        }

        let replies = {
            let mut state = self.peripheral.inner.lock().unwrap();
            state.writes.push(data.to_vec());
            match state.responder.as_mut() {
                Some(respond) => respond(index, data),
                None => Vec::new(),
            }
        };
        for reply in replies {
            self.peripheral.notify(&reply);
        }
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), String> {
        self.peripheral.inner.lock().unwrap().disconnects += 1;
        // the radio reports its own disconnect callback too
        self.peripheral.drop_link();
        Ok(())
    }
}

// ── Recording handlers ────────────────────────────────────────

#[derive(Default)]
pub struct Recorder {
    pub prints: Mutex<Vec<String>>,
    pub data: Mutex<Vec<Vec<u8>>>,
    pub messages: Mutex<Vec<InboundMessage>>,
    pub disconnects: Mutex<u32>,
}

#[allow(dead_code)]
impl Recorder {
    pub fn prints(&self) -> Vec<String> {
        self.prints.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<InboundMessage> {
        self.messages.lock().unwrap().clone()
    }

    pub fn disconnects(&self) -> u32 {
        *self.disconnects.lock().unwrap()
    }
}

impl Handlers for Recorder {
    fn on_print(&self, text: &str) {
        self.prints.lock().unwrap().push(text.to_owned());
    }

    fn on_data(&self, data: &[u8]) {
        self.data.lock().unwrap().push(data.to_vec());
    }

    fn on_message(&self, message: &InboundMessage) {
        self.messages.lock().unwrap().push(message.clone());
    }

    fn on_disconnect(&self) {
        *self.disconnects.lock().unwrap() += 1;
    }
}

/// Device reply to any script write: `print(nil)` output.
#[allow(dead_code)]
pub fn print_nil(_index: usize, data: &[u8]) -> Vec<Vec<u8>> {
    if data.len() > 1 && data[0] != framelink::link::transport::DATA_MARKER {
        vec![b"nil".to_vec()]
    } else {
        Vec::new()
    }
}
