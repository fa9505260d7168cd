//! Connection lifecycle against the mock transport.

use super::mock_transport::{FRAME_ADDRESS, FRAME_NAME, MockTransport, Recorder};
use framelink::link::ReplyState;
use framelink::link::transport::CHAR_RX;
use framelink::{ChannelKind, DeviceSelector, Error, LinkConfig, Session};
use futures_lite::future::{block_on, zip};
use std::time::{Duration, Instant};

const CONNECT: Duration = Duration::from_secs(1);

fn connected(mtu: usize) -> Session<MockTransport, Recorder> {
    let mut session = Session::with_handlers(MockTransport::frame(mtu), Recorder::default());
    block_on(session.connect(&DeviceSelector::any(), CONNECT)).unwrap();
    session
}

// ── Capacities ────────────────────────────────────────────────

#[test]
fn capacities_are_zero_before_connect() {
    let session = Session::new(MockTransport::frame(200));
    assert!(!session.is_connected());
    assert_eq!(session.mtu(), 0);
    assert_eq!(session.max_script_payload(), 0);
    assert_eq!(session.max_binary_payload(), 0);
    assert!(session.info().is_none());
}

#[test]
fn capacities_follow_negotiated_mtu() {
    let session = connected(200);
    assert_eq!(session.max_script_payload(), 197);
    assert_eq!(session.max_binary_payload(), 196);

    let session = connected(23);
    assert_eq!(session.max_script_payload(), 20);
    assert_eq!(session.max_binary_payload(), 19);
}

#[test]
fn tiny_mtu_saturates_to_zero() {
    let session = connected(3);
    assert!(session.is_connected());
    assert_eq!(session.max_script_payload(), 0);
    assert_eq!(session.max_binary_payload(), 0);
}

// ── Connect ───────────────────────────────────────────────────

#[test]
fn connect_reports_device_and_subscribes() {
    let transport = MockTransport::frame(247);
    let peripheral = transport.handle();
    let mut session = Session::new(transport);

    let info = block_on(session.connect(&DeviceSelector::named(FRAME_NAME), CONNECT)).unwrap();
    assert_eq!(info.address, FRAME_ADDRESS);
    assert_eq!(info.name.as_deref(), Some(FRAME_NAME));
    assert_eq!(info.mtu, 247);
    assert_eq!(session.info(), Some(&info));
    assert_eq!(peripheral.subscribed(), vec![CHAR_RX]);
}

#[test]
fn no_matching_device() {
    let mut session = Session::new(MockTransport::empty());
    let err = block_on(session.connect(&DeviceSelector::any(), CONNECT)).unwrap_err();
    assert!(matches!(err, Error::NoDeviceFound));
    assert!(!session.is_connected());

    let mut session = Session::new(MockTransport::frame(100));
    let err = block_on(session.connect(&DeviceSelector::named("Frame 00"), CONNECT)).unwrap_err();
    assert!(matches!(err, Error::NoDeviceFound));
}

#[test]
fn connect_failure_leaves_session_disconnected() {
    let mut transport = MockTransport::frame(100);
    transport.fail_connect = true;
    let mut session = Session::new(transport);

    let err = block_on(session.connect(&DeviceSelector::any(), CONNECT)).unwrap_err();
    assert!(matches!(err, Error::ConnectFailed(ref msg) if msg.contains("refused")));
    assert!(!session.is_connected());
}

#[test]
fn subscribe_failure_tears_link_down() {
    let mut transport = MockTransport::frame(100);
    transport.fail_subscribe = true;
    let peripheral = transport.handle();
    let mut session = Session::with_handlers(transport, Recorder::default());

    let err = block_on(session.connect(&DeviceSelector::any(), CONNECT)).unwrap_err();
    assert!(matches!(err, Error::SubscriptionFailed(_)));
    assert!(!session.is_connected());
    assert_eq!(session.max_script_payload(), 0);
    assert_eq!(peripheral.disconnects(), 1);
    // never reported as connected, so no disconnect callback
    assert_eq!(session.handlers().disconnects(), 0);
}

#[test]
fn connect_configured_uses_device_name() {
    let config = LinkConfig {
        device_name: Some("Frame 00".into()),
        ..LinkConfig::default()
    };
    let mut session = Session::new(MockTransport::frame(100)).with_config(config);
    let err = block_on(session.connect_configured()).unwrap_err();
    assert!(matches!(err, Error::NoDeviceFound));

    let config = LinkConfig {
        device_name: Some(FRAME_NAME.into()),
        ..LinkConfig::default()
    };
    let mut session = Session::new(MockTransport::frame(100)).with_config(config);
    assert!(block_on(session.connect_configured()).is_ok());
}

#[test]
fn connect_replaces_existing_link() {
    let mut session = connected(100);
    let peripheral = session.transport().handle();

    block_on(session.connect(&DeviceSelector::any(), CONNECT)).unwrap();
    assert!(session.is_connected());
    assert_eq!(peripheral.connects(), 2);
    assert_eq!(peripheral.disconnects(), 1);
    assert_eq!(session.handlers().disconnects(), 1);
}

// ── Disconnect ────────────────────────────────────────────────

#[test]
fn disconnect_is_idempotent() {
    let mut session = connected(100);
    block_on(session.disconnect()).unwrap();
    block_on(session.disconnect()).unwrap();

    assert!(!session.is_connected());
    assert_eq!(session.max_binary_payload(), 0);
    assert_eq!(session.handlers().disconnects(), 1);
    assert_eq!(session.transport().handle().disconnects(), 1);
}

#[test]
fn device_side_drop_clears_state() {
    let session = connected(100);
    session.transport().handle().drop_link();

    assert!(!session.is_connected());
    assert!(session.info().is_none());
    assert_eq!(session.handlers().disconnects(), 1);
}

#[test]
fn disconnect_wakes_waiter_before_deadline() {
    let mut session = connected(100);
    let peripheral = session.transport().handle();
    let started = Instant::now();

    let (reply, ()) = block_on(zip(
        session.send_script("print(1)", true, Duration::from_secs(5)),
        async {
            embassy_time::Timer::after_millis(50).await;
            peripheral.drop_link();
        },
    ));

    assert!(matches!(reply, Err(Error::Disconnected)));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(session.reply_state(ChannelKind::Script), ReplyState::Idle);
}

#[test]
fn reconnect_starts_with_idle_correlator() {
    let mut session = connected(100);
    let peripheral = session.transport().handle();

    let (reply, ()) = block_on(zip(
        session.send_data(b"x", true, Duration::from_secs(5)),
        async {
            embassy_time::Timer::after_millis(20).await;
            peripheral.drop_link();
        },
    ));
    assert!(matches!(reply, Err(Error::Disconnected)));

    block_on(session.connect(&DeviceSelector::any(), CONNECT)).unwrap();
    assert_eq!(session.reply_state(ChannelKind::Script), ReplyState::Idle);
    assert_eq!(session.reply_state(ChannelKind::Data), ReplyState::Idle);

    peripheral.respond_with(|_, _| vec![b"fresh".to_vec()]);
    let reply = block_on(session.send_script("print('fresh')", true, CONNECT)).unwrap();
    assert_eq!(reply.as_deref(), Some("fresh"));
}

// ── Raw writes ────────────────────────────────────────────────

#[test]
fn write_requires_connection() {
    let mut session = Session::new(MockTransport::frame(100));
    assert!(matches!(
        block_on(session.write(b"abc")),
        Err(Error::NotConnected)
    ));
}

#[test]
fn write_checks_mtu() {
    let mut session = connected(23);
    let peripheral = session.transport().handle();

    block_on(session.write(&[0u8; 20])).unwrap();
    let err = block_on(session.write(&[0u8; 21])).unwrap_err();
    assert!(matches!(err, Error::PayloadTooLarge { len: 21, max: 20 }));
    assert_eq!(peripheral.writes().len(), 1);
}

#[test]
fn rejected_write_is_a_transport_error() {
    let mut transport = MockTransport::frame(100);
    transport.fail_write_at = Some(0);
    let mut session = Session::new(transport);
    block_on(session.connect(&DeviceSelector::any(), CONNECT)).unwrap();

    let err = block_on(session.write(b"abc")).unwrap_err();
    assert!(matches!(err, Error::Transport(ref msg) if msg.contains("rejected")));
    assert!(session.is_connected());
}

// ── Notification routing ──────────────────────────────────────

#[test]
fn notifications_reach_handlers() {
    let session = connected(100);
    let peripheral = session.transport().handle();

    peripheral.notify(b"hello");
    peripheral.notify(&[0x01, 0xAB]);
    peripheral.notify(&[]);

    let recorder = session.handlers();
    assert_eq!(recorder.prints(), vec!["hello"]);
    assert_eq!(*recorder.data.lock().unwrap(), vec![vec![0xAB]]);
}

#[test]
fn inbound_chunks_reassemble_into_message() {
    let session = connected(100);
    let peripheral = session.transport().handle();

    peripheral.notify(&[0x01, 0x0A, 0x00, 0x05, 1, 2, 3]);
    assert!(session.handlers().messages().is_empty());
    peripheral.notify(&[0x01, 0x0A, 4, 5]);

    let messages = session.handlers().messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].tag, 0x0A);
    assert_eq!(messages[0].declared_len, 5);
    assert_eq!(messages[0].payload, vec![1, 2, 3, 4, 5]);
}
