//! Integration tests for the gateway session over a mock channel: handshake
//! bytes, request framing, ack mismatch handling and session discipline.

use knxmux_rs::codec::{encode, BusValue, DataType, GroupAddress};
use knxmux_rs::error::{KnxMuxError, ServerError};
use knxmux_rs::session::mock::MockChannel;
use knxmux_rs::session::{GatewayHandle, SessionKind};

const CMD_REGISTER: u8 = b'a';
const CMD_READ: u8 = b'R';
const CMD_WRITE: u8 = b'W';
const CMD_STATUS: u8 = b'S';
const CMD_MONITOR: u8 = b'M';
const CMD_SET_LOG: u8 = b'L';
const CMD_CLOSE_SESSION: u8 = b'c';
const CMD_AUTH: u8 = b'A';
const CMD_EXIT: u8 = b'X';

/// Opens a handle over a fresh mock, consuming the queued handshake ack.
async fn open_session(identifier: &str) -> (GatewayHandle<MockChannel>, MockChannel) {
    let mock = MockChannel::new();
    mock.queue_reply(CMD_REGISTER, 0, &[]);
    let mut handle = GatewayHandle::new(identifier);
    handle.open_with(mock.clone()).await.unwrap();
    mock.tx_buffer.lock().unwrap().clear();
    (handle, mock)
}

#[tokio::test]
async fn test_handshake_wire_format() {
    let mock = MockChannel::new();
    mock.queue_reply(CMD_REGISTER, 0, &[]);

    let mut handle = GatewayHandle::new("webmon");
    handle.open_with(mock.clone()).await.unwrap();
    assert!(handle.is_open());

    let mut expected = vec![CMD_REGISTER, 0x00, 0x06];
    expected.extend_from_slice(b"webmon");
    assert_eq!(mock.get_tx_data(), expected);
}

#[tokio::test]
async fn test_refused_registration_maps_server_code() {
    let mock = MockChannel::new();
    // Error reply: status byte does not echo the command, code 2.
    mock.queue_reply(0x00, 2, &[]);

    let mut handle = GatewayHandle::new("webmon");
    match handle.open_with(mock.clone()).await {
        Err(KnxMuxError::Server(ServerError::NoSocketsAvailable)) => {}
        other => panic!("expected server error, got {other:?}"),
    }
    assert!(!handle.is_open());
}

#[tokio::test]
async fn test_double_open_is_rejected() {
    let (mut handle, _mock) = open_session("webmon").await;
    let second = MockChannel::new();
    assert!(matches!(
        handle.open_with(second).await,
        Err(KnxMuxError::AlreadyConnected)
    ));
}

#[tokio::test]
async fn test_operations_on_closed_handle_perform_no_io() {
    let (mut handle, mock) = open_session("webmon").await;
    mock.queue_reply(CMD_EXIT, 0, &[]);
    handle.close().await.unwrap();

    let io_before = mock.io_count();
    let addr: GroupAddress = "3/2/18".parse().unwrap();

    assert!(matches!(
        handle.read_group(addr).await,
        Err(KnxMuxError::NotConnected)
    ));
    assert!(matches!(
        handle.status().await,
        Err(KnxMuxError::NotConnected)
    ));
    assert!(matches!(
        handle.set_log_level(5).await,
        Err(KnxMuxError::NotConnected)
    ));
    assert!(matches!(
        handle.close().await,
        Err(KnxMuxError::NotConnected)
    ));

    assert_eq!(mock.io_count(), io_before);
}

#[tokio::test]
async fn test_close_wire_format_and_state() {
    let (mut handle, mock) = open_session("webmon").await;
    mock.queue_reply(CMD_EXIT, 0, &[]);
    handle.close().await.unwrap();

    assert!(!handle.is_open());
    assert_eq!(mock.get_tx_data(), vec![CMD_EXIT, 0x00, 0x00]);
    assert_eq!(mock.unread_len(), 0, "close must consume its ack");
}

#[tokio::test]
async fn test_read_group_request_and_body() {
    let (mut handle, mock) = open_session("webmon").await;
    let addr: GroupAddress = "3/2/18".parse().unwrap();
    mock.queue_reply(CMD_READ, 2, &[0x00, 0x01]);

    let payload = handle.read_group(addr).await.unwrap();
    assert_eq!(payload, vec![0x00, 0x01]);

    let raw = addr.raw().to_be_bytes();
    assert_eq!(mock.get_tx_data(), vec![CMD_READ, raw[0], raw[1]]);

    // The payload decodes per the group's datatype tag.
    assert_eq!(
        knxmux_rs::codec::decode(DataType::Switching, &payload).unwrap(),
        BusValue::Integer(1)
    );
}

#[tokio::test]
async fn test_ack_mismatch_never_decodes_a_body() {
    let (mut handle, mock) = open_session("webmon").await;
    let addr: GroupAddress = "1/0/1".parse().unwrap();
    mock.queue_reply(0x00, 5, &[]);

    match handle.read_group(addr).await {
        Err(KnxMuxError::Server(ServerError::Timeout)) => {}
        other => panic!("expected timeout, got {other:?}"),
    }
    // The error code was not misread as a body length.
    assert_eq!(mock.unread_len(), 0);
}

#[tokio::test]
async fn test_write_group_carries_encoded_frame() {
    let (mut handle, mock) = open_session("webmon").await;
    let addr: GroupAddress = "3/2/18".parse().unwrap();
    let frame = encode(DataType::Switching, &BusValue::Integer(1)).unwrap();
    mock.queue_reply(CMD_WRITE, 0, &[]);

    handle.write_group(addr, &frame).await.unwrap();

    let raw = addr.raw().to_be_bytes();
    // command + address + length-prefixed payload
    assert_eq!(
        mock.get_tx_data(),
        vec![CMD_WRITE, raw[0], raw[1], 0x00, 0x01, 0x01]
    );
}

#[tokio::test]
async fn test_authenticate_wire_format() {
    let (mut handle, mock) = open_session("webmon").await;
    mock.queue_reply(CMD_AUTH, 0, &[]);

    handle.authenticate("urs", "secret").await.unwrap();

    let mut expected = vec![CMD_AUTH, 0x00, 0x0b];
    expected.extend_from_slice(b"urs\0secret\0");
    assert_eq!(mock.get_tx_data(), expected);
}

#[tokio::test]
async fn test_management_codes() {
    let (mut handle, mock) = open_session("webmon").await;

    mock.queue_reply(CMD_SET_LOG, 7, &[]);
    assert_eq!(handle.set_log_level(7).await.unwrap(), 7);
    assert_eq!(mock.get_tx_data(), vec![CMD_SET_LOG, 0x00, 0x07]);
    mock.tx_buffer.lock().unwrap().clear();

    mock.queue_reply(CMD_CLOSE_SESSION, 0, &[]);
    handle
        .close_session(SessionKind::SocketClient, 0x01020304)
        .await
        .unwrap();
    assert_eq!(
        mock.get_tx_data(),
        vec![CMD_CLOSE_SESSION, 0x00, 0x02, 0x01, 0x02, 0x03, 0x04]
    );
}

#[tokio::test]
async fn test_monitor_dedicates_the_connection() {
    let (mut handle, mock) = open_session("webmon").await;
    let mask = GroupAddress::from_raw(0x0fff);

    mock.queue_reply(CMD_MONITOR, 3, &[0xbc, 0x12, 0x0d]);
    let first = handle.monitor(mask).await.unwrap();
    assert_eq!(first, vec![0xbc, 0x12, 0x0d]);

    // The command went out exactly once; later calls only read events.
    let raw = mask.raw().to_be_bytes();
    assert_eq!(mock.get_tx_data(), vec![CMD_MONITOR, raw[0], raw[1]]);

    mock.queue_reply(CMD_MONITOR, 1, &[0x2e]);
    let second = handle.monitor(mask).await.unwrap();
    assert_eq!(second, vec![0x2e]);
    assert_eq!(mock.get_tx_data().len(), 3, "no second monitor command");

    // Any other request is refused without touching the wire.
    let io_before = mock.io_count();
    assert!(matches!(
        handle.read_group(mask).await,
        Err(KnxMuxError::WrongUsage)
    ));
    assert_eq!(mock.io_count(), io_before);

    // Closing remains possible.
    mock.queue_reply(CMD_EXIT, 0, &[]);
    handle.close().await.unwrap();
}

#[tokio::test]
async fn test_status_query_through_session() {
    let (mut handle, mock) = open_session("webmon").await;
    let body = minimal_status_body();
    mock.queue_reply(CMD_STATUS, body.len() as u16, &body);

    let snapshot = handle.status().await.unwrap();
    assert_eq!(snapshot.version, 1);
    assert_eq!(snapshot.common.log_level(), 7);
    assert_eq!(mock.unread_len(), 0, "status consumed its whole body");
}

#[tokio::test]
async fn test_version_mismatch_leaves_clean_frame_boundary() {
    let (mut handle, mock) = open_session("webmon").await;
    let mut body = minimal_status_body();
    body[3] = 9; // unsupported common record layout
    mock.queue_reply(CMD_STATUS, body.len() as u16, &body);

    assert!(matches!(
        handle.status().await,
        Err(KnxMuxError::VersionMismatch { record: "common", version: 9 })
    ));
    assert_eq!(mock.unread_len(), 0, "failed status drained its body");

    // The session stays usable for the next command.
    mock.queue_reply(CMD_SET_LOG, 5, &[]);
    assert_eq!(handle.set_log_level(5).await.unwrap(), 5);
}

#[tokio::test]
async fn test_channel_error_surfaces() {
    let (mut handle, mock) = open_session("webmon").await;
    mock.set_next_error(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        "peer went away",
    ));

    let addr: GroupAddress = "0/0/1".parse().unwrap();
    assert!(matches!(
        handle.read_group(addr).await,
        Err(KnxMuxError::ChannelError(_))
    ));
}

/// Minimal outer-version-1 status body with every record at layout 1.
fn minimal_status_body() -> Vec<u8> {
    fn rec(version: u8, fixed: &[u8]) -> Vec<u8> {
        let mut out = ((fixed.len() + 3) as u16).to_be_bytes().to_vec();
        out.push(version);
        out.extend_from_slice(fixed);
        out
    }

    let mut common = vec![1u8, 9, 0, 7];
    common.extend_from_slice(&[0, 0, 0x0e, 0x10]); // uptime 3600
    common.extend_from_slice(&[0x03, 0xe8, 0, 100, 1]); // uid, gid, daemon

    let mut client = vec![1u8];
    client.extend_from_slice(&[0; 20]); // counters
    client.extend_from_slice(&[0, 0, 0, 0]); // queue, missed

    let mut server = vec![1u8, 0x0e, 0x57, 4, 0];
    server.extend_from_slice(&[0; 10]); // received, sent, queue

    let mut socket = vec![1u8, 0, 0x11, 0x26];
    socket.extend_from_slice(b"/tmp/gw\0");
    socket.extend_from_slice(&[8, 0]);
    socket.extend_from_slice(&[0; 12]); // received, sent, queue, table bytes

    let mut body = vec![1u8];
    body.extend(rec(1, &common));
    body.extend(rec(1, &client));
    body.extend(rec(1, &server));
    body.extend(rec(1, &socket));
    body
}
