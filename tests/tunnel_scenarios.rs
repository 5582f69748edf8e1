//! End-to-end handshake and relay tests over real sockets.

use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

mod common;

use common::{
    closed_port, connect_with, read_exact_timeout, read_to_close, start_echo_target, start_server,
    test_config, upgrade_request, SWITCHING,
};

#[tokio::test]
async fn loopback_target_is_tunneled_without_password() {
    let target = start_echo_target().await;
    let running = start_server(test_config()).await;

    let target_str = target.to_string();
    let request = upgrade_request(&[("X-Real-Host", &target_str)]);
    let mut client = connect_with(running.addr, &request).await;

    assert_eq!(read_exact_timeout(&mut client, SWITCHING.len()).await, SWITCHING);

    client.write_all(b"SSH-2.0-test\r\n").await.unwrap();
    assert_eq!(read_exact_timeout(&mut client, 14).await, b"SSH-2.0-test\r\n");

    client.write_all(b"second").await.unwrap();
    assert_eq!(read_exact_timeout(&mut client, 6).await, b"second");

    running.server.close();
}

#[tokio::test]
async fn remote_target_without_password_is_forbidden() {
    let running = start_server(test_config()).await;

    let request = upgrade_request(&[("X-Real-Host", "example.com:9999")]);
    let mut client = connect_with(running.addr, &request).await;

    assert_eq!(read_to_close(&mut client).await, b"HTTP/1.1 403 Forbidden!\r\n\r\n");
    running.server.close();
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let mut config = test_config();
    config.auth.password = "secret".into();
    let running = start_server(config).await;

    let request = upgrade_request(&[("X-Real-Host", "127.0.0.1:22"), ("X-Pass", "wrong")]);
    let mut client = connect_with(running.addr, &request).await;

    assert_eq!(read_to_close(&mut client).await, b"HTTP/1.1 400 WrongPass!\r\n\r\n");
    running.server.close();
}

#[tokio::test]
async fn correct_password_reaches_remote_style_target() {
    let target = start_echo_target().await;
    let mut config = test_config();
    config.auth.password = "secret".into();
    let running = start_server(config).await;

    let target_str = target.to_string();
    let request = upgrade_request(&[("X-Real-Host", &target_str), ("X-Pass", "secret")]);
    let mut client = connect_with(running.addr, &request).await;

    assert_eq!(read_exact_timeout(&mut client, SWITCHING.len()).await, SWITCHING);
    client.write_all(b"ping").await.unwrap();
    assert_eq!(read_exact_timeout(&mut client, 4).await, b"ping");

    running.server.close();
}

#[tokio::test]
async fn split_fragment_is_discarded_before_relay() {
    let target = start_echo_target().await;
    let running = start_server(test_config()).await;

    let target_str = target.to_string();
    let request = upgrade_request(&[("X-Real-Host", &target_str), ("X-Split", "1")]);
    let mut client = connect_with(running.addr, &request).await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    client.write_all(b"GARBAGE").await.unwrap();

    assert_eq!(read_exact_timeout(&mut client, SWITCHING.len()).await, SWITCHING);

    client.write_all(b"after").await.unwrap();
    assert_eq!(read_exact_timeout(&mut client, 5).await, b"after");

    running.server.close();
}

#[tokio::test]
async fn missing_real_host_uses_default_target() {
    let target = start_echo_target().await;
    let mut config = test_config();
    config.target.default_host = target.to_string();
    let running = start_server(config).await;

    let mut client = connect_with(running.addr, &upgrade_request(&[])).await;

    assert_eq!(read_exact_timeout(&mut client, SWITCHING.len()).await, SWITCHING);
    client.write_all(b"hello").await.unwrap();
    assert_eq!(read_exact_timeout(&mut client, 5).await, b"hello");

    running.server.close();
}

#[tokio::test]
async fn dial_failure_closes_silently() {
    let port = closed_port().await;
    let running = start_server(test_config()).await;

    let target = format!("127.0.0.1:{port}");
    let request = upgrade_request(&[("X-Real-Host", &target)]);
    let mut client = connect_with(running.addr, &request).await;

    assert!(read_to_close(&mut client).await.is_empty());
    running.server.close();
}

#[tokio::test]
async fn target_close_ends_tunnel() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let target = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        socket.write_all(b"bye").await.unwrap();
    });

    let running = start_server(test_config()).await;
    let target_str = target.to_string();
    let request = upgrade_request(&[("X-Real-Host", &target_str)]);
    let mut client = connect_with(running.addr, &request).await;

    let received = read_to_close(&mut client).await;
    let mut expected = SWITCHING.to_vec();
    expected.extend_from_slice(b"bye");
    assert_eq!(received, expected);

    common::wait_for_connections(&running.server, 0).await;
    running.server.close();
}

#[tokio::test]
async fn client_disconnect_before_handshake_is_cleaned_up() {
    let running = start_server(test_config()).await;

    let client = tokio::net::TcpStream::connect(running.addr).await.unwrap();
    drop(client);

    common::wait_for_connections(&running.server, 0).await;
    running.server.close();
}

#[tokio::test]
async fn concurrent_tunnels_are_independent() {
    let target = start_echo_target().await;
    let running = start_server(test_config()).await;
    let target_str = target.to_string();

    let mut clients = Vec::new();
    for _ in 0..4 {
        let request = upgrade_request(&[("X-Real-Host", &target_str)]);
        let mut client = connect_with(running.addr, &request).await;
        assert_eq!(read_exact_timeout(&mut client, SWITCHING.len()).await, SWITCHING);
        clients.push(client);
    }
    common::wait_for_connections(&running.server, 4).await;

    for (i, client) in clients.iter_mut().enumerate() {
        let payload = format!("client-{i}");
        client.write_all(payload.as_bytes()).await.unwrap();
        let mut buf = vec![0u8; payload.len()];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, payload.as_bytes());
    }

    running.server.close();
}

#[tokio::test]
async fn empty_host_tunnels_to_local_machine() {
    let target = start_echo_target().await;
    let mut config = test_config();
    config.auth.password = "s".into();
    let running = start_server(config).await;

    let host = format!(":{}", target.port());
    let request = upgrade_request(&[("X-Real-Host", &host), ("X-Pass", "s")]);
    let mut client = connect_with(running.addr, &request).await;

    assert_eq!(read_exact_timeout(&mut client, SWITCHING.len()).await, SWITCHING);
    client.write_all(b"local").await.unwrap();
    assert_eq!(read_exact_timeout(&mut client, 5).await, b"local");

    running.server.close();
}
