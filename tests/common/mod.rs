//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use wssh_tunnel::config::TunnelConfig;
use wssh_tunnel::net::Listener;
use wssh_tunnel::TunnelServer;

pub const SWITCHING: &[u8] =
    b"HTTP/1.1 101 Switching Protocol\r\nContent-Length: 1048576000000\r\n\r\n";

/// Start a target that echoes everything back on each accepted connection.
pub async fn start_echo_target() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = vec![0u8; 4096];
                loop {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            if socket.write_all(&buf[..n]).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        }
    });

    addr
}

/// A port that nothing listens on.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

/// Loopback config on an ephemeral port.
pub fn test_config() -> TunnelConfig {
    let mut config = TunnelConfig::default();
    config.listener.bind_address = "127.0.0.1".into();
    config.listener.port = 0;
    config
}

pub struct RunningServer {
    pub addr: SocketAddr,
    pub server: Arc<TunnelServer>,
    pub task: JoinHandle<()>,
}

/// Bind and serve `config` in the background.
pub async fn start_server(config: TunnelConfig) -> RunningServer {
    let server = Arc::new(TunnelServer::new(config).unwrap());
    let listener = Listener::bind(&server.config().listener).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let task = {
        let server = Arc::clone(&server);
        tokio::spawn(async move { server.serve(listener).await })
    };

    // Registration opens at the start of serve().
    for _ in 0..100 {
        if server.is_running() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    RunningServer { addr, server, task }
}

/// Upgrade request carrying the given header lines.
pub fn upgrade_request(headers: &[(&str, &str)]) -> Vec<u8> {
    let mut request = String::from("GET / HTTP/1.1\r\nHost: tunnel\r\nUpgrade: websocket\r\n");
    for (name, value) in headers {
        request.push_str(&format!("{name}: {value}\r\n"));
    }
    request.push_str("\r\n");
    request.into_bytes()
}

/// Connect and send the handshake in a single write.
pub async fn connect_with(addr: SocketAddr, request: &[u8]) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    stream
}

/// Read exactly `len` bytes or fail after a few seconds.
pub async fn read_exact_timeout(stream: &mut TcpStream, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    tokio::time::timeout(Duration::from_secs(5), stream.read_exact(&mut buf))
        .await
        .expect("timed out reading from tunnel")
        .unwrap();
    buf
}

/// Read until the peer closes and return everything received.
pub async fn read_to_close(stream: &mut TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    let _ = tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut buf))
        .await
        .expect("peer did not close");
    buf
}

/// Wait until the server reports `count` registered connections.
pub async fn wait_for_connections(server: &TunnelServer, count: usize) {
    for _ in 0..200 {
        if server.active_connections() == count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "expected {count} connections, found {}",
        server.active_connections()
    );
}
