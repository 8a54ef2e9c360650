//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use tcp_http::config::ServerConfig;
use tcp_http::{Handler, Server};

/// Loopback config on an OS-assigned port.
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.host = IpAddr::V4(Ipv4Addr::LOCALHOST);
    config.listener.port = 0;
    config
}

pub async fn start_server<H: Handler>(handler: H) -> Server {
    start_server_with(test_config(), handler).await
}

pub async fn start_server_with<H: Handler>(config: ServerConfig, handler: H) -> Server {
    Server::start(&config, handler).await.unwrap()
}

/// Write `request` in one go and read until the server closes.
pub async fn send_raw(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    read_to_close(&mut stream).await
}

/// Write `request` in pieces of `size` bytes with a pause between them.
pub async fn send_fragmented(addr: SocketAddr, request: &[u8], size: usize) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.set_nodelay(true).unwrap();
    for piece in request.chunks(size) {
        stream.write_all(piece).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    read_to_close(&mut stream).await
}

pub async fn read_to_close(stream: &mut TcpStream) -> Vec<u8> {
    let mut out = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut out))
        .await
        .expect("server did not close the connection")
        .unwrap();
    out
}

/// A response as it came off the wire.
#[derive(Debug)]
pub struct RawResponse {
    pub status_line: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Split a `Content-Length` framed response into its parts.
pub fn parse_response(raw: &[u8]) -> RawResponse {
    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("response has no header terminator");
    let head = std::str::from_utf8(&raw[..split]).unwrap();
    let mut lines = head.split("\r\n");
    let status_line = lines.next().unwrap().to_string();
    let headers = lines
        .map(|line| {
            let (name, value) = line.split_once(": ").unwrap();
            (name.to_string(), value.to_string())
        })
        .collect();
    RawResponse {
        status_line,
        headers,
        body: raw[split + 4..].to_vec(),
    }
}
