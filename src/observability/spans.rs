//! Span constructors shared by the server and binaries.

use std::net::SocketAddr;

use tracing::Span;

/// Span covering one connection from accept to close.
pub fn connection_span(connection_id: u64, peer_addr: SocketAddr) -> Span {
    tracing::info_span!(
        "connection",
        connection_id,
        peer_addr = %peer_addr,
    )
}
