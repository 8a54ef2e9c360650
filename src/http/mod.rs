//! HTTP/1.1 framing over raw TCP.
//!
//! # Data Flow
//! ```text
//! Accepted TcpStream
//!     → server.rs (accept loop, one task per connection)
//!     → request.rs (incremental parse: request line, headers, body)
//!     → headers.rs (field-line grammar, case-insensitive map)
//!     → handler.rs (application callback)
//!     → response.rs (status line, headers, body or chunks, trailers)
//!     → Connection closed
//! ```
//!
//! # Design Decisions
//! - The parser never touches a socket; it is fed bytes and reports how many it consumed
//! - One request per connection, the connection closes after the handler returns
//! - The response writer enforces wire order at runtime

pub mod handler;
pub mod headers;
pub mod request;
pub mod response;
pub mod server;

pub use handler::{Handler, HandlerFuture};
pub use headers::{HeaderError, Headers};
pub use request::{
    read_request, Method, ParseError, ParseState, ReadError, Request, RequestLine, RequestParser,
};
pub use response::{default_headers, ResponseError, ResponseWriter, StatusCode, WriterState};
pub use server::{Server, ServerError};

pub(crate) const CRLF: &[u8] = b"\r\n";

/// Offset of the first CRLF in `data`.
pub(crate) fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(CRLF.len()).position(|w| w == CRLF)
}
