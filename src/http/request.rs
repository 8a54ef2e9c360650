//! Incremental request parsing.
//!
//! # Responsibilities
//! - Recognise the request line (`<METHOD> <target> HTTP/1.1`)
//! - Drive header parsing until the blank line
//! - Collect a length-delimited body
//! - Run the read loop that feeds socket bytes through the parser
//!
//! # State Machine
//! ```text
//! Init ──request line──▶ ParsingHeaders ──blank line──┬──▶ ParsingBody ──body──▶ Done
//!                                                     └──(no Content-Length)──▶ Done
//! any state ──malformed input──▶ Error
//! ```

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::find_crlf;
use super::headers::{HeaderError, Headers};
use crate::net::buffer::{CapacityExceeded, ReadBuffer};

/// Upper bound on the body capacity reserved up front from `Content-Length`.
const BODY_PREALLOC_LIMIT: usize = 64 * 1024;

/// Error produced by [`RequestParser::feed`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed request line")]
    BadRequestLine,

    #[error("unsupported HTTP version {0:?}")]
    UnsupportedVersion(String),

    #[error("invalid header: {0}")]
    Header(#[from] HeaderError),

    #[error("invalid Content-Length {0:?}")]
    InvalidContentLength(String),

    #[error("body of {length} bytes exceeds the {limit}-byte limit")]
    BodyTooLarge { length: usize, limit: usize },

    #[error("parser already failed")]
    AlreadyFailed,

    #[error("request is not complete")]
    Incomplete,
}

/// Error produced while reading a request off a connection.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    CapacityExceeded(#[from] CapacityExceeded),

    #[error("connection closed before the request was complete")]
    UnexpectedEof,
}

impl ReadError {
    /// True when the client sent something we refuse, as opposed to the
    /// transport failing underneath us.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ReadError::Parse(_) | ReadError::CapacityExceeded(_))
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ReadError::Io(_) => "io",
            ReadError::Parse(ParseError::UnsupportedVersion(_)) => "unsupported_version",
            ReadError::Parse(ParseError::BodyTooLarge { .. }) => "body_too_large",
            ReadError::Parse(_) => "syntax",
            ReadError::CapacityExceeded(_) => "capacity",
            ReadError::UnexpectedEof => "eof",
        }
    }
}

/// Supported request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl FromStr for Method {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            _ => Err(ParseError::BadRequestLine),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The first line of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    method: Method,
    target: String,
    http_version: String,
}

impl RequestLine {
    pub fn method(&self) -> Method {
        self.method
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Version without the `HTTP/` prefix, always `"1.1"`.
    pub fn http_version(&self) -> &str {
        &self.http_version
    }
}

/// A fully parsed request, handed to the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    request_line: RequestLine,
    headers: Headers,
    body: Vec<u8>,
}

impl Request {
    pub fn request_line(&self) -> &RequestLine {
        &self.request_line
    }

    pub fn method(&self) -> Method {
        self.request_line.method
    }

    pub fn target(&self) -> &str {
        &self.request_line.target
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Parse progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    Init,
    ParsingHeaders,
    ParsingBody { content_length: usize },
    Done,
    Error,
}

/// Incremental request parser.
///
/// Bytes are offered through [`feed`](Self::feed); the caller keeps whatever
/// was not consumed and offers it again with more data appended.
#[derive(Debug)]
pub struct RequestParser {
    state: ParseState,
    request_line: Option<RequestLine>,
    headers: Headers,
    body: Vec<u8>,
    max_body_size: usize,
}

impl RequestParser {
    pub fn new() -> Self {
        Self::with_max_body_size(usize::MAX)
    }

    /// Parser that rejects a declared `Content-Length` above `limit`.
    pub fn with_max_body_size(limit: usize) -> Self {
        Self {
            state: ParseState::Init,
            request_line: None,
            headers: Headers::new(),
            body: Vec::new(),
            max_body_size: limit,
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == ParseState::Done
    }

    /// Headers parsed so far.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Consume as many complete units from `data` as possible.
    ///
    /// Returns `Ok(0)` when more bytes are needed. After an error every call
    /// fails with [`ParseError::AlreadyFailed`]; after completion every call
    /// returns `Ok(0)`.
    pub fn feed(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        if self.state == ParseState::Error {
            return Err(ParseError::AlreadyFailed);
        }

        let mut read = 0;
        while !self.is_done() && read < data.len() {
            let n = match self.step(&data[read..]) {
                Ok(n) => n,
                Err(e) => {
                    self.state = ParseState::Error;
                    return Err(e);
                }
            };
            if n == 0 {
                break;
            }
            read += n;
        }
        Ok(read)
    }

    /// Take the finished request.
    pub fn finish(self) -> Result<Request, ParseError> {
        match (self.state, self.request_line) {
            (ParseState::Done, Some(request_line)) => Ok(Request {
                request_line,
                headers: self.headers,
                body: self.body,
            }),
            (ParseState::Error, _) => Err(ParseError::AlreadyFailed),
            _ => Err(ParseError::Incomplete),
        }
    }

    fn step(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        match self.state {
            ParseState::Init => {
                let Some((request_line, n)) = parse_request_line(data)? else {
                    return Ok(0);
                };
                self.request_line = Some(request_line);
                self.state = ParseState::ParsingHeaders;
                Ok(n)
            }
            ParseState::ParsingHeaders => {
                let (n, done) = self.headers.parse(data)?;
                if done {
                    self.state = match content_length(&self.headers)? {
                        Some(length) if length > self.max_body_size => {
                            return Err(ParseError::BodyTooLarge {
                                length,
                                limit: self.max_body_size,
                            });
                        }
                        Some(content_length) if content_length > 0 => {
                            self.body.reserve(content_length.min(BODY_PREALLOC_LIMIT));
                            ParseState::ParsingBody { content_length }
                        }
                        _ => ParseState::Done,
                    };
                }
                Ok(n)
            }
            ParseState::ParsingBody { content_length } => {
                let n = (content_length - self.body.len()).min(data.len());
                self.body.extend_from_slice(&data[..n]);
                if self.body.len() == content_length {
                    self.state = ParseState::Done;
                }
                Ok(n)
            }
            ParseState::Done | ParseState::Error => Ok(0),
        }
    }
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_request_line(data: &[u8]) -> Result<Option<(RequestLine, usize)>, ParseError> {
    let Some(idx) = find_crlf(data) else {
        return Ok(None);
    };
    let line = std::str::from_utf8(&data[..idx]).map_err(|_| ParseError::BadRequestLine)?;

    let parts: Vec<&str> = line.split(' ').collect();
    let [method, target, version] = parts.as_slice() else {
        return Err(ParseError::BadRequestLine);
    };
    let method: Method = method.parse()?;

    let version = match version.split_once('/') {
        Some(("HTTP", v)) if !v.contains('/') => v,
        _ => return Err(ParseError::BadRequestLine),
    };
    if version != "1.1" {
        return Err(ParseError::UnsupportedVersion(version.to_string()));
    }

    let request_line = RequestLine {
        method,
        target: target.to_string(),
        http_version: version.to_string(),
    };
    Ok(Some((request_line, idx + 2)))
}

/// `Content-Length = 1*DIGIT`; signs and embedded spaces are rejected.
fn content_length(headers: &Headers) -> Result<Option<usize>, ParseError> {
    let Some(value) = headers.get("content-length") else {
        return Ok(None);
    };
    let invalid = || ParseError::InvalidContentLength(value.to_string());
    let digits = value.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    digits.parse::<usize>().map(Some).map_err(|_| invalid())
}

/// Read one request from `reader`.
///
/// Socket bytes are appended to `buffer`, fed to a fresh parser, and the
/// consumed prefix is dropped before the next read. Body bytes move into the
/// request as they arrive, so only the request line and each field line must
/// fit in the buffer. Fails with [`ReadError::CapacityExceeded`] when the
/// buffer has reached its limit without the parser recognising a complete
/// unit.
pub async fn read_request<R>(
    reader: &mut R,
    buffer: &mut ReadBuffer,
    max_body_size: usize,
) -> Result<Request, ReadError>
where
    R: AsyncRead + Unpin,
{
    let mut parser = RequestParser::with_max_body_size(max_body_size);
    loop {
        let spare = buffer.spare_mut()?;
        let n = reader.read(spare).await?;
        if n == 0 {
            return Err(ReadError::UnexpectedEof);
        }
        buffer.advance(n);

        let consumed = parser.feed(buffer.filled())?;
        buffer.consume(consumed);

        if parser.is_done() {
            return Ok(parser.finish()?);
        }
    }
}
