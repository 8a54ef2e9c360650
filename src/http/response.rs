//! Response serialization.
//!
//! # Responsibilities
//! - Emit the status line for the supported status codes
//! - Emit header blocks and raw or chunked body bytes
//! - Enforce status line → headers → body ordering
//!
//! # Design Decisions
//! - The writer does no buffering; each call is one `write_all` on the sink
//! - Chunked framing and trailers are opt-in helpers, plain bodies are
//!   written verbatim

use std::fmt;

use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::headers::Headers;

/// Error type for response writing.
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("unknown status code {0}")]
    UnknownStatusCode(u16),

    #[error("cannot write {attempted} while expecting {expected}")]
    OutOfOrder {
        attempted: &'static str,
        expected: WriterState,
    },

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Status codes this server emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Ok,
    BadRequest,
    InternalServerError,
}

impl StatusCode {
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::InternalServerError => 500,
        }
    }

    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }
}

impl TryFrom<u16> for StatusCode {
    type Error = ResponseError;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        match code {
            200 => Ok(StatusCode::Ok),
            400 => Ok(StatusCode::BadRequest),
            500 => Ok(StatusCode::InternalServerError),
            other => Err(ResponseError::UnknownStatusCode(other)),
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}

/// What the writer accepts next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    StatusLine,
    Headers,
    Body,
    Trailers,
    Done,
}

impl fmt::Display for WriterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WriterState::StatusLine => "status line",
            WriterState::Headers => "headers",
            WriterState::Body => "body",
            WriterState::Trailers => "trailers",
            WriterState::Done => "nothing",
        };
        f.write_str(s)
    }
}

/// Baseline headers: `Content-Length`, `Connection: close` and
/// `Content-Type: text/plain`.
pub fn default_headers(content_len: usize) -> Headers {
    let mut headers = Headers::new();
    headers.set("Content-Length", content_len.to_string());
    headers.set("Connection", "close");
    headers.set("Content-Type", "text/plain");
    headers
}

/// Sequential response emitter over an output sink.
#[derive(Debug)]
pub struct ResponseWriter<W> {
    inner: W,
    state: WriterState,
}

impl<W> ResponseWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            state: WriterState::StatusLine,
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Write `HTTP/1.1 <code> <reason>\r\n`.
    pub async fn write_status_line(&mut self, status: StatusCode) -> Result<(), ResponseError> {
        self.check_state(WriterState::StatusLine, "status line")?;
        let line = format!("HTTP/1.1 {}\r\n", status);
        self.inner.write_all(line.as_bytes()).await?;
        self.state = WriterState::Headers;
        Ok(())
    }

    /// Write every field line followed by the blank line.
    pub async fn write_headers(&mut self, headers: &Headers) -> Result<(), ResponseError> {
        self.check_state(WriterState::Headers, "headers")?;
        self.write_field_block(headers).await?;
        self.state = WriterState::Body;
        Ok(())
    }

    /// Write body bytes verbatim. May be called any number of times.
    pub async fn write_body(&mut self, body: &[u8]) -> Result<usize, ResponseError> {
        self.check_state(WriterState::Body, "body")?;
        self.inner.write_all(body).await?;
        Ok(body.len())
    }

    /// Write one chunk of a `Transfer-Encoding: chunked` body.
    ///
    /// Empty input writes nothing, since a zero-size chunk ends the body.
    pub async fn write_chunked_body(&mut self, chunk: &[u8]) -> Result<usize, ResponseError> {
        self.check_state(WriterState::Body, "body chunk")?;
        if chunk.is_empty() {
            return Ok(0);
        }
        let mut framed = format!("{:x}\r\n", chunk.len()).into_bytes();
        framed.extend_from_slice(chunk);
        framed.extend_from_slice(b"\r\n");
        self.inner.write_all(&framed).await?;
        Ok(chunk.len())
    }

    /// Write the terminating zero-size chunk. Trailers must follow.
    pub async fn write_chunked_body_done(&mut self) -> Result<(), ResponseError> {
        self.check_state(WriterState::Body, "last chunk")?;
        self.inner.write_all(b"0\r\n").await?;
        self.state = WriterState::Trailers;
        Ok(())
    }

    /// Write the trailer section (possibly empty) that ends a chunked body.
    pub async fn write_trailers(&mut self, trailers: &Headers) -> Result<(), ResponseError> {
        self.check_state(WriterState::Trailers, "trailers")?;
        self.write_field_block(trailers).await?;
        self.state = WriterState::Done;
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<(), ResponseError> {
        self.inner.flush().await?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    async fn write_field_block(&mut self, headers: &Headers) -> Result<(), ResponseError> {
        let mut block = headers.to_string();
        block.push_str("\r\n");
        self.inner.write_all(block.as_bytes()).await?;
        Ok(())
    }

    fn check_state(&self, required: WriterState, attempted: &'static str) -> Result<(), ResponseError> {
        if self.state == required {
            Ok(())
        } else {
            Err(ResponseError::OutOfOrder {
                attempted,
                expected: self.state,
            })
        }
    }
}
