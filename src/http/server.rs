//! Connection dispatcher.
//!
//! # Responsibilities
//! - Bind the listener and run the accept loop on a background task
//! - Spawn one task per connection: read, parse, hand off to the handler
//! - Reject unparseable requests with a best-effort 400
//! - Contain handler errors and panics to their own connection
//! - Stop accepting promptly when closed

use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::config::{LimitsConfig, ServerConfig};
use crate::http::handler::Handler;
use crate::http::request::{read_request, ReadError};
use crate::http::response::{default_headers, ResponseError, ResponseWriter, StatusCode};
use crate::lifecycle::Shutdown;
use crate::net::{ConnectionPermit, Listener, ListenerError, ReadBuffer};
use crate::observability::{metrics, spans};

/// How long a rejected connection keeps reading leftover request bytes.
/// Closing with unread input resets the socket and can destroy the 400.
const REJECT_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Error type for starting the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("failed to read local address: {0}")]
    LocalAddr(std::io::Error),
}

/// Handle to a running server.
///
/// Dropping the handle closes the server.
pub struct Server {
    local_addr: SocketAddr,
    shutdown: Shutdown,
    connections: Arc<Connections>,
    accept_task: Option<JoinHandle<()>>,
}

impl Server {
    /// Bind the listener and start accepting connections in the background.
    pub async fn start<H: Handler>(config: &ServerConfig, handler: H) -> Result<Self, ServerError> {
        let listener = Listener::bind(&config.listener).await?;
        let local_addr = listener.local_addr().map_err(ServerError::LocalAddr)?;

        let shutdown = Shutdown::new();
        let connections = Arc::new(Connections::default());
        let dispatcher = Arc::new(Dispatcher {
            handler,
            limits: config.limits.clone(),
            connections: Arc::clone(&connections),
        });

        let accept_task = tokio::spawn(accept_loop(
            listener,
            dispatcher,
            shutdown.clone(),
            shutdown.subscribe(),
        ));

        tracing::info!(address = %local_addr, "HTTP server started");

        Ok(Self {
            local_addr,
            shutdown,
            connections,
            accept_task: Some(accept_task),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// False once [`close`](Self::close) was called or the accept loop stopped.
    pub fn is_running(&self) -> bool {
        !self.shutdown.is_triggered()
    }

    /// Connections whose handler has not finished yet.
    pub fn active_connections(&self) -> u64 {
        self.connections.active()
    }

    /// Stop accepting connections.
    ///
    /// Wakes the accept loop immediately; connections already dispatched run
    /// to completion.
    pub fn close(&self) {
        if self.shutdown.trigger() {
            tracing::info!(address = %self.local_addr, "HTTP server closing");
        }
    }

    /// Wait for the accept loop to exit. The listener is closed afterwards.
    pub async fn wait(&mut self) {
        if let Some(task) = self.accept_task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Accept loop terminated abnormally");
            }
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.close();
    }
}

async fn accept_loop<H: Handler>(
    listener: Listener,
    dispatcher: Arc<Dispatcher<H>>,
    shutdown: Shutdown,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        if shutdown.is_triggered() {
            break;
        }

        let accepted = tokio::select! {
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => accepted,
        };

        // A connection that raced with close() is dropped unanswered.
        if shutdown.is_triggered() {
            break;
        }

        match accepted {
            Ok((stream, peer_addr, permit)) => {
                metrics::record_connection_accepted();
                let dispatcher = Arc::clone(&dispatcher);
                tokio::spawn(async move {
                    dispatcher.serve(stream, peer_addr, permit).await;
                });
            }
            Err(e) if e.is_transient() => {
                tracing::warn!(error = %e, "Transient accept error");
            }
            Err(e) => {
                tracing::error!(error = %e, "Accept failed, no longer accepting connections");
                break;
            }
        }
    }

    shutdown.trigger();
    tracing::info!("Accept loop stopped");
}

/// Connection IDs and the count of connections still being served.
#[derive(Debug, Default)]
struct Connections {
    last_id: AtomicU64,
    active: AtomicU64,
}

impl Connections {
    fn open(self: &Arc<Self>) -> OpenConnection {
        let id = self.last_id.fetch_add(1, Ordering::Relaxed) + 1;
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::record_active_connections(active);
        OpenConnection {
            id,
            connections: Arc::clone(self),
        }
    }

    fn active(&self) -> u64 {
        self.active.load(Ordering::SeqCst)
    }
}

/// Counts as active until dropped, including when the handler panics.
struct OpenConnection {
    id: u64,
    connections: Arc<Connections>,
}

impl Drop for OpenConnection {
    fn drop(&mut self) {
        let active = self.connections.active.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::record_active_connections(active);
        tracing::trace!(connection_id = self.id, "Connection closed");
    }
}

/// State shared by every connection task.
struct Dispatcher<H> {
    handler: H,
    limits: LimitsConfig,
    connections: Arc<Connections>,
}

impl<H: Handler> Dispatcher<H> {
    async fn serve(&self, stream: TcpStream, peer_addr: SocketAddr, _permit: ConnectionPermit) {
        let connection = self.connections.open();
        let span = spans::connection_span(connection.id, peer_addr);
        self.handle_connection(stream).instrument(span).await;
    }

    async fn handle_connection(&self, mut stream: TcpStream) {
        let mut buffer = ReadBuffer::new(self.limits.initial_buffer_size, self.limits.max_buffer_size);

        let request = match read_request(&mut stream, &mut buffer, self.limits.max_body_size).await {
            Ok(request) => request,
            Err(e) => {
                metrics::record_read_error(e.kind());
                if e.is_client_error() {
                    tracing::warn!(error = %e, "Rejecting malformed request");
                    if let Err(e) = reject(stream, &e).await {
                        tracing::debug!(error = %e, "Failed to send 400 response");
                    }
                } else {
                    tracing::debug!(error = %e, "Connection dropped before request completed");
                }
                return;
            }
        };

        tracing::debug!(
            method = %request.method(),
            request_target = %request.target(),
            body_len = request.body().len(),
            "Request parsed"
        );
        metrics::record_request(request.method().as_str());

        let writer = ResponseWriter::new(stream);
        let outcome = AssertUnwindSafe(async { self.handler.call(writer, request).await })
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(())) => tracing::trace!("Handler finished"),
            Ok(Err(e)) => {
                metrics::record_handler_failure("error");
                tracing::warn!(error = %e, "Handler failed");
            }
            Err(_) => {
                metrics::record_handler_failure("panic");
                tracing::error!("Handler panicked, connection aborted");
            }
        }
    }
}

/// Best-effort `400 Bad Request` for a request that could not be read.
///
/// The write half is shut down first so the client sees the response end,
/// then unread request bytes are drained until the client closes or
/// [`REJECT_DRAIN_TIMEOUT`] passes.
async fn reject(stream: TcpStream, error: &ReadError) -> Result<(), ResponseError> {
    let body = format!("{}\n", error);
    let mut writer = ResponseWriter::new(stream);
    writer.write_status_line(StatusCode::BadRequest).await?;
    writer.write_headers(&default_headers(body.len())).await?;
    writer.write_body(body.as_bytes()).await?;
    writer.flush().await?;

    let mut stream = writer.into_inner();
    stream.shutdown().await?;
    let drained = tokio::time::timeout(REJECT_DRAIN_TIMEOUT, async {
        let mut scratch = [0u8; 1024];
        let mut total = 0usize;
        loop {
            match stream.read(&mut scratch).await {
                Ok(0) | Err(_) => break total,
                Ok(n) => total += n,
            }
        }
    })
    .await;
    tracing::trace!(drained = ?drained.ok(), "Rejected connection drained");
    Ok(())
}
