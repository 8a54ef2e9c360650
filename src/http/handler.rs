//! The callback boundary between the dispatcher and application code.

use std::future::Future;
use std::pin::Pin;

use tokio::net::TcpStream;

use super::request::Request;
use super::response::{ResponseError, ResponseWriter};

/// Boxed future returned by [`Handler::call`].
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<(), ResponseError>> + Send + 'static>>;

/// Produces the response for one parsed request.
///
/// The handler owns the writer for the rest of the connection; dropping it
/// closes the socket. Implemented for any
/// `Fn(ResponseWriter<TcpStream>, Request) -> impl Future`.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, writer: ResponseWriter<TcpStream>, request: Request) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(ResponseWriter<TcpStream>, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ResponseError>> + Send + 'static,
{
    fn call(&self, writer: ResponseWriter<TcpStream>, request: Request) -> HandlerFuture {
        Box::pin(self(writer, request))
    }
}
