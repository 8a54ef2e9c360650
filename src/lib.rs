//! HTTP/1.1 framing over raw TCP.
//!
//! An incremental request parser, a sequential response writer and a
//! task-per-connection server that hands each parsed request to a handler.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routes;

pub use config::schema::ServerConfig;
pub use http::{Handler, Request, ResponseWriter, Server, StatusCode};
pub use lifecycle::Shutdown;
pub use routes::DemoRouter;
