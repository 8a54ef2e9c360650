//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept, connection limits)
//!     → buffer.rs (bounded read buffer for the request parser)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - Bounded accept via semaphore prevents resource exhaustion
//! - The read buffer grows on demand up to a hard limit

pub mod buffer;
pub mod listener;

pub use buffer::{CapacityExceeded, ReadBuffer};
pub use listener::{ConnectionPermit, Listener, ListenerError};
