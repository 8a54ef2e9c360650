//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     close() → liveness flag cleared → accept loop woken → listener dropped
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → binary calls Server::close
//! ```
//!
//! # Design Decisions
//! - The liveness flag is atomic; the broadcast wakes a pending accept
//! - In-flight connections finish on their own after shutdown

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
