//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (host, port, connection limit).
    pub listener: ListenerConfig,

    /// Per-connection read buffer limits.
    pub limits: LimitsConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Settings for the demo routes.
    pub routes: RoutesConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind; all interfaces by default.
    pub host: IpAddr,

    /// TCP port. `0` asks the OS for a free port.
    pub port: u16,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 42069,
            max_connections: 10_000,
        }
    }
}

/// Per-request size limits.
///
/// A request line or field line that does not fit in `max_buffer_size`
/// bytes is rejected. Bodies stream through the buffer and are bounded
/// separately by `max_body_size`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub initial_buffer_size: usize,
    pub max_buffer_size: usize,

    /// Largest accepted `Content-Length`.
    pub max_body_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            initial_buffer_size: 1024,
            max_buffer_size: 64 * 1024,
            max_body_size: 10 * 1024 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Demo route configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutesConfig {
    /// Directory holding `nature.mp4` for `/video`.
    pub assets_dir: PathBuf,

    /// Upstream base URL for `/httpbin/*`.
    pub upstream_url: String,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("./assets"),
            upstream_url: "https://httpbin.org".to_string(),
        }
    }
}
