//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Cross-origin settings for the connector client.
    pub cors: CorsConfig,

    /// Upstream target policy and redirect handling.
    pub upstream: UpstreamConfig,

    /// Browser-profile headers injected when the caller omits them.
    pub browser: BrowserProfileConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8787").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8787".to_string(),
        }
    }
}

/// Cross-origin settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Origin allowed to call the relay; `*` allows any origin.
    pub allow_origin: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: "*".to_string(),
        }
    }
}

/// Upstream target policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Accept plaintext `http` targets in addition to `https`.
    ///
    /// Off by default; the relay is https-only. Intended for test rigs
    /// and private deployments fronting plaintext backends.
    pub allow_insecure_http: bool,

    /// Maximum redirect hops followed per call.
    pub max_redirects: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            allow_insecure_http: false,
            max_redirects: 10,
        }
    }
}

/// Headers injected when the caller does not supply them. Origins often
/// degrade or reject responses (405/412) for generic user agents.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BrowserProfileConfig {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
}

impl Default for BrowserProfileConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36"
                .to_string(),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,\
                     image/webp,*/*;q=0.8"
                .to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total per-request timeout in seconds, applied to both the inbound
    /// call and the upstream client. `None` (the default) leaves both
    /// permissive, matching the observed behavior of the deployed relay.
    pub request_secs: Option<u64>,
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum inbound body size in bytes.
    pub max_body_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
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
