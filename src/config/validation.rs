//! Configuration validation.
//!
//! Semantic checks over an already-deserialized [`RelayConfig`]; serde
//! handles the syntactic layer. All violations are collected and returned
//! together, not just the first.

use std::net::SocketAddr;

use crate::config::schema::RelayConfig;

/// One semantic violation found in a config.
#[derive(Debug)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a config before it is accepted into the system.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError {
            field: "listener.bind_address",
            message: format!("not a valid socket address: {}", config.listener.bind_address),
        });
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError {
            field: "observability.metrics_address",
            message: format!(
                "not a valid socket address: {}",
                config.observability.metrics_address
            ),
        });
    }

    if config.cors.allow_origin.is_empty() {
        errors.push(ValidationError {
            field: "cors.allow_origin",
            message: "must be a concrete origin or `*`".to_string(),
        });
    }

    if config.upstream.max_redirects == 0 {
        errors.push(ValidationError {
            field: "upstream.max_redirects",
            message: "must be at least 1; redirects are followed to completion".to_string(),
        });
    }

    if config.limits.max_body_size == 0 {
        errors.push(ValidationError {
            field: "limits.max_body_size",
            message: "must be non-zero".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
