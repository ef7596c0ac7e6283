//! Relay request/result types and error definitions.

use std::time::Duration;

use axum::http::header::HeaderMap;
use axum::http::{Method, StatusCode};
use serde::Deserialize;
use thiserror::Error;

use crate::policy::DecodeError;

/// Errors that can occur while relaying a request.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Target was missing, unparsable, or used a disallowed scheme.
    #[error("invalid target: only absolute https URLs are allowed")]
    InvalidTarget(String),

    /// Method outside the supported {GET, HEAD, POST} set.
    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),

    /// Caller-supplied header map contained an invalid name or value.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// Malformed base64url body or parameter.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Batch shape violation: empty or oversized request list.
    #[error("batch must contain between 1 and {max} entries, got {got}")]
    BatchSize { got: usize, max: usize },

    /// DNS, TLS, connection or body-read failure talking to the target.
    #[error("upstream request failed: {0}")]
    Upstream(String),
}

impl RelayError {
    /// HTTP status for single-shot endpoints.
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::UnsupportedMethod(_) => StatusCode::METHOD_NOT_ALLOWED,
            RelayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Machine-stable reason code, used as `statusText` in batch results.
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::Upstream(_) => "FETCH_ERROR",
            RelayError::Decode(_) => "DECODE_ERROR",
            _ => "VALIDATION_ERROR",
        }
    }
}

/// How the caller wants the response body represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum ResponseMode {
    /// Forward the upstream byte stream untouched (single-shot paths).
    #[serde(skip)]
    Stream,
    /// Materialize into raw bytes, returned base64url-encoded in JSON.
    #[default]
    #[serde(rename = "arrayBuffer")]
    ArrayBuffer,
    /// Materialize into UTF-8 text.
    #[serde(rename = "text")]
    Text,
    /// Materialize and parse as JSON.
    #[serde(rename = "json")]
    Json,
    /// Discard the body.
    #[serde(rename = "none")]
    None,
}

/// One relay call, constructed per request and discarded after it.
#[derive(Debug)]
pub struct RelayRequest {
    /// Absolute target URL (scheme checked against the target policy).
    pub target: String,
    /// Requested method; must be GET, HEAD or POST.
    pub method: String,
    /// Caller-supplied headers, filtered before dispatch.
    pub headers: HeaderMap,
    /// Optional url-safe base64 body; only honored for POST.
    pub body_b64: Option<String>,
    /// Body representation to produce.
    pub response_mode: ResponseMode,
}

impl RelayRequest {
    /// A plain GET with no extra headers, streaming the response.
    pub fn get(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            method: Method::GET.to_string(),
            headers: HeaderMap::new(),
            body_b64: None,
            response_mode: ResponseMode::Stream,
        }
    }
}

/// Response body in either streamed or materialized form.
pub enum RelayBody {
    /// Upstream response with an unread body; bytes flow through untouched.
    Stream(reqwest::Response),
    /// Fully materialized bytes.
    Bytes(Vec<u8>),
    /// Fully materialized UTF-8 text.
    Text(String),
    /// Parsed JSON document.
    Json(serde_json::Value),
    /// No body (discarded or never present).
    Empty,
}

impl std::fmt::Debug for RelayBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelayBody::Stream(_) => f.write_str("Stream(..)"),
            RelayBody::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            RelayBody::Text(t) => write!(f, "Text({} chars)", t.len()),
            RelayBody::Json(_) => f.write_str("Json(..)"),
            RelayBody::Empty => f.write_str("Empty"),
        }
    }
}

/// Outcome of one relay call.
#[derive(Debug)]
pub struct RelayResult {
    /// Upstream status code.
    pub status: u16,
    /// Canonical status text for the code, empty when unknown.
    pub status_text: String,
    /// Response headers after the inbound allowlist filter.
    pub headers: HeaderMap,
    /// Response body per the requested mode.
    pub body: RelayBody,
    /// URL of the final response after redirects.
    pub final_url: String,
    /// Whether any redirect was followed.
    pub redirected: bool,
    /// Wall-clock time for the outbound call.
    pub duration: Duration,
}

/// Parse and validate a relay method string (case-insensitive).
pub fn parse_method(raw: &str) -> Result<Method, RelayError> {
    match raw.to_ascii_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "HEAD" => Ok(Method::HEAD),
        "POST" => Ok(Method::POST),
        other => Err(RelayError::UnsupportedMethod(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_method() {
        assert_eq!(parse_method("GET").unwrap(), Method::GET);
        assert_eq!(parse_method("get").unwrap(), Method::GET);
        assert_eq!(parse_method("Head").unwrap(), Method::HEAD);
        assert_eq!(parse_method("POST").unwrap(), Method::POST);
        assert!(matches!(
            parse_method("DELETE"),
            Err(RelayError::UnsupportedMethod(_))
        ));
        assert!(parse_method("PUT").is_err());
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            RelayError::InvalidTarget("ftp://x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RelayError::UnsupportedMethod("PUT".into()).status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            RelayError::Upstream("refused".into()).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(RelayError::Upstream("x".into()).code(), "FETCH_ERROR");
        assert_eq!(
            RelayError::InvalidTarget("x".into()).code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            RelayError::BatchSize { got: 17, max: 16 }.code(),
            "VALIDATION_ERROR"
        );
    }

    #[test]
    fn test_response_mode_wire_names() {
        let mode: ResponseMode = serde_json::from_str("\"arrayBuffer\"").unwrap();
        assert_eq!(mode, ResponseMode::ArrayBuffer);
        let mode: ResponseMode = serde_json::from_str("\"none\"").unwrap();
        assert_eq!(mode, ResponseMode::None);
        assert!(serde_json::from_str::<ResponseMode>("\"stream\"").is_err());
    }
}
