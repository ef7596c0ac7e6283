//! Endpoint handlers: /p, /fetch, /dispatch, /health.
//!
//! Handlers own the wire envelopes (query parameters and JSON schemas
//! with explicit defaults), validate them before any side effect, and
//! shape relay results back into streamed or JSON responses.

use std::collections::{BTreeMap, HashMap};

use axum::{
    body::{Body, Bytes},
    extract::{Query, State},
    http::{
        header::{HeaderMap, HeaderName, HeaderValue, RANGE},
        Method, StatusCode,
    },
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::http::server::AppState;
use crate::policy;
use crate::relay::batch::{self, BatchEntry, ExecutionMode};
use crate::relay::types::{RelayBody, RelayError, RelayRequest, RelayResult, ResponseMode};

fn default_method() -> String {
    "GET".to_string()
}

/// Query parameters for `GET|HEAD /p`.
#[derive(Debug, Deserialize)]
pub struct ProxyParams {
    pub sid: Option<String>,
    /// url-safe base64 of an absolute https URL.
    pub u: Option<String>,
}

/// `GET|HEAD /p`: streamed media/document passthrough.
///
/// The incoming `Range` header is the only caller header forwarded;
/// everything else about the outbound request is relay-owned.
pub async fn proxy_media(
    State(state): State<AppState>,
    Query(params): Query<ProxyParams>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    let Some(encoded) = params.u else {
        return (StatusCode::BAD_REQUEST, "missing u parameter").into_response();
    };
    let target = match policy::decode_base64url_text(&encoded) {
        Ok(target) => target,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, format!("invalid u parameter: {e}")).into_response()
        }
    };

    let mut relay_headers = HeaderMap::new();
    if let Some(range) = headers.get(RANGE) {
        relay_headers.insert(RANGE, range.clone());
    }

    let request = RelayRequest {
        target,
        method: method.to_string(),
        headers: relay_headers,
        body_b64: None,
        response_mode: ResponseMode::Stream,
    };

    match state.relay.relay(params.sid.as_deref(), request).await {
        Ok(result) => relay_response(result),
        Err(err) => error_response(err),
    }
}

/// JSON envelope for `POST /fetch`.
#[derive(Debug, Deserialize)]
pub struct FetchEnvelope {
    pub sid: Option<String>,
    pub target: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(rename = "bodyB64")]
    pub body_b64: Option<String>,
}

/// `POST /fetch`: single-shot relay with caller-shaped headers and an
/// optional base64url body; the response streams through.
pub async fn fetch(State(state): State<AppState>, body: Bytes) -> Response {
    let envelope: FetchEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, format!("invalid JSON body: {e}")).into_response()
        }
    };
    let headers = match build_header_map(&envelope.headers) {
        Ok(headers) => headers,
        Err(err) => return error_response(err),
    };

    let request = RelayRequest {
        target: envelope.target,
        method: envelope.method,
        headers,
        body_b64: envelope.body_b64,
        response_mode: ResponseMode::Stream,
    };

    match state.relay.relay(envelope.sid.as_deref(), request).await {
        Ok(result) => relay_response(result),
        Err(err) => error_response(err),
    }
}

/// JSON envelope for `POST /dispatch`.
#[derive(Debug, Deserialize)]
pub struct DispatchEnvelope {
    pub sid: Option<String>,
    #[serde(default)]
    pub pipeline: ExecutionMode,
    #[serde(default)]
    pub requests: Vec<DispatchEntrySpec>,
}

/// One entry inside a dispatch envelope.
#[derive(Debug, Deserialize)]
pub struct DispatchEntrySpec {
    pub id: Option<String>,
    pub target: Option<String>,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(rename = "bodyB64")]
    pub body_b64: Option<String>,
    #[serde(rename = "responseType", default)]
    pub response_type: ResponseMode,
}

/// Wire shape of one dispatch result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DispatchResult {
    id: String,
    ok: bool,
    status: u16,
    status_text: String,
    headers: BTreeMap<String, String>,
    final_url: String,
    redirected: bool,
    duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<serde_json::Value>,
}

/// Wire shape of the dispatch response envelope.
#[derive(Debug, Serialize)]
struct DispatchResponse {
    sid: Option<String>,
    pipeline: ExecutionMode,
    count: usize,
    results: Vec<DispatchResult>,
}

/// `POST /dispatch`: batch relay. Always 200 with a JSON envelope unless
/// the envelope itself is malformed; per-entry failures live inside
/// `results[i]`.
pub async fn dispatch(State(state): State<AppState>, body: Bytes) -> Response {
    let envelope: DispatchEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("invalid JSON envelope: {e}") })),
            )
                .into_response()
        }
    };

    let entries: Vec<BatchEntry> = envelope
        .requests
        .into_iter()
        .enumerate()
        .map(|(index, entry)| BatchEntry {
            id: entry.id.clone().unwrap_or_else(|| index.to_string()),
            request: build_entry_request(entry),
        })
        .collect();

    let outcome = match batch::dispatch(
        state.relay.as_ref(),
        envelope.sid.as_deref(),
        entries,
        envelope.pipeline,
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(err) => {
            return (err.status(), Json(json!({ "error": err.to_string() }))).into_response()
        }
    };

    let combined = outcome.set_cookies.join(",");
    let results: Vec<DispatchResult> = outcome.results.into_iter().map(wire_result).collect();
    let response_body = DispatchResponse {
        sid: envelope.sid,
        pipeline: envelope.pipeline,
        count: results.len(),
        results,
    };

    let mut response = Json(response_body).into_response();
    if !combined.is_empty() {
        if let Ok(value) = HeaderValue::from_str(&combined) {
            response
                .headers_mut()
                .insert(HeaderName::from_static(policy::X_SET_COOKIE), value);
        }
    }
    response
}

/// Liveness probe.
#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
}

pub async fn health() -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
    })
}

/// Shape a dispatch entry into a relay request; failures become that
/// entry's result without touching its siblings.
fn build_entry_request(entry: DispatchEntrySpec) -> Result<RelayRequest, RelayError> {
    let target = entry
        .target
        .ok_or_else(|| RelayError::InvalidTarget(String::new()))?;
    let headers = build_header_map(&entry.headers)?;
    Ok(RelayRequest {
        target,
        method: entry.method,
        headers,
        body_b64: entry.body_b64,
        response_mode: entry.response_type,
    })
}

/// Convert a caller-supplied header object into a typed header map.
fn build_header_map(raw: &HashMap<String, String>) -> Result<HeaderMap, RelayError> {
    let mut headers = HeaderMap::with_capacity(raw.len());
    for (name, value) in raw {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| RelayError::InvalidHeader(name.clone()))?;
        let value =
            HeaderValue::from_str(value).map_err(|_| RelayError::InvalidHeader(name.to_string()))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// Forward a relay result to the caller, streaming when the body is a
/// stream and preserving upstream byte order.
fn relay_response(result: RelayResult) -> Response {
    let status = StatusCode::from_u16(result.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let body = match result.body {
        RelayBody::Stream(upstream) => Body::from_stream(upstream.bytes_stream()),
        RelayBody::Bytes(bytes) => Body::from(bytes),
        RelayBody::Text(text) => Body::from(text),
        RelayBody::Json(value) => Body::from(value.to_string()),
        RelayBody::Empty => Body::empty(),
    };
    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = result.headers;
    response
}

fn error_response(err: RelayError) -> Response {
    (err.status(), err.to_string()).into_response()
}

fn wire_result(outcome: batch::EntryOutcome) -> DispatchResult {
    match outcome.result {
        Ok(result) => DispatchResult {
            id: outcome.id,
            ok: (200..300).contains(&result.status),
            status: result.status,
            status_text: result.status_text,
            headers: headers_to_map(&result.headers),
            final_url: result.final_url,
            redirected: result.redirected,
            duration_ms: result.duration.as_millis() as u64,
            body: wire_body(result.body),
        },
        Err(err) => DispatchResult {
            id: outcome.id,
            ok: false,
            status: 0,
            status_text: err.code().to_string(),
            headers: BTreeMap::new(),
            final_url: String::new(),
            redirected: false,
            duration_ms: outcome.duration.as_millis() as u64,
            body: None,
        },
    }
}

/// Materialized bodies on the JSON path; bytes travel base64url-encoded.
fn wire_body(body: RelayBody) -> Option<serde_json::Value> {
    match body {
        RelayBody::Bytes(bytes) => Some(json!(policy::encode_base64url(&bytes))),
        RelayBody::Text(text) => Some(json!(text)),
        RelayBody::Json(value) => Some(value),
        RelayBody::Empty | RelayBody::Stream(_) => None,
    }
}

fn headers_to_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else { continue };
        map.entry(name.to_string())
            .and_modify(|existing: &mut String| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    map
}
