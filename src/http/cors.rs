//! Cross-origin middleware for the connector client.
//!
//! Preflights are answered directly with 204; every other response gets
//! the configured allow-origin and the fixed expose list. The expose list
//! mirrors the inbound header allowlist exactly, so nothing filtered out
//! upstream can leak back in through CORS.

use axum::{
    body::Body,
    extract::State,
    http::{header::HeaderValue, HeaderMap, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::server::AppState;

/// Response headers a cross-origin caller is allowed to read.
const EXPOSE_HEADERS: &str =
    "Content-Type, Content-Length, Accept-Ranges, Content-Range, ETag, Last-Modified, X-Set-Cookie";

const ALLOW_METHODS: &str = "GET,HEAD,POST,OPTIONS";

pub async fn cors_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let allow_origin = origin_value(&state.config.cors.allow_origin);

    if req.method() == Method::OPTIONS {
        return preflight(allow_origin);
    }

    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert("access-control-allow-origin", allow_origin);
    headers.insert(
        "access-control-expose-headers",
        HeaderValue::from_static(EXPOSE_HEADERS),
    );
    response
}

fn origin_value(configured: &str) -> HeaderValue {
    HeaderValue::from_str(configured).unwrap_or(HeaderValue::from_static("*"))
}

fn preflight(allow_origin: HeaderValue) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("access-control-allow-origin", allow_origin);
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert("access-control-allow-headers", HeaderValue::from_static("*"));
    headers.insert("access-control-max-age", HeaderValue::from_static("86400"));
    (StatusCode::NO_CONTENT, headers).into_response()
}
