//! Outbound dispatch: one validated request in, one upstream call out.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::header::{HeaderName, HeaderValue, COOKIE, SET_COOKIE};
use axum::http::Method;
use reqwest::redirect::Policy;
use url::Url;

use crate::config::schema::{BrowserProfileConfig, RelayConfig, UpstreamConfig};
use crate::observability::metrics;
use crate::policy;
use crate::relay::types::{
    parse_method, RelayBody, RelayError, RelayRequest, RelayResult, ResponseMode,
};
use crate::session::SessionStore;

/// The upstream relay engine.
///
/// Holds the shared HTTP client and the session cookie store; everything
/// else is request-scoped. One instance is shared across all handlers.
pub struct UpstreamRelay {
    client: reqwest::Client,
    store: Arc<SessionStore>,
    upstream: UpstreamConfig,
    browser: BrowserProfileConfig,
}

impl UpstreamRelay {
    /// Build the relay engine and its HTTP client from configuration.
    ///
    /// Redirects are followed automatically up to the configured limit;
    /// no request timeout is applied unless one is configured.
    pub fn new(config: &RelayConfig, store: Arc<SessionStore>) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .redirect(Policy::limited(config.upstream.max_redirects))
            .cookie_store(false);
        if let Some(secs) = config.timeouts.request_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;
        Ok(Self {
            client,
            store,
            upstream: config.upstream.clone(),
            browser: config.browser.clone(),
        })
    }

    /// The session cookie store backing this relay.
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Relay one request upstream on behalf of `sid`.
    ///
    /// Performs exactly one outbound call, one cookie-jar read and at most
    /// one cookie-jar write. Calls without a session id skip the jar but
    /// still report observed cookies via `X-Set-Cookie`.
    pub async fn relay(
        &self,
        sid: Option<&str>,
        request: RelayRequest,
    ) -> Result<RelayResult, RelayError> {
        let started = Instant::now();
        let target = self.validate_target(&request.target)?;
        let method = parse_method(&request.method)?;
        let origin = target.origin().ascii_serialization();

        let mut headers = policy::filter_outbound(&request.headers);
        policy::inject_browser_defaults(&mut headers, &self.browser);
        if let Some(sid) = sid {
            let cookie = self.store.cookie_header(sid, &origin);
            if !cookie.is_empty() {
                if let Ok(value) = HeaderValue::from_str(&cookie) {
                    headers.insert(COOKIE, value);
                }
            }
        }

        // GET/HEAD never carry a body even if one was supplied.
        let body = match (&method, &request.body_b64) {
            (&Method::POST, Some(encoded)) => Some(policy::decode_base64url(encoded)?),
            _ => None,
        };

        tracing::debug!(
            sid = sid.unwrap_or("-"),
            method = %method,
            url = %target,
            "Relaying request"
        );

        let mut outbound = self
            .client
            .request(method.clone(), target.clone())
            .headers(headers);
        if let Some(bytes) = body {
            outbound = outbound.body(bytes);
        }

        let response = outbound.send().await.map_err(|e| {
            metrics::record_upstream_error(method.as_str());
            tracing::warn!(url = %target, error = %e, "Upstream request failed");
            RelayError::Upstream(e.to_string())
        })?;

        let status = response.status();
        let final_url = response.url().to_string();
        let redirected = response.url().as_str() != target.as_str();

        let raw_cookies: Vec<String> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok().map(str::to_owned))
            .collect();
        if let Some(sid) = sid {
            if !raw_cookies.is_empty() {
                // Cookies belong to wherever the redirect chain landed.
                let resolved = Url::parse(&final_url)
                    .map(|u| u.origin().ascii_serialization())
                    .unwrap_or(origin);
                self.store.merge_set_cookies(sid, &resolved, &raw_cookies);
            }
        }

        let mut filtered = policy::filter_inbound(response.headers());
        if let Some(consolidated) = policy::consolidate_set_cookies(&raw_cookies) {
            if let Ok(value) = HeaderValue::from_str(&consolidated) {
                filtered.insert(HeaderName::from_static(policy::X_SET_COOKIE), value);
            }
        }

        let body = materialize(response, request.response_mode).await?;
        let duration = started.elapsed();

        metrics::record_request(method.as_str(), status.as_u16(), started);
        tracing::debug!(
            status = status.as_u16(),
            duration_ms = duration.as_millis() as u64,
            redirected,
            "Relay complete"
        );

        Ok(RelayResult {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            headers: filtered,
            body,
            final_url,
            redirected,
            duration,
        })
    }

    /// Check the target against the configured scheme policy.
    ///
    /// Any https host is accepted; this open-relay posture is intentional
    /// for a controlled-origin deployment. Plaintext http is only honored
    /// when `upstream.allow_insecure_http` is set.
    fn validate_target(&self, raw: &str) -> Result<Url, RelayError> {
        let url = Url::parse(raw).map_err(|_| RelayError::InvalidTarget(raw.to_string()))?;
        match url.scheme() {
            "https" => Ok(url),
            "http" if self.upstream.allow_insecure_http => Ok(url),
            _ => Err(RelayError::InvalidTarget(raw.to_string())),
        }
    }
}

/// Read the response body into the representation the caller asked for.
///
/// Stream mode hands the unread response back so the transport can forward
/// upstream bytes in order, without additional buffering.
async fn materialize(
    response: reqwest::Response,
    mode: ResponseMode,
) -> Result<RelayBody, RelayError> {
    match mode {
        ResponseMode::Stream => Ok(RelayBody::Stream(response)),
        ResponseMode::ArrayBuffer => {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| RelayError::Upstream(e.to_string()))?;
            Ok(RelayBody::Bytes(bytes.to_vec()))
        }
        ResponseMode::Text => {
            let text = response
                .text()
                .await
                .map_err(|e| RelayError::Upstream(e.to_string()))?;
            Ok(RelayBody::Text(text))
        }
        ResponseMode::Json => {
            let value = response
                .json()
                .await
                .map_err(|e| RelayError::Upstream(e.to_string()))?;
            Ok(RelayBody::Json(value))
        }
        ResponseMode::None => Ok(RelayBody::Empty),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::types::RelayRequest;

    fn relay_with_defaults() -> UpstreamRelay {
        UpstreamRelay::new(&RelayConfig::default(), Arc::new(SessionStore::new())).unwrap()
    }

    #[test]
    fn test_target_policy_https_only_by_default() {
        let relay = relay_with_defaults();
        assert!(relay.validate_target("https://example.com/a?b=1").is_ok());
        assert!(relay.validate_target("http://example.com").is_err());
        assert!(relay.validate_target("ftp://example.com").is_err());
        assert!(relay.validate_target("not a url").is_err());
    }

    #[test]
    fn test_target_policy_configurable_http() {
        let mut config = RelayConfig::default();
        config.upstream.allow_insecure_http = true;
        let relay = UpstreamRelay::new(&config, Arc::new(SessionStore::new())).unwrap();
        assert!(relay.validate_target("http://127.0.0.1:9999").is_ok());
        assert!(relay.validate_target("ftp://example.com").is_err());
    }

    #[tokio::test]
    async fn test_invalid_method_fails_before_any_network_call() {
        let relay = relay_with_defaults();
        let mut request = RelayRequest::get("https://example.invalid/");
        request.method = "DELETE".to_string();
        let err = relay.relay(Some("s1"), request).await.unwrap_err();
        assert!(matches!(err, RelayError::UnsupportedMethod(_)));
    }
}
