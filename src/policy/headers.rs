//! Header allow/deny filtering, browser-profile defaults, and Set-Cookie
//! consolidation.

use axum::http::header::{HeaderMap, HeaderName, HeaderValue};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::config::schema::BrowserProfileConfig;

/// Everything except alphanumerics and `-_.!~*'()` is escaped; commas in
/// particular, so the consolidation join separator stays unambiguous.
const COOKIE_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Response header carrying the consolidated, percent-encoded Set-Cookie
/// values observed on the upstream response.
pub const X_SET_COOKIE: &str = "x-set-cookie";

/// Hop-by-hop headers that must not be forwarded by an intermediary.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "proxy-connection",
    "keep-alive",
    "transfer-encoding",
    "upgrade",
    "trailer",
    "te",
];

/// Caller-supplied headers the relay owns itself and never forwards.
const SENSITIVE: &[&str] = &["host", "cookie", "authorization", "content-length"];

/// The only upstream response headers exposed back to the caller.
const RESPONSE_ALLOWLIST: &[&str] = &[
    "content-type",
    "content-length",
    "accept-ranges",
    "content-range",
    "etag",
    "last-modified",
    "x-set-cookie",
];

/// Filter caller-supplied headers before they reach the upstream.
///
/// Drops the hop-by-hop set and the sensitive set, case-insensitively;
/// everything else passes through.
pub fn filter_outbound(headers: &HeaderMap) -> HeaderMap {
    let mut filtered = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers.iter() {
        if HOP_BY_HOP.contains(&name.as_str()) || SENSITIVE.contains(&name.as_str()) {
            continue;
        }
        filtered.append(name.clone(), value.clone());
    }
    filtered
}

/// Filter upstream response headers before they reach the caller.
///
/// Keeps only the response allowlist; raw `Set-Cookie` never passes.
pub fn filter_inbound(headers: &HeaderMap) -> HeaderMap {
    let mut filtered = HeaderMap::new();
    for (name, value) in headers.iter() {
        if RESPONSE_ALLOWLIST.contains(&name.as_str()) {
            filtered.append(name.clone(), value.clone());
        }
    }
    filtered
}

/// Inject browser-like defaults for headers the caller did not supply.
///
/// Many origins return degraded or error responses (405/412) to generic
/// or missing user agents.
pub fn inject_browser_defaults(headers: &mut HeaderMap, profile: &BrowserProfileConfig) {
    let defaults: &[(&str, &str)] = &[
        ("user-agent", &profile.user_agent),
        ("accept", &profile.accept),
        ("accept-language", &profile.accept_language),
    ];
    for (name, value) in defaults {
        let name = match HeaderName::from_bytes(name.as_bytes()) {
            Ok(n) => n,
            Err(_) => continue,
        };
        if !headers.contains_key(&name) {
            if let Ok(value) = HeaderValue::from_str(value) {
                headers.insert(name, value);
            }
        }
    }
}

/// Consolidate raw `Set-Cookie` values into a single `X-Set-Cookie` value.
///
/// Each value is percent-encoded individually and the results are joined
/// with commas, so a decoder can split on commas before decoding. Returns
/// `None` when no values were observed; the header is omitted entirely in
/// that case.
pub fn consolidate_set_cookies(raw: &[String]) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    let joined = raw
        .iter()
        .map(|v| utf8_percent_encode(v, COOKIE_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join(",");
    Some(joined)
}

/// Reverse of [`consolidate_set_cookies`]: split on commas, then
/// percent-decode each segment.
pub fn split_consolidated(value: &str) -> Vec<String> {
    value
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|s| percent_decode_str(s).decode_utf8_lossy().into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_map(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_outbound_filter_drops_denied_headers() {
        let headers = header_map(&[
            ("Host", "evil.example"),
            ("Cookie", "a=1"),
            ("Authorization", "Bearer tok"),
            ("Content-Length", "12"),
            ("Connection", "keep-alive"),
            ("Te", "trailers"),
            ("X-Custom", "kept"),
            ("Range", "bytes=0-99"),
        ]);
        let filtered = filter_outbound(&headers);
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered.get("x-custom").unwrap(), "kept");
        assert_eq!(filtered.get("range").unwrap(), "bytes=0-99");
    }

    #[test]
    fn test_inbound_filter_keeps_only_allowlist() {
        let headers = header_map(&[
            ("Set-Cookie", "sid=secret"),
            ("Server", "nginx"),
            ("Content-Type", "text/html"),
            ("Content-Range", "bytes 0-99/1000"),
            ("X-Powered-By", "php"),
        ]);
        let filtered = filter_inbound(&headers);
        assert_eq!(filtered.len(), 2);
        assert!(filtered.get("set-cookie").is_none());
        assert_eq!(filtered.get("content-type").unwrap(), "text/html");
        assert_eq!(filtered.get("content-range").unwrap(), "bytes 0-99/1000");
    }

    #[test]
    fn test_browser_defaults_injected_only_when_absent() {
        let profile = BrowserProfileConfig::default();

        let mut empty = HeaderMap::new();
        inject_browser_defaults(&mut empty, &profile);
        assert!(empty
            .get("user-agent")
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("Mozilla/5.0"));
        assert!(empty.contains_key("accept"));
        assert!(empty.contains_key("accept-language"));

        let mut custom = header_map(&[("User-Agent", "curl/8.0")]);
        inject_browser_defaults(&mut custom, &profile);
        assert_eq!(custom.get("user-agent").unwrap(), "curl/8.0");
    }

    #[test]
    fn test_consolidation_round_trip() {
        let raw = vec![
            "foo=bar; Path=/; HttpOnly".to_string(),
            "s=1, with comma".to_string(),
        ];
        let consolidated = consolidate_set_cookies(&raw).unwrap();
        // The join separator is the only raw comma in the header value.
        assert_eq!(consolidated.matches(',').count(), 1);
        assert_eq!(split_consolidated(&consolidated), raw);
    }

    #[test]
    fn test_consolidation_omitted_when_empty() {
        assert!(consolidate_set_cookies(&[]).is_none());
    }
}
