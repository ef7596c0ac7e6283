//! URL-safe base64 codec and target URL validation.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use thiserror::Error;
use url::Url;

/// Error type for malformed base64url payloads.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Input contained characters outside the base64url alphabet, or had
    /// a length no padding can make valid.
    #[error("invalid base64url payload: {0}")]
    Base64(String),

    /// Decoded bytes were not valid UTF-8 where text was expected.
    #[error("decoded payload is not valid UTF-8")]
    Utf8,
}

/// Decode a url-safe base64 string (`-_` alphabet) into bytes.
///
/// Accepts both padded and unpadded input; trailing `=` is stripped
/// before decoding.
pub fn decode_base64url(input: &str) -> Result<Vec<u8>, DecodeError> {
    let trimmed = input.trim_end_matches('=');
    URL_SAFE_NO_PAD
        .decode(trimmed)
        .map_err(|e| DecodeError::Base64(e.to_string()))
}

/// Decode a url-safe base64 string into UTF-8 text.
pub fn decode_base64url_text(input: &str) -> Result<String, DecodeError> {
    let bytes = decode_base64url(input)?;
    String::from_utf8(bytes).map_err(|_| DecodeError::Utf8)
}

/// Encode bytes as url-safe base64 with no padding characters.
pub fn encode_base64url(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// True iff `s` parses as an absolute URL whose scheme is exactly `https`.
pub fn is_https_url(s: &str) -> bool {
    match Url::parse(s) {
        Ok(url) => url.scheme() == "https",
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64url_round_trip() {
        let cases: &[&[u8]] = &[
            b"",
            b"f",
            b"fo",
            b"foo",
            b"https://example.com/a?b=1",
            &[0x00, 0xff, 0xfe, 0x01, 0x80],
        ];
        for bytes in cases {
            let encoded = encode_base64url(bytes);
            assert!(!encoded.contains('='), "no padding expected: {}", encoded);
            assert_eq!(decode_base64url(&encoded).unwrap(), bytes.to_vec());
        }
    }

    #[test]
    fn test_decode_accepts_padded_input() {
        // "https://example.com" padded the standard way
        let padded = "aHR0cHM6Ly9leGFtcGxlLmNvbQ==";
        assert_eq!(
            decode_base64url_text(padded).unwrap(),
            "https://example.com"
        );
    }

    #[test]
    fn test_decode_rejects_malformed_input() {
        assert!(decode_base64url("not base64!!").is_err());
        assert!(decode_base64url("a").is_err(), "length 1 is never valid");
        assert!(decode_base64url("ab cd").is_err());
    }

    #[test]
    fn test_decode_text_rejects_invalid_utf8() {
        let encoded = encode_base64url(&[0xff, 0xfe]);
        assert!(matches!(
            decode_base64url_text(&encoded),
            Err(DecodeError::Utf8)
        ));
    }

    #[test]
    fn test_is_https_url() {
        assert!(is_https_url("https://example.com/a?b=1"));
        assert!(is_https_url("https://example.com:8443/"));
        assert!(!is_https_url("http://x"));
        assert!(!is_https_url("ftp://x"));
        assert!(!is_https_url("not a url"));
        assert!(!is_https_url("//example.com/relative"));
        assert!(!is_https_url(""));
    }
}
