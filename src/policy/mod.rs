//! Codec and header-policy subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming relay request:
//!     → codec.rs (decode base64url target/body, validate URL shape)
//!     → headers.rs (outbound filter: strip hop-by-hop + sensitive)
//!     → headers.rs (inject browser-profile defaults)
//!     → [upstream call happens elsewhere]
//!     → headers.rs (inbound filter: response allowlist)
//!     → headers.rs (consolidate Set-Cookie into X-Set-Cookie)
//! ```
//!
//! # Design Decisions
//! - Pure functions only; no I/O and no shared state
//! - Deny-list outbound (unknown headers pass), allow-list inbound
//! - Raw Set-Cookie never crosses back to the caller

pub mod codec;
pub mod headers;

pub use codec::{decode_base64url, decode_base64url_text, encode_base64url, is_https_url, DecodeError};
pub use headers::{
    consolidate_set_cookies, filter_inbound, filter_outbound, inject_browser_defaults,
    split_consolidated, X_SET_COOKIE,
};
