//! Session cookie-jar subsystem.
//!
//! # Data Flow
//! ```text
//! relay call (sid, target origin)
//!     → jar.rs cookie_header()   (build outgoing Cookie header)
//!     → [upstream call]
//!     → jar.rs merge_set_cookies() (fold Set-Cookie values back in)
//! ```
//!
//! # Design Decisions
//! - One jar per session id; jars for different sessions never contend
//! - Same-session operations are serialized through a per-session mutex
//! - Name/value only, last write wins; no RFC-6265 attribute scoping

pub mod jar;

pub use jar::SessionStore;
