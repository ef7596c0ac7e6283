//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming connection
//!     → server.rs (Axum setup, middleware stack)
//!     → cors.rs (preflight short-circuit, allow-origin on everything)
//!     → handlers.rs (/p, /fetch, /dispatch envelopes)
//!     → relay engine
//!     → handlers.rs (stream or JSON response shaping)
//! ```

pub mod cors;
pub mod handlers;
pub mod request;
pub mod server;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
