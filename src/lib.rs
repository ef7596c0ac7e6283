//! Edge-deployed HTTPS relay with per-session cookie isolation.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!                      │                 EDGE RELAY                    │
//!                      │                                               │
//!   Client Request     │  ┌────────┐   ┌──────────┐   ┌────────────┐  │
//!   ──────────────────▶│  │  http  │──▶│  policy  │──▶│   relay    │  │
//!                      │  │ server │   │ validate │   │  upstream  │──┼──▶ Target
//!                      │  └────────┘   │ + filter │   └─────┬──────┘  │    Server
//!                      │               └──────────┘         │         │
//!                      │                                    ▼         │
//!                      │                             ┌────────────┐   │
//!                      │                             │  session   │   │
//!                      │                             │ cookie jar │   │
//!                      │                             └─────┬──────┘   │
//!                      │               ┌──────────┐        │          │
//!   Client Response    │  ┌────────┐   │  policy  │        │          │
//!   ◀──────────────────┼──│ stream │◀──│ response │◀───────┘          │
//!                      │  │ / JSON │   │  filter  │                   │
//!                      │  └────────┘   └──────────┘                   │
//!                      │                                               │
//!                      │  ┌─────────────────────────────────────────┐ │
//!                      │  │           Cross-Cutting Concerns         │ │
//!                      │  │  config · observability · lifecycle      │ │
//!                      │  └─────────────────────────────────────────┘ │
//!                      └──────────────────────────────────────────────┘
//! ```
//!
//! The only state that outlives a request is the session cookie jar; the
//! batch dispatcher in `relay::batch` runs up to 16 relay calls either
//! strictly in order (cookies propagate between entries) or concurrently.

// Core subsystems
pub mod config;
pub mod http;
pub mod policy;
pub mod relay;
pub mod session;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::schema::RelayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
