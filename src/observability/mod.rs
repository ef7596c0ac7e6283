//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through all subsystems via tower-http
//! - Metric updates are cheap (atomic operations)
//! - Recording without an installed exporter is a no-op, so tests and
//!   embedded use need no setup

pub mod logging;
pub mod metrics;
