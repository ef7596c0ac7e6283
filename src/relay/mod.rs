//! Relay engine subsystem.
//!
//! # Data Flow
//! ```text
//! Validated request (target, method, headers, body?)
//!     → upstream.rs (header policy, jar read, outbound call)
//!     → upstream.rs (Set-Cookie capture, jar write, response filter)
//!     → RelayResult (streamed or materialized body)
//!
//! Batch:
//!     requests[1..16]
//!     → batch.rs (size check before any network activity)
//!     → sequential loop | concurrent join over upstream.rs
//!     → BatchOutcome (input order, aggregated cookie updates)
//! ```
//!
//! # Design Decisions
//! - Exactly one outbound call, one jar read, at most one jar write per relay
//! - Nothing is retried; failures surface to the caller
//! - Per-entry isolation in batches: one failure never aborts siblings

pub mod batch;
pub mod types;
pub mod upstream;

pub use batch::{dispatch, BatchEntry, BatchOutcome, ExecutionMode, MAX_BATCH_ENTRIES};
pub use types::{RelayBody, RelayError, RelayRequest, RelayResult, ResponseMode};
pub use upstream::UpstreamRelay;
