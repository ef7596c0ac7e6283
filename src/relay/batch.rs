//! Batch dispatch: run up to 16 relay calls as one operation.

use std::time::{Duration, Instant};

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};

use crate::observability::metrics;
use crate::policy;
use crate::relay::types::{RelayError, RelayRequest, RelayResult};
use crate::relay::upstream::UpstreamRelay;

/// Hard cap on entries per batch.
pub const MAX_BATCH_ENTRIES: usize = 16;

/// Execution strategy for a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Strict input order; entry i's cookie write completes before entry
    /// i+1's cookie read begins. This is how a later entry observes
    /// cookies set by an earlier one.
    #[default]
    Sequential,
    /// All entries launched concurrently. No ordering between sibling
    /// cookie reads and writes; same-origin writes race, last one wins.
    Parallel,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Sequential => "sequential",
            ExecutionMode::Parallel => "parallel",
        }
    }
}

/// One tagged entry in a batch.
#[derive(Debug)]
pub struct BatchEntry {
    /// Caller-supplied or positional identifier, echoed in the result.
    pub id: String,
    /// The relay request, or the validation error produced while shaping
    /// it from the wire. A failed entry still occupies its slot so input
    /// order is preserved.
    pub request: Result<RelayRequest, RelayError>,
}

/// Per-entry outcome, success or failure, with its own timing.
#[derive(Debug)]
pub struct EntryOutcome {
    pub id: String,
    pub duration: Duration,
    pub result: Result<RelayResult, RelayError>,
}

/// Result of a whole batch.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Per-entry outcomes in input order, regardless of execution mode.
    pub results: Vec<EntryOutcome>,
    /// Every consolidated `X-Set-Cookie` value produced by any entry,
    /// in input order.
    pub set_cookies: Vec<String>,
}

/// Validate the batch shape before any network activity.
pub fn validate_batch_size(len: usize) -> Result<(), RelayError> {
    if len == 0 || len > MAX_BATCH_ENTRIES {
        return Err(RelayError::BatchSize {
            got: len,
            max: MAX_BATCH_ENTRIES,
        });
    }
    Ok(())
}

/// Run a batch of relay calls for one session.
///
/// Fails only on shape violations; individual entry failures are captured
/// in the corresponding outcome and never abort sibling entries.
pub async fn dispatch(
    relay: &UpstreamRelay,
    sid: Option<&str>,
    entries: Vec<BatchEntry>,
    mode: ExecutionMode,
) -> Result<BatchOutcome, RelayError> {
    validate_batch_size(entries.len())?;
    metrics::record_batch(mode.as_str(), entries.len());

    let results = match mode {
        ExecutionMode::Sequential => {
            let mut results = Vec::with_capacity(entries.len());
            for entry in entries {
                results.push(run_entry(relay, sid, entry).await);
            }
            results
        }
        ExecutionMode::Parallel => {
            // join_all yields results in input order even though the
            // underlying calls complete in any order.
            join_all(
                entries
                    .into_iter()
                    .map(|entry| run_entry(relay, sid, entry)),
            )
            .await
        }
    };

    let set_cookies = results
        .iter()
        .filter_map(|outcome| outcome.result.as_ref().ok())
        .filter_map(|result| result.headers.get(policy::X_SET_COOKIE))
        .filter_map(|value| value.to_str().ok().map(str::to_owned))
        .collect();

    Ok(BatchOutcome {
        results,
        set_cookies,
    })
}

async fn run_entry(relay: &UpstreamRelay, sid: Option<&str>, entry: BatchEntry) -> EntryOutcome {
    let started = Instant::now();
    let result = match entry.request {
        Ok(request) => relay.relay(sid, request).await,
        Err(err) => Err(err),
    };
    EntryOutcome {
        id: entry.id,
        duration: started.elapsed(),
        result,
    }
}
