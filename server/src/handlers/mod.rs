//! Batch handlers for the pipeline stages.

mod collector;
mod differ;
mod proxy;

pub use collector::*;
pub use differ::*;
pub use proxy::*;

use serde::{Deserialize, Serialize};

/// One delivered batch of raw message bodies from an at-least-once
/// channel. Bodies may be bare JSON or wrapped in a notification
/// envelope.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub records: Vec<String>,
}

/// Per-batch processing summary.
#[derive(Debug, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    /// Messages that resulted in a write or a forward
    pub processed: usize,
    /// Messages recognized and deliberately not acted on
    pub skipped: usize,
    /// Poison pills and stale events removed from the batch
    pub dropped: usize,
}
