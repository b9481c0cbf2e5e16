//! Proxy handler - forwards stream records to the next stage, shrinking
//! oversized payloads at the channel boundary.

use crate::config::Config;
use crate::error::Result;
use crate::forward::Publish;
use crate::handlers::{BatchRequest, BatchSummary};
use historical_engine::{shrink, unwrap_envelope, AttrValue, StreamRecord};

/// Process one delivered batch of stream records: filter by region,
/// enforce the transport size budget, and publish onward.
///
/// A publish failure is systemic and fails the whole batch so the host
/// redelivers it; everything already published is redelivered too, which
/// the at-least-once downstream tolerates.
pub async fn handle_forward(
    publisher: &dyn Publish,
    config: &Config,
    request: BatchRequest,
) -> Result<BatchSummary> {
    let mut summary = BatchSummary::default();

    for body in &request.records {
        let value = match unwrap_envelope(body) {
            Some(value) => value,
            None => {
                tracing::warn!("Dropping non-record message body");
                summary.dropped += 1;
                continue;
            }
        };

        let record: StreamRecord = match serde_json::from_value(value) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping malformed stream record");
                summary.dropped += 1;
                continue;
            }
        };

        if let Some(region) = record_region(&record) {
            if !config.forwards_region(region) {
                tracing::debug!(region, "Record outside forwarded regions; skipping");
                summary.skipped += 1;
                continue;
            }
        }

        let prepared = shrink::prepare_for_transport(record, config.size_limit, config.force_shrink);
        publisher.publish(&prepared).await?;
        summary.processed += 1;
    }

    Ok(summary)
}

fn record_region(record: &StreamRecord) -> Option<&str> {
    let image = record
        .data
        .new_image
        .as_ref()
        .or(record.data.old_image.as_ref())?;
    image.get("region").and_then(AttrValue::as_str)
}
