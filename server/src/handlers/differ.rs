//! Differ handler - turns Current-table stream records into Durable revisions.

use crate::error::Result;
use crate::handlers::{BatchRequest, BatchSummary};
use crate::rehydrate::rehydrate_from_current;
use crate::store::{CurrentStore, DurableStore};
use chrono::{SecondsFormat, Utc};
use historical_engine::{
    codec, has_material_change, unwrap_envelope, ResourceRecord, StreamEventName, StreamRecord,
    TableShape,
};
use serde_json::Value;

/// Fields that must never trigger a revision on their own: the range
/// key, provenance metadata, and schema-version markers all churn
/// without the resource itself changing.
const DIFF_EXCLUDED_PATHS: &[&str] = &[
    "eventTime",
    "principalId",
    "userIdentity",
    "userAgent",
    "sourceIPAddress",
    "sourceIpAddress",
    "requestParameters",
    "eventSource",
    "ttl",
    "version",
    "configuration._version",
];

/// The system principal stamped on TTL-expiry deletions by the store
/// itself. Application deletes carry the caller's identity instead and
/// already produced a tombstone through the collector.
const EXPIRY_PRINCIPAL: &str = "dynamodb.amazonaws.com";

/// Process one delivered batch of Current-table stream records.
pub async fn handle_diff(
    current: &dyn CurrentStore,
    durable: &dyn DurableStore,
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

        match process_record(current, durable, record).await? {
            Outcome::Appended => summary.processed += 1,
            Outcome::Skipped => summary.skipped += 1,
            Outcome::Dropped => summary.dropped += 1,
        }
    }

    Ok(summary)
}

enum Outcome {
    Appended,
    Skipped,
    Dropped,
}

async fn process_record(
    current: &dyn CurrentStore,
    durable: &dyn DurableStore,
    mut record: StreamRecord,
) -> Result<Outcome> {
    match record.event_name {
        StreamEventName::Remove => process_remove(durable, &record).await,
        StreamEventName::Insert => {
            if !rehydrate_from_current(&mut record, current).await? {
                tracing::warn!(arn = record.arn().unwrap_or(""), "Current row gone before rehydration; skipping");
                return Ok(Outcome::Skipped);
            }
            process_insert(durable, &record).await
        }
        StreamEventName::Modify => {
            if !rehydrate_from_current(&mut record, current).await? {
                tracing::warn!(arn = record.arn().unwrap_or(""), "Current row gone before rehydration; skipping");
                return Ok(Outcome::Skipped);
            }
            process_modify(durable, &record).await
        }
    }
}

/// First sighting of a resource: its first revision, appended as-is.
async fn process_insert(durable: &dyn DurableStore, record: &StreamRecord) -> Result<Outcome> {
    let revision = match decode_new_image(record) {
        Some(revision) => revision,
        None => return Ok(Outcome::Dropped),
    };

    durable.append(&revision).await?;
    tracing::debug!(arn = %revision.arn, event_time = %revision.event_time, "Appended first revision");
    Ok(Outcome::Appended)
}

/// A mutation: append a revision only when the resource materially
/// changed against the latest revision at or before this event.
async fn process_modify(durable: &dyn DurableStore, record: &StreamRecord) -> Result<Outcome> {
    let revision = match decode_new_image(record) {
        Some(revision) => revision,
        None => return Ok(Outcome::Dropped),
    };

    let prior = durable
        .latest_at_or_before(&revision.arn, &revision.event_time)
        .await?;

    match prior {
        Some(prior) => {
            if !materially_changed(&prior, &revision) {
                tracing::debug!(arn = %revision.arn, "No material change; skipping");
                return Ok(Outcome::Skipped);
            }
            durable.append(&revision).await?;
            tracing::debug!(arn = %revision.arn, event_time = %revision.event_time, "Appended revision");
            Ok(Outcome::Appended)
        }
        None => {
            // No baseline at or before this event. If newer revisions
            // exist the event arrived out of order and is stale; if the
            // log is empty something upstream was lost and the safest
            // recovery is to append.
            if durable.count(&revision.arn).await? > 0 {
                tracing::warn!(arn = %revision.arn, event_time = %revision.event_time, "Stale out-of-order modify; dropping");
                return Ok(Outcome::Dropped);
            }

            tracing::error!(arn = %revision.arn, "Modify with no prior revision; appending as recovery");
            durable.append(&revision).await?;
            Ok(Outcome::Appended)
        }
    }
}

/// Row removal. Only store-driven expiry removals append a tombstone
/// here; an application delete already wrote its tombstone through the
/// collector, and reacting again would duplicate it.
async fn process_remove(durable: &dyn DurableStore, record: &StreamRecord) -> Result<Outcome> {
    if !is_expiry_removal(record) {
        tracing::debug!(arn = record.arn().unwrap_or(""), "Application-driven removal already recorded; skipping");
        return Ok(Outcome::Skipped);
    }

    let image = match record.data.old_image.as_ref() {
        Some(image) => image,
        None => {
            tracing::warn!("Expiry removal without an old image; dropping");
            return Ok(Outcome::Dropped);
        }
    };

    let mut revision = match codec::decode(image, TableShape::Durable) {
        Ok(revision) => revision,
        Err(e) => {
            tracing::warn!(error = %e, "Dropping malformed old image");
            return Ok(Outcome::Dropped);
        }
    };

    // The expiry happened now, not at the old event time.
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    revision.mark_deleted(now, None, record.user_identity.clone());

    durable.append(&revision).await?;
    tracing::debug!(arn = %revision.arn, event_time = %revision.event_time, "Appended expiry tombstone");
    Ok(Outcome::Appended)
}

fn is_expiry_removal(record: &StreamRecord) -> bool {
    let Some(identity) = record.user_identity.as_ref() else {
        return false;
    };
    identity.get("type").and_then(Value::as_str) == Some("Service")
        && identity.get("principalId").and_then(Value::as_str) == Some(EXPIRY_PRINCIPAL)
}

fn decode_new_image(record: &StreamRecord) -> Option<ResourceRecord> {
    let image = record.data.new_image.as_ref()?;
    match codec::decode(image, TableShape::Durable) {
        Ok(revision) => Some(revision),
        Err(e) => {
            tracing::warn!(error = %e, "Dropping malformed new image");
            None
        }
    }
}

/// Full-record diff with the ephemeral fields masked out.
fn materially_changed(prior: &ResourceRecord, current: &ResourceRecord) -> bool {
    let previous = serde_json::to_value(prior).unwrap_or(Value::Null);
    let next = serde_json::to_value(current).unwrap_or(Value::Null);
    has_material_change(&previous, &next, DIFF_EXCLUDED_PATHS)
}
