//! Collector handler - turns change-source events into Current-table state.

use crate::config::Config;
use crate::describe::{Describe, DescribeOutcome};
use crate::error::Result;
use crate::handlers::{BatchRequest, BatchSummary};
use crate::store::CurrentStore;
use chrono::{DateTime, SecondsFormat, Utc};
use historical_engine::{classify, unwrap_envelope, ChangeEvent, EventClass, ResourceRecord};
use serde_json::Value;
use std::collections::BTreeMap;

/// Event names that create or mutate a resource. Anything else with a
/// usable payload is a delete.
pub const UPDATE_EVENTS: &[&str] = &[
    "CreateSecurityGroup",
    "AuthorizeSecurityGroupIngress",
    "AuthorizeSecurityGroupEgress",
    "RevokeSecurityGroupIngress",
    "RevokeSecurityGroupEgress",
    "ModifySecurityGroupRules",
    "CreateTags",
    "DeleteTags",
    "PollSecurityGroups",
];

const SCHEMA_VERSION: u32 = 1;

/// Process one delivered batch of change-source events.
///
/// Per-message failures are isolated: malformed bodies are dropped as
/// poison pills and stale deletes are dropped as already-superseded.
/// Only store and describe transport failures abort the batch.
pub async fn handle_collect(
    current: &dyn CurrentStore,
    describer: &dyn Describe,
    config: &Config,
    request: BatchRequest,
) -> Result<BatchSummary> {
    let mut summary = BatchSummary::default();

    for body in &request.records {
        let value = match unwrap_envelope(body) {
            Some(value) => value,
            None => {
                tracing::warn!("Dropping non-event message body");
                summary.dropped += 1;
                continue;
            }
        };

        let event: ChangeEvent = match serde_json::from_value(value) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping malformed change event");
                summary.dropped += 1;
                continue;
            }
        };

        match classify(&event, UPDATE_EVENTS) {
            EventClass::Update => {
                if process_update(current, describer, config, &event).await? {
                    summary.processed += 1;
                } else {
                    summary.skipped += 1;
                }
            }
            EventClass::Delete => {
                if process_delete(current, config, &event).await? {
                    summary.processed += 1;
                } else {
                    summary.dropped += 1;
                }
            }
            EventClass::Skip(reason) => {
                tracing::debug!(?reason, account = %event.account, "Skipping event");
                summary.skipped += 1;
            }
        }
    }

    Ok(summary)
}

/// Update path. Returns false when the event was skipped without a write.
async fn process_update(
    current: &dyn CurrentStore,
    describer: &dyn Describe,
    config: &Config,
    event: &ChangeEvent,
) -> Result<bool> {
    let region = event.region_or(&config.region).to_string();

    let resource_key = match event.request_parameter("groupId", true) {
        Some(key) => key.clone(),
        None => {
            tracing::warn!(account = %event.account, "Update event without a resource key");
            return Ok(false);
        }
    };
    let arn = resource_arn(&event.account, &region, &resource_key);

    // The polling subsystem ships the configuration along with the
    // event, sparing a describe call.
    let collected = event.detail.as_ref().and_then(|d| d.collected.clone());
    let configuration = match collected {
        Some(configuration) => configuration,
        None => match describer.describe(&event.account, &region, &resource_key).await? {
            DescribeOutcome::Found(configuration) => configuration,
            DescribeOutcome::NotFound => {
                // Benign race: the resource vanished between the event
                // and the describe call. A deletion event follows.
                tracing::warn!(%arn, "Resource gone before describe; skipping");
                return Ok(false);
            }
            DescribeOutcome::AccessDenied => {
                tracing::error!(%arn, "Access denied describing resource; skipping");
                return Ok(false);
            }
        },
    };

    let record = build_record(event, config, arn.clone(), region, configuration);
    current.put(&record).await?;

    tracing::debug!(%arn, event_time = %record.event_time, "Wrote current record");
    Ok(true)
}

/// Delete path. Returns false when the delete lost the event-time guard.
async fn process_delete(
    current: &dyn CurrentStore,
    config: &Config,
    event: &ChangeEvent,
) -> Result<bool> {
    let region = event.region_or(&config.region).to_string();

    let resource_key = match event.request_parameter("groupId", true) {
        Some(key) => key.clone(),
        None => {
            tracing::warn!(account = %event.account, "Delete event without a resource key");
            return Ok(false);
        }
    };
    let arn = resource_arn(&event.account, &region, &resource_key);
    let event_time = event_time_or_now(event);

    // Merge the tombstone over the existing row so fields the delete
    // event does not carry survive into the tombstone revision.
    let mut tombstone = match current.get(&arn).await? {
        Some(existing) => existing,
        None => build_record(event, config, arn.clone(), region, Value::Object(Default::default())),
    };
    let user_identity = event.detail.as_ref().and_then(|d| d.user_identity.clone());
    tombstone.mark_deleted(event_time.clone(), event.principal_id(), user_identity);
    tombstone.ttl = record_ttl(&event_time, config.ttl_expiry);

    if !current.put_if_not_newer(&tombstone).await? {
        tracing::warn!(%arn, %event_time, "Stale delete lost to a newer record; dropping");
        return Ok(false);
    }

    if !current.delete_if_not_newer(&arn, &event_time).await? {
        tracing::warn!(%arn, %event_time, "Delete guard rejected row removal");
        return Ok(false);
    }

    tracing::debug!(%arn, %event_time, "Deleted current record");
    Ok(true)
}

fn build_record(
    event: &ChangeEvent,
    config: &Config,
    arn: String,
    region: String,
    mut configuration: Value,
) -> ResourceRecord {
    let event_time = event_time_or_now(event);
    let tags = extract_tags(&mut configuration);

    let mut record = ResourceRecord::new(
        arn,
        event_time.clone(),
        event.account.clone(),
        region,
        configuration,
        SCHEMA_VERSION,
    );
    record.tags = tags;
    record.ttl = record_ttl(&event_time, config.ttl_expiry);
    record.principal_id = event.principal_id();

    if let Some(detail) = &event.detail {
        record.user_identity = detail.user_identity.clone();
        record.user_agent = detail.user_agent.clone();
        record.source_ip_address = detail.source_ip_address.clone();
        record.request_parameters = detail.request_parameters.clone();
        record.event_source = detail.event_source.clone();
    }

    record
}

fn resource_arn(account: &str, region: &str, resource_key: &Value) -> String {
    let key = resource_key.as_str().unwrap_or_default();
    format!("arn:aws:ec2:{region}:{account}:security-group/{key}")
}

fn event_time_or_now(event: &ChangeEvent) -> String {
    event
        .detail
        .as_ref()
        .and_then(|d| d.event_time.clone())
        .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Current rows expire a fixed window past their event time. Durable
/// rows never carry a ttl.
fn record_ttl(event_time: &str, ttl_expiry: u64) -> Option<u64> {
    let parsed = DateTime::parse_from_rfc3339(event_time).ok()?;
    Some(parsed.timestamp().max(0) as u64 + ttl_expiry)
}

/// Providers return tags inside the configuration document; they live
/// on the record itself.
fn extract_tags(configuration: &mut Value) -> BTreeMap<String, String> {
    let Some(map) = configuration.as_object_mut() else {
        return BTreeMap::new();
    };
    let Some(tags) = map.remove("tags") else {
        return BTreeMap::new();
    };

    match tags {
        Value::Object(entries) => entries
            .into_iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string())))
            .collect(),
        _ => BTreeMap::new(),
    }
}
