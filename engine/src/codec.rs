//! Record codec: transport attribute maps in, [`ResourceRecord`]s out.
//!
//! Decoding strips the store-internal bookkeeping that must never leak past
//! this boundary: multi-region replication markers always, and the
//! Current-table-only fields (`ttl`, `eventSource`) when the target is a
//! Durable-shaped record.

use crate::attribute::{attrs_from_json, attrs_to_json, AttrMap};
use crate::error::{Error, Result};
use crate::ResourceRecord;
use serde_json::Value;

/// Which table shape a decode is targeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableShape {
    /// Latest-state table; keeps `ttl` and `eventSource`.
    Current,
    /// Append-only revision table; never carries expiry or source markers.
    Durable,
}

/// Bookkeeping added by multi-region table replication. Never part of the
/// logical record.
const REPLICATION_FIELDS: [&str; 3] = [
    "aws:rep:deleting",
    "aws:rep:updatetime",
    "aws:rep:updateregion",
];

/// Fields that only make sense in the Current table.
const CURRENT_ONLY_FIELDS: [&str; 2] = ["ttl", "eventSource"];

/// Decode a transport attribute map into a [`ResourceRecord`].
///
/// Fails with [`Error::MalformedRecord`] when `arn` is absent; every other
/// field falls back to an empty default so partial images (e.g. a REMOVE
/// old image with its `eventTime` already dropped) still decode.
pub fn decode(attrs: &AttrMap, shape: TableShape) -> Result<ResourceRecord> {
    let mut map = attrs_to_json(attrs);

    for field in REPLICATION_FIELDS {
        map.remove(field);
    }
    if shape == TableShape::Durable {
        for field in CURRENT_ONLY_FIELDS {
            map.remove(field);
        }
    }

    let arn = match map.get("arn").and_then(Value::as_str) {
        Some(arn) if !arn.is_empty() => arn.to_string(),
        _ => return Err(Error::MalformedRecord("arn".into())),
    };

    let mut record = ResourceRecord::new(
        arn,
        take_string(&mut map, "eventTime").unwrap_or_default(),
        take_string(&mut map, "accountId").unwrap_or_default(),
        take_string(&mut map, "region").unwrap_or_default(),
        map.remove("configuration")
            .unwrap_or_else(|| Value::Object(serde_json::Map::new())),
        map.remove("version").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
    );

    if let Some(tags) = map.remove("tags") {
        record.tags = serde_json::from_value(tags).unwrap_or_default();
    }
    record.principal_id = take_string(&mut map, "principalId");
    record.user_identity = map.remove("userIdentity");
    record.user_agent = take_string(&mut map, "userAgent");
    record.source_ip_address = take_string(&mut map, "sourceIpAddress");
    record.request_parameters = map.remove("requestParameters");
    record.event_source = take_string(&mut map, "eventSource");
    record.ttl = map.remove("ttl").and_then(|v| v.as_u64());

    // Anything left over is a technology-specific top-level field; the
    // generic record does not carry those.
    Ok(record)
}

/// Encode a [`ResourceRecord`] into a transport attribute map.
pub fn encode(record: &ResourceRecord) -> AttrMap {
    // The record's serde representation is already the wire field set;
    // a record always serializes to an object.
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => attrs_from_json(&map),
        _ => AttrMap::new(),
    }
}

fn take_string(map: &mut serde_json::Map<String, Value>, key: &str) -> Option<String> {
    match map.remove(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}
