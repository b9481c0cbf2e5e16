//! The canonical resource record.
//!
//! One `ResourceRecord` describes one cloud resource at one point in time.
//! The same shape is written to both tables: the Current table keeps the
//! latest record per `arn` (with a `ttl`), the Durable table keeps the
//! append-only revision history keyed by `(arn, event_time)`.

use crate::{AccountId, Arn, EventTime, RegionName, SchemaVersion};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A point-in-time description of a cloud resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecord {
    /// Globally unique resource identifier (primary key everywhere)
    pub arn: Arn,
    /// When the observed change occurred, ISO-8601 UTC. Range key in the
    /// Durable table; lexicographic order equals chronological order.
    pub event_time: EventTime,
    /// Owning account
    pub account_id: AccountId,
    /// Region the resource lives in
    pub region: RegionName,
    /// The resource's full provider-side description. An empty map is a
    /// deletion tombstone.
    pub configuration: Value,
    /// Resource tags
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// Principal that caused the change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<String>,
    /// Full identity document of the caller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_identity: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ip_address: Option<String>,
    /// Raw request parameters from the originating API call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_parameters: Option<Value>,
    /// Origin of the event (poller or native event stream). Current table only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_source: Option<String>,
    /// Schema version of the `configuration` shape
    #[serde(default)]
    pub version: SchemaVersion,
    /// Absolute expiry in epoch seconds. Current table only; Durable
    /// records never expire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
}

impl ResourceRecord {
    /// Create a record with the required fields; provenance starts empty.
    pub fn new(
        arn: impl Into<Arn>,
        event_time: impl Into<EventTime>,
        account_id: impl Into<AccountId>,
        region: impl Into<RegionName>,
        configuration: Value,
        version: SchemaVersion,
    ) -> Self {
        Self {
            arn: arn.into(),
            event_time: event_time.into(),
            account_id: account_id.into(),
            region: region.into(),
            configuration,
            tags: BTreeMap::new(),
            principal_id: None,
            user_identity: None,
            user_agent: None,
            source_ip_address: None,
            request_parameters: None,
            event_source: None,
            version,
            ttl: None,
        }
    }

    /// An empty configuration map marks a deletion tombstone.
    pub fn is_tombstone(&self) -> bool {
        match &self.configuration {
            Value::Object(map) => map.is_empty(),
            Value::Null => true,
            _ => false,
        }
    }

    /// Turn this record into a deletion tombstone, keeping every field the
    /// delete event did not supply so the revision history stays complete.
    pub fn mark_deleted(
        &mut self,
        event_time: impl Into<EventTime>,
        principal_id: Option<String>,
        user_identity: Option<Value>,
    ) {
        self.configuration = Value::Object(Map::new());
        self.event_time = event_time.into();
        if principal_id.is_some() {
            self.principal_id = principal_id;
        }
        if user_identity.is_some() {
            self.user_identity = user_identity;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ResourceRecord {
        ResourceRecord::new(
            "arn:aws:s3:::test-bucket",
            "2024-03-01T10:00:00Z",
            "123456789012",
            "us-east-1",
            json!({"Name": "test-bucket", "Policy": null}),
            9,
        )
    }

    #[test]
    fn create_record() {
        let record = sample();
        assert_eq!(record.arn, "arn:aws:s3:::test-bucket");
        assert_eq!(record.event_time, "2024-03-01T10:00:00Z");
        assert_eq!(record.version, 9);
        assert!(!record.is_tombstone());
        assert!(record.ttl.is_none());
    }

    #[test]
    fn tombstone_detection() {
        let mut record = sample();
        assert!(!record.is_tombstone());

        record.configuration = json!({});
        assert!(record.is_tombstone());
    }

    #[test]
    fn mark_deleted_blanks_configuration_and_keeps_identity() {
        let mut record = sample();
        record.principal_id = Some("original-principal".into());
        record.tags.insert("team".into(), "infra".into());

        record.mark_deleted("2024-03-01T11:00:00Z", None, None);

        assert!(record.is_tombstone());
        assert_eq!(record.event_time, "2024-03-01T11:00:00Z");
        // Fields the delete event did not supply are preserved.
        assert_eq!(record.principal_id.as_deref(), Some("original-principal"));
        assert_eq!(record.tags.get("team").map(String::as_str), Some("infra"));
    }

    #[test]
    fn mark_deleted_overrides_provenance_when_supplied() {
        let mut record = sample();
        record.principal_id = Some("creator".into());

        record.mark_deleted(
            "2024-03-01T11:00:00Z",
            Some("deleter".into()),
            Some(json!({"type": "IAMUser"})),
        );

        assert_eq!(record.principal_id.as_deref(), Some("deleter"));
        assert_eq!(record.user_identity, Some(json!({"type": "IAMUser"})));
    }

    #[test]
    fn serialization_roundtrip() {
        let mut record = sample();
        record.ttl = Some(1_709_400_000);
        record.event_source = Some("aws.s3".into());

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"eventTime\""));
        assert!(json.contains("\"accountId\""));

        let parsed: ResourceRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, parsed);
    }

    #[test]
    fn optional_fields_are_omitted() {
        let record = sample();
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("principalId"));
        assert!(!json.contains("\"ttl\""));
    }
}
