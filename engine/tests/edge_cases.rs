//! Edge case tests for historical-engine
//!
//! These tests cover boundary conditions and unusual inputs.

use historical_engine::{
    attrs_from_json, codec, envelope::unwrap_envelope, has_material_change, shrink, AttrValue,
    ResourceRecord, StreamEventName, StreamRecord, TableShape, EPHEMERAL_PATHS,
};
use serde_json::json;

fn sample_record(event_time: &str) -> ResourceRecord {
    ResourceRecord::new(
        "arn:aws:ec2:us-east-1:012345678910:security-group/sg-1234",
        event_time,
        "012345678910",
        "us-east-1",
        json!({"groupId": "sg-1234", "description": "test"}),
        1,
    )
}

// ============================================================================
// Diff Edge Cases
// ============================================================================

#[test]
fn empty_documents_are_equal() {
    assert!(!has_material_change(&json!({}), &json!({}), &[]));
}

#[test]
fn empty_versus_tombstone_null() {
    // An empty configuration and a null configuration are different documents.
    let a = json!({"configuration": {}});
    let b = json!({"configuration": null});
    assert!(has_material_change(&a, &b, &[]));
}

#[test]
fn unicode_values_compare_exactly() {
    let a = json!({"name": "日本語テスト"});
    let b = json!({"name": "日本語テスト"});
    let c = json!({"name": "日本語テス"});
    assert!(!has_material_change(&a, &b, &[]));
    assert!(has_material_change(&a, &c, &[]));
}

#[test]
fn deeply_nested_list_reorder_is_not_a_change() {
    let a = json!({
        "configuration": {
            "statements": [
                {"actions": ["s3:Get*", "s3:List*"], "effect": "Allow"},
                {"actions": ["s3:Put*"], "effect": "Deny"},
            ],
        },
    });
    let b = json!({
        "configuration": {
            "statements": [
                {"actions": ["s3:Put*"], "effect": "Deny"},
                {"actions": ["s3:List*", "s3:Get*"], "effect": "Allow"},
            ],
        },
    });
    assert!(!has_material_change(&a, &b, &[]));
}

#[test]
fn duplicate_list_entries_count() {
    // [x, x] and [x] are different documents even though their sets match.
    let a = json!({"ports": [80, 80]});
    let b = json!({"ports": [80]});
    assert!(has_material_change(&a, &b, &[]));
}

#[test]
fn excluding_a_missing_path_is_harmless() {
    let a = json!({"configuration": {"a": 1}});
    let b = json!({"configuration": {"a": 1}});
    assert!(!has_material_change(&a, &b, &["configuration.nope.deep", "alsoMissing"]));
}

#[test]
fn integer_and_float_forms_differ() {
    let a = json!({"size": 1});
    let b = json!({"size": 1.0});
    assert!(has_material_change(&a, &b, &[]));
}

#[test]
fn default_ephemeral_paths_mask_version_churn() {
    let a = json!({"version": 1, "configuration": {"_version": 7, "name": "x"}});
    let b = json!({"version": 2, "configuration": {"_version": 9, "name": "x"}});
    assert!(!has_material_change(&a, &b, EPHEMERAL_PATHS));
}

// ============================================================================
// Codec Edge Cases
// ============================================================================

#[test]
fn decode_rejects_empty_arn() {
    let attrs = attrs_from_json(
        json!({"arn": "", "eventTime": "2024-03-01T12:00:00Z"})
            .as_object()
            .unwrap(),
    );
    assert!(codec::decode(&attrs, TableShape::Durable).is_err());
}

#[test]
fn decode_tolerates_missing_everything_but_arn() {
    let attrs = attrs_from_json(json!({"arn": "arn:aws:iam::1:role/r"}).as_object().unwrap());
    let record = codec::decode(&attrs, TableShape::Durable).unwrap();
    assert_eq!(record.arn, "arn:aws:iam::1:role/r");
    assert_eq!(record.event_time, "");
    assert!(record.tags.is_empty());
}

#[test]
fn numeric_boundaries_survive_the_wire() {
    let attrs = attrs_from_json(
        json!({
            "arn": "arn:aws:iam::1:role/r",
            "configuration": {
                "max": i64::MAX,
                "min": i64::MIN,
                "big": u64::MAX,
                "frac": 0.5,
            },
        })
        .as_object()
        .unwrap(),
    );
    let record = codec::decode(&attrs, TableShape::Durable).unwrap();
    assert_eq!(record.configuration["max"], json!(i64::MAX));
    assert_eq!(record.configuration["min"], json!(i64::MIN));
    assert_eq!(record.configuration["big"], json!(u64::MAX));
    assert_eq!(record.configuration["frac"], json!(0.5));
}

#[test]
fn null_attribute_round_trips() {
    let attrs = attrs_from_json(
        json!({"arn": "arn:aws:iam::1:role/r", "configuration": {"gone": null}})
            .as_object()
            .unwrap(),
    );
    let record = codec::decode(&attrs, TableShape::Durable).unwrap();
    assert_eq!(record.configuration["gone"], json!(null));

    let encoded = codec::encode(&record);
    let config = match encoded.get("configuration") {
        Some(AttrValue::M(m)) => m,
        other => panic!("expected map, got {:?}", other),
    };
    assert_eq!(config.get("gone"), Some(&AttrValue::Null(true)));
}

#[test]
fn encode_then_decode_preserves_provenance() {
    let mut record = sample_record("2024-03-01T12:00:00Z");
    record.principal_id = Some("AIDAEXAMPLE".into());
    record.user_agent = Some("aws-cli/2.x".into());
    record.source_ip_address = Some("203.0.113.9".into());

    let attrs = codec::encode(&record);
    let decoded = codec::decode(&attrs, TableShape::Durable).unwrap();
    assert_eq!(decoded, record);
}

// ============================================================================
// Shrink Edge Cases
// ============================================================================

fn stream_record(config: serde_json::Value) -> StreamRecord {
    serde_json::from_value(json!({
        "eventName": "MODIFY",
        "dynamodb": {
            "Keys": {"arn": {"S": "arn:aws:iam::1:role/r"}},
            "NewImage": attrs_from_json(
                json!({
                    "arn": "arn:aws:iam::1:role/r",
                    "eventTime": "2024-03-01T12:00:00Z",
                    "configuration": config,
                })
                .as_object()
                .unwrap(),
            ),
        },
    }))
    .unwrap()
}

#[test]
fn small_records_pass_through_unshrunk() {
    let record = stream_record(json!({"name": "tiny"}));
    let before = record.clone();
    let after = shrink::prepare_for_transport(record, usize::MAX, false);
    assert_eq!(after, before);
    assert!(!after.too_big_for_transport);
}

#[test]
fn zero_limit_always_shrinks() {
    let record = stream_record(json!({"name": "tiny"}));
    let after = shrink::prepare_for_transport(record, 0, false);
    assert!(after.too_big_for_transport);
    let image = after.data.new_image.as_ref().unwrap();
    assert!(!image.contains_key("configuration"));
}

#[test]
fn forced_shrink_ignores_size() {
    let record = stream_record(json!({"name": "tiny"}));
    let after = shrink::prepare_for_transport(record, usize::MAX, true);
    assert!(after.too_big_for_transport);
}

#[test]
fn deletion_keeps_tombstone_and_stays_unmarked() {
    // A tombstone has an empty configuration map in its new image.
    let record = stream_record(json!({}));
    assert!(shrink::is_deletion(&record));

    let after = shrink::prepare_for_transport(record, 0, false);
    assert!(!after.too_big_for_transport);
    let image = after.data.new_image.as_ref().unwrap();
    assert!(image.contains_key("configuration"));
}

#[test]
fn inject_configuration_clears_the_marker() {
    let record = stream_record(json!({"name": "big"}));
    let mut shrunk = shrink::prepare_for_transport(record, 0, false);
    assert!(shrunk.too_big_for_transport);

    shrunk.inject_configuration(&json!({"name": "big"}));
    assert!(!shrunk.too_big_for_transport);
    let image = shrunk.data.new_image.as_ref().unwrap();
    assert!(image.contains_key("configuration"));
}

#[test]
fn remove_events_parse_without_a_new_image() {
    let record: StreamRecord = serde_json::from_value(json!({
        "eventName": "REMOVE",
        "dynamodb": {
            "Keys": {"arn": {"S": "arn:aws:iam::1:role/r"}},
            "OldImage": {"arn": {"S": "arn:aws:iam::1:role/r"}},
        },
        "userIdentity": {"type": "Service", "principalId": "dynamodb.amazonaws.com"},
    }))
    .unwrap();
    assert_eq!(record.event_name, StreamEventName::Remove);
    assert!(record.data.new_image.is_none());
    assert_eq!(record.arn(), Some("arn:aws:iam::1:role/r"));
}

// ============================================================================
// Envelope Edge Cases
// ============================================================================

#[test]
fn empty_body_is_discarded() {
    assert!(unwrap_envelope("").is_none());
    assert!(unwrap_envelope("   ").is_none());
}

#[test]
fn top_level_array_is_discarded() {
    assert!(unwrap_envelope("[1, 2, 3]").is_none());
}

#[test]
fn doubly_wrapped_message_unwraps_once() {
    // Only one layer of wrapping is removed; the inner Message key survives.
    let inner = json!({"Message": "{\"eventName\":\"x\"}"}).to_string();
    let outer = json!({"Message": inner}).to_string();
    let unwrapped = unwrap_envelope(&outer).unwrap();
    assert!(unwrapped.get("Message").is_some());
}
