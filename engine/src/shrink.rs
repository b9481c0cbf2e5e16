//! Size-aware shrink protocol for change-stream records.
//!
//! Records crossing a size-constrained channel must stay under the channel
//! ceiling. The bulky `configuration` payload is stripped out and replaced
//! by a marker (`tooBigForTransport`) telling the consumer to rehydrate it
//! from the Current or Durable table.

use crate::attribute::{AttrMap, AttrValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default channel budget: stay safely below the 256 KiB pub/sub ceiling.
pub const DEFAULT_SIZE_LIMIT: usize = 200 * 1024;

/// Kind of mutation a change-stream record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StreamEventName {
    Insert,
    Modify,
    Remove,
}

/// The table-image portion of a change-stream record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamData {
    #[serde(rename = "Keys")]
    pub keys: AttrMap,
    #[serde(rename = "NewImage", default, skip_serializing_if = "Option::is_none")]
    pub new_image: Option<AttrMap>,
    #[serde(rename = "OldImage", default, skip_serializing_if = "Option::is_none")]
    pub old_image: Option<AttrMap>,
}

/// One Current-table mutation as delivered on the change stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRecord {
    pub event_name: StreamEventName,
    #[serde(rename = "dynamodb")]
    pub data: StreamData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_identity: Option<Value>,
    /// Set when the configuration payload was stripped in transit and must
    /// be rehydrated before use.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub too_big_for_transport: bool,
}

impl StreamRecord {
    /// The resource identifier from the key image.
    pub fn arn(&self) -> Option<&str> {
        self.data.keys.get("arn").and_then(AttrValue::as_str)
    }

    /// The event time of the new image, when present.
    pub fn new_image_event_time(&self) -> Option<&str> {
        self.data
            .new_image
            .as_ref()
            .and_then(|img| img.get("eventTime"))
            .and_then(AttrValue::as_str)
    }

    /// Put a rehydrated configuration payload back into the new image and
    /// clear the marker.
    pub fn inject_configuration(&mut self, configuration: &Value) {
        if let Some(image) = self.data.new_image.as_mut() {
            image.insert("configuration".into(), AttrValue::from_json(configuration));
        }
        self.too_big_for_transport = false;
    }
}

/// Serialized size of a record on the wire.
pub fn encoded_size(record: &StreamRecord) -> usize {
    // A StreamRecord always serializes; usize::MAX keeps the failure path
    // on the shrink side if it somehow does not.
    serde_json::to_vec(record).map(|v| v.len()).unwrap_or(usize::MAX)
}

/// A deletion writes a tombstone into the Current table first, so its new
/// image carries an empty (or missing) configuration map.
pub fn is_deletion(record: &StreamRecord) -> bool {
    match record.data.new_image.as_ref() {
        Some(image) => match image.get("configuration") {
            Some(AttrValue::M(map)) => map.is_empty(),
            _ => true,
        },
        None => false,
    }
}

/// Enforce the channel size budget on a record.
///
/// Shrinks when the encoded record reaches `limit` or when `force` is set
/// (fixed small-batch channels shrink unconditionally). Deletions keep
/// their new image intact: the tombstone is already small and the consumer
/// needs it to recognize the deletion, so only the old image is stripped
/// and the rehydration marker stays unset.
pub fn prepare_for_transport(mut record: StreamRecord, limit: usize, force: bool) -> StreamRecord {
    if !force && encoded_size(&record) < limit {
        return record;
    }

    let deletion = is_deletion(&record);

    if !deletion {
        if let Some(image) = record.data.new_image.as_mut() {
            image.remove("configuration");
        }
    }
    if let Some(image) = record.data.old_image.as_mut() {
        image.remove("configuration");
    }

    record.too_big_for_transport = !deletion;
    record
}
