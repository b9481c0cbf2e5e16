//! Change-source events and their classification.
//!
//! Events come from either a polling subsystem or the native change-event
//! stream; both share the same envelope. Classification against a static
//! table of known update event names splits a batch into the update path
//! (describe-and-write) and the delete path (guarded tombstone).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One change-source event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    /// Owning account of the affected resource
    pub account: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Scheduler noise arrives with a detail-type and no usable detail
    #[serde(rename = "detail-type", default, skip_serializing_if = "Option::is_none")]
    pub detail_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<ChangeDetail>,
}

/// The event payload describing what happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeDetail {
    pub event_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_parameters: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_elements: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_identity: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(rename = "sourceIPAddress", default, skip_serializing_if = "Option::is_none")]
    pub source_ip_address: Option<String>,
    /// Present when the originating API call failed; such events are noise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Full configuration already fetched by the poller, sparing a
    /// redundant describe call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collected: Option<Value>,
}

/// Which processing path an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClass {
    Update,
    Delete,
    Skip(SkipReason),
}

/// Why an event was dropped during classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Scheduler noise that should never reach this queue
    Scheduled,
    /// Channel junk without an event payload
    MissingDetail,
    /// The originating API call failed; nothing changed
    ErrorEvent,
}

/// Classify an event against the static update-event-name table.
/// Anything with a usable detail that is not a known update is a delete.
pub fn classify(event: &ChangeEvent, update_events: &[&str]) -> EventClass {
    if event.detail_type.as_deref() == Some("Scheduled Event") {
        return EventClass::Skip(SkipReason::Scheduled);
    }

    let detail = match &event.detail {
        Some(detail) => detail,
        None => return EventClass::Skip(SkipReason::MissingDetail),
    };

    if detail.error_code.is_some() {
        return EventClass::Skip(SkipReason::ErrorEvent);
    }

    if update_events.contains(&detail.event_name.as_str()) {
        EventClass::Update
    } else {
        EventClass::Delete
    }
}

impl ChangeEvent {
    /// Event region with a configured fallback.
    pub fn region_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.region.as_deref().unwrap_or(fallback)
    }

    /// The short principal id from the caller identity.
    pub fn principal_id(&self) -> Option<String> {
        let identity = self.detail.as_ref()?.user_identity.as_ref()?;
        let principal = identity.get("principalId")?.as_str()?;
        // Assumed-role principals look like "AROAEXAMPLE:session"; keep
        // the session part.
        Some(principal.rsplit(':').next().unwrap_or(principal).to_string())
    }

    /// Look up a named field, checking the detail first and then the
    /// request parameters (different API calls put it in different
    /// places), optionally falling back to the response elements.
    pub fn request_parameter(&self, name: &str, look_in_response: bool) -> Option<&Value> {
        let detail = self.detail.as_ref()?;

        if let Some(params) = detail.request_parameters.as_ref() {
            if let Some(value) = params.get(name) {
                return Some(value);
            }
        }

        if look_in_response {
            if let Some(elements) = detail.response_elements.as_ref() {
                if let Some(value) = elements.get(name) {
                    return Some(value);
                }
            }
        }

        None
    }
}
