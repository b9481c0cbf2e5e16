//! Transport envelope unwrapping.
//!
//! Messages arrive from at-least-once channels as JSON bodies, sometimes
//! double-wrapped in a pub/sub notification envelope (`{"Message":
//! "<json>"}`). Control messages (subscription confirmations and other
//! junk) are not records and are discarded silently.

use serde_json::Value;

/// Unwrap one message body into the record payload it carries.
///
/// Returns `None` for non-JSON bodies, control messages, and anything
/// that does not unwrap to a JSON object.
pub fn unwrap_envelope(body: &str) -> Option<Value> {
    let outer: Value = serde_json::from_str(body).ok()?;

    // Pub/sub notification envelope: the real record is a JSON string
    // under "Message". Confirmation messages carry non-JSON text there
    // and fall out naturally.
    if let Some(inner) = outer.get("Message").and_then(Value::as_str) {
        let value: Value = serde_json::from_str(inner).ok()?;
        return value.is_object().then_some(value);
    }

    outer.is_object().then_some(outer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_json_object_passes_through() {
        let body = r#"{"eventName": "INSERT"}"#;
        assert_eq!(unwrap_envelope(body), Some(json!({"eventName": "INSERT"})));
    }

    #[test]
    fn notification_envelope_is_unwrapped() {
        let body = r#"{"Type": "Notification", "Message": "{\"eventName\": \"MODIFY\"}"}"#;
        assert_eq!(unwrap_envelope(body), Some(json!({"eventName": "MODIFY"})));
    }

    #[test]
    fn subscription_confirmation_is_discarded() {
        let body = r#"{"Type": "SubscriptionConfirmation", "Message": "You have chosen to subscribe..."}"#;
        assert_eq!(unwrap_envelope(body), None);
    }

    #[test]
    fn non_json_body_is_discarded() {
        assert_eq!(unwrap_envelope("not json at all"), None);
        assert_eq!(unwrap_envelope(""), None);
    }

    #[test]
    fn non_object_json_is_discarded() {
        assert_eq!(unwrap_envelope("42"), None);
        assert_eq!(unwrap_envelope(r#"["a", "b"]"#), None);
        assert_eq!(unwrap_envelope(r#"{"Message": "[1, 2]"}"#), None);
    }
}
