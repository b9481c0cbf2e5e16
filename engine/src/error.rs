//! Error types for the Historical engine.

use crate::{Arn, EventTime};
use thiserror::Error;

/// All possible errors from the Historical engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A transport record is missing a field the pipeline cannot work without.
    /// Records failing this way are poison pills: logged and dropped, never retried.
    #[error("malformed record: missing required field '{0}'")]
    MalformedRecord(String),

    /// A shrunk record pointed at a Durable revision that does not exist.
    /// Fatal for the single message, recoverable for the batch.
    #[error("durable item missing for arn '{arn}' at event time '{event_time}'")]
    DurableItemMissing { arn: Arn, event_time: EventTime },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::MalformedRecord("arn".into());
        assert_eq!(
            err.to_string(),
            "malformed record: missing required field 'arn'"
        );

        let err = Error::DurableItemMissing {
            arn: "arn:aws:s3:::bucket".into(),
            event_time: "2024-01-01T00:00:00Z".into(),
        };
        assert_eq!(
            err.to_string(),
            "durable item missing for arn 'arn:aws:s3:::bucket' at event time '2024-01-01T00:00:00Z'"
        );
    }
}
