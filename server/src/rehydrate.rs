//! Rehydration of shrunk stream records.
//!
//! A record whose configuration was stripped in transit carries a marker
//! and just enough identity to look the payload back up. The Current and
//! Durable tables differ in what a miss means: a Current miss is a benign
//! race (the resource was deleted before we got here; a deletion event
//! will supersede this one), while a Durable miss means the revision log
//! lost something it must never lose.

use crate::error::{AppError, Result};
use crate::store::{CurrentStore, DurableStore};
use historical_engine::{Error as EngineError, StreamRecord};

/// Restore a shrunk record's configuration from the Current table.
///
/// Returns false when the Current row is gone; the caller must skip the
/// record, not fail.
pub async fn rehydrate_from_current(
    record: &mut StreamRecord,
    store: &dyn CurrentStore,
) -> Result<bool> {
    if !record.too_big_for_transport {
        return Ok(true);
    }

    let arn = record
        .arn()
        .ok_or_else(|| AppError::Engine(EngineError::MalformedRecord("arn".into())))?
        .to_string();

    match store.get(&arn).await? {
        Some(full) => {
            record.inject_configuration(&full.configuration);
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Restore a shrunk record's configuration from the Durable table.
///
/// The in-process pipeline only ever rehydrates from Current; this is
/// the contract offered to consumers of the forwarded revision stream,
/// who hold shrunk records whose payload lives in the revision log.
/// A miss here is unexpected and fatal for this record (but not for its
/// batch).
pub async fn rehydrate_from_durable(
    record: &mut StreamRecord,
    store: &dyn DurableStore,
) -> Result<()> {
    if !record.too_big_for_transport {
        return Ok(());
    }

    let arn = record
        .arn()
        .ok_or_else(|| AppError::Engine(EngineError::MalformedRecord("arn".into())))?
        .to_string();
    let event_time = record
        .new_image_event_time()
        .ok_or_else(|| AppError::Engine(EngineError::MalformedRecord("eventTime".into())))?
        .to_string();

    match store.get(&arn, &event_time).await? {
        Some(full) => {
            record.inject_configuration(&full.configuration);
            Ok(())
        }
        None => Err(AppError::Engine(EngineError::DurableItemMissing {
            arn,
            event_time,
        })),
    }
}
