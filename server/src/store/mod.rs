//! Table abstraction over the Current and Durable stores.
//!
//! The Current table holds the latest state per resource and supports the
//! conditional mutations the collector relies on. The Durable table is an
//! append-only revision log keyed by `(arn, event_time)`. Event times are
//! ISO-8601 UTC strings, so lexicographic comparisons in SQL match
//! chronological order.

mod pool;
mod postgres;

#[cfg(test)]
pub mod memory;

pub use pool::{create_pool, run_migrations, Pool};
pub use postgres::{PgCurrentStore, PgDurableStore};

use crate::error::Result;
use async_trait::async_trait;
use historical_engine::ResourceRecord;

/// Latest-state-per-resource table.
#[async_trait]
pub trait CurrentStore: Send + Sync {
    async fn get(&self, arn: &str) -> Result<Option<ResourceRecord>>;

    /// Unconditional last-write-wins upsert.
    async fn put(&self, record: &ResourceRecord) -> Result<()>;

    /// Upsert guarded on `existing.event_time <= record.event_time`.
    /// Returns false when a newer row already exists.
    async fn put_if_not_newer(&self, record: &ResourceRecord) -> Result<bool>;

    /// Delete guarded on `existing.event_time <= event_time`. Returns
    /// false when the row is newer (or already gone).
    async fn delete_if_not_newer(&self, arn: &str, event_time: &str) -> Result<bool>;
}

/// Append-only revision log.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Append a revision. Idempotent on `(arn, event_time)`; returns
    /// false when that revision already exists.
    async fn append(&self, record: &ResourceRecord) -> Result<bool>;

    /// The most recent revision with `event_time <= at`.
    async fn latest_at_or_before(&self, arn: &str, at: &str) -> Result<Option<ResourceRecord>>;

    /// Exact revision lookup, used by durable-side rehydration for
    /// consumers of the forwarded revision stream.
    async fn get(&self, arn: &str, event_time: &str) -> Result<Option<ResourceRecord>>;

    /// Number of revisions recorded for a resource.
    async fn count(&self, arn: &str) -> Result<i64>;
}
