//! In-memory stores for handler tests.
//!
//! Same contracts as the PostgreSQL implementations, including the
//! event-time guards, so the batch handlers can be exercised without a
//! database.

use super::{CurrentStore, DurableStore};
use crate::error::Result;
use async_trait::async_trait;
use historical_engine::ResourceRecord;
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryCurrentStore {
    rows: Mutex<BTreeMap<String, ResourceRecord>>,
}

impl MemoryCurrentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CurrentStore for MemoryCurrentStore {
    async fn get(&self, arn: &str) -> Result<Option<ResourceRecord>> {
        Ok(self.rows.lock().unwrap().get(arn).cloned())
    }

    async fn put(&self, record: &ResourceRecord) -> Result<()> {
        self.rows
            .lock()
            .unwrap()
            .insert(record.arn.clone(), record.clone());
        Ok(())
    }

    async fn put_if_not_newer(&self, record: &ResourceRecord) -> Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(existing) = rows.get(&record.arn) {
            if existing.event_time > record.event_time {
                return Ok(false);
            }
        }
        rows.insert(record.arn.clone(), record.clone());
        Ok(true)
    }

    async fn delete_if_not_newer(&self, arn: &str, event_time: &str) -> Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        match rows.get(arn) {
            Some(existing) if existing.event_time.as_str() <= event_time => {
                rows.remove(arn);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct MemoryDurableStore {
    rows: Mutex<BTreeMap<(String, String), ResourceRecord>>,
}

impl MemoryDurableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All revisions for a resource in event-time order.
    pub fn revisions(&self, arn: &str) -> Vec<ResourceRecord> {
        self.rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.arn == arn)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl DurableStore for MemoryDurableStore {
    async fn append(&self, record: &ResourceRecord) -> Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        let key = (record.arn.clone(), record.event_time.clone());
        if rows.contains_key(&key) {
            return Ok(false);
        }
        rows.insert(key, record.clone());
        Ok(true)
    }

    async fn latest_at_or_before(&self, arn: &str, at: &str) -> Result<Option<ResourceRecord>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.arn == arn && r.event_time.as_str() <= at)
            .max_by(|a, b| a.event_time.cmp(&b.event_time))
            .cloned())
    }

    async fn get(&self, arn: &str, event_time: &str) -> Result<Option<ResourceRecord>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .get(&(arn.to_string(), event_time.to_string()))
            .cloned())
    }

    async fn count(&self, arn: &str) -> Result<i64> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.arn == arn)
            .count() as i64)
    }
}
