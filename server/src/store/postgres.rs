//! PostgreSQL implementations of the Current and Durable stores.

use super::{CurrentStore, DurableStore};
use crate::error::Result;
use async_trait::async_trait;
use historical_engine::ResourceRecord;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::collections::BTreeMap;

/// A stored record row from either table.
#[derive(Debug)]
struct StoredRecord {
    arn: String,
    event_time: String,
    account_id: String,
    region: String,
    configuration: serde_json::Value,
    tags: Json<BTreeMap<String, String>>,
    principal_id: Option<String>,
    user_identity: Option<serde_json::Value>,
    user_agent: Option<String>,
    source_ip_address: Option<String>,
    request_parameters: Option<serde_json::Value>,
    event_source: Option<String>,
    version: i32,
    ttl: Option<i64>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredRecord {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(StoredRecord {
            arn: row.try_get("arn")?,
            event_time: row.try_get("event_time")?,
            account_id: row.try_get("account_id")?,
            region: row.try_get("region")?,
            configuration: row.try_get("configuration")?,
            tags: row.try_get("tags")?,
            principal_id: row.try_get("principal_id")?,
            user_identity: row.try_get("user_identity")?,
            user_agent: row.try_get("user_agent")?,
            source_ip_address: row.try_get("source_ip_address")?,
            request_parameters: row.try_get("request_parameters")?,
            event_source: row.try_get("event_source")?,
            version: row.try_get("version")?,
            ttl: row.try_get("ttl")?,
        })
    }
}

impl StoredRecord {
    /// Convert a database row into an engine record.
    fn into_record(self) -> ResourceRecord {
        let mut record = ResourceRecord::new(
            self.arn,
            self.event_time,
            self.account_id,
            self.region,
            self.configuration,
            self.version as u32,
        );
        record.tags = self.tags.0;
        record.principal_id = self.principal_id;
        record.user_identity = self.user_identity;
        record.user_agent = self.user_agent;
        record.source_ip_address = self.source_ip_address;
        record.request_parameters = self.request_parameters;
        record.event_source = self.event_source;
        record.ttl = self.ttl.map(|t| t as u64);
        record
    }
}

const RECORD_COLUMNS: &str = "arn, event_time, account_id, region, configuration, tags, \
     principal_id, user_identity, user_agent, source_ip_address, \
     request_parameters, event_source, version, ttl";

/// Current table backed by PostgreSQL.
#[derive(Clone)]
pub struct PgCurrentStore {
    pool: PgPool,
}

impl PgCurrentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CurrentStore for PgCurrentStore {
    async fn get(&self, arn: &str) -> Result<Option<ResourceRecord>> {
        let row = sqlx::query_as::<_, StoredRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM current_records WHERE arn = $1"
        ))
        .bind(arn)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(StoredRecord::into_record))
    }

    async fn put(&self, record: &ResourceRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO current_records (
                arn, event_time, account_id, region, configuration, tags,
                principal_id, user_identity, user_agent, source_ip_address,
                request_parameters, event_source, version, ttl
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (arn) DO UPDATE SET
                event_time = EXCLUDED.event_time,
                account_id = EXCLUDED.account_id,
                region = EXCLUDED.region,
                configuration = EXCLUDED.configuration,
                tags = EXCLUDED.tags,
                principal_id = EXCLUDED.principal_id,
                user_identity = EXCLUDED.user_identity,
                user_agent = EXCLUDED.user_agent,
                source_ip_address = EXCLUDED.source_ip_address,
                request_parameters = EXCLUDED.request_parameters,
                event_source = EXCLUDED.event_source,
                version = EXCLUDED.version,
                ttl = EXCLUDED.ttl
            "#,
        )
        .bind(&record.arn)
        .bind(&record.event_time)
        .bind(&record.account_id)
        .bind(&record.region)
        .bind(&record.configuration)
        .bind(Json(&record.tags))
        .bind(&record.principal_id)
        .bind(&record.user_identity)
        .bind(&record.user_agent)
        .bind(&record.source_ip_address)
        .bind(&record.request_parameters)
        .bind(&record.event_source)
        .bind(record.version as i32)
        .bind(record.ttl.map(|t| t as i64))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn put_if_not_newer(&self, record: &ResourceRecord) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO current_records (
                arn, event_time, account_id, region, configuration, tags,
                principal_id, user_identity, user_agent, source_ip_address,
                request_parameters, event_source, version, ttl
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (arn) DO UPDATE SET
                event_time = EXCLUDED.event_time,
                account_id = EXCLUDED.account_id,
                region = EXCLUDED.region,
                configuration = EXCLUDED.configuration,
                tags = EXCLUDED.tags,
                principal_id = EXCLUDED.principal_id,
                user_identity = EXCLUDED.user_identity,
                user_agent = EXCLUDED.user_agent,
                source_ip_address = EXCLUDED.source_ip_address,
                request_parameters = EXCLUDED.request_parameters,
                event_source = EXCLUDED.event_source,
                version = EXCLUDED.version,
                ttl = EXCLUDED.ttl
            WHERE current_records.event_time <= EXCLUDED.event_time
            "#,
        )
        .bind(&record.arn)
        .bind(&record.event_time)
        .bind(&record.account_id)
        .bind(&record.region)
        .bind(&record.configuration)
        .bind(Json(&record.tags))
        .bind(&record.principal_id)
        .bind(&record.user_identity)
        .bind(&record.user_agent)
        .bind(&record.source_ip_address)
        .bind(&record.request_parameters)
        .bind(&record.event_source)
        .bind(record.version as i32)
        .bind(record.ttl.map(|t| t as i64))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_if_not_newer(&self, arn: &str, event_time: &str) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM current_records WHERE arn = $1 AND event_time <= $2")
                .bind(arn)
                .bind(event_time)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Durable revision log backed by PostgreSQL.
#[derive(Clone)]
pub struct PgDurableStore {
    pool: PgPool,
}

impl PgDurableStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DurableStore for PgDurableStore {
    async fn append(&self, record: &ResourceRecord) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO durable_records (
                arn, event_time, account_id, region, configuration, tags,
                principal_id, user_identity, user_agent, source_ip_address,
                request_parameters, event_source, version, ttl
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NULL, $12, NULL)
            ON CONFLICT (arn, event_time) DO NOTHING
            "#,
        )
        .bind(&record.arn)
        .bind(&record.event_time)
        .bind(&record.account_id)
        .bind(&record.region)
        .bind(&record.configuration)
        .bind(Json(&record.tags))
        .bind(&record.principal_id)
        .bind(&record.user_identity)
        .bind(&record.user_agent)
        .bind(&record.source_ip_address)
        .bind(&record.request_parameters)
        .bind(record.version as i32)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn latest_at_or_before(&self, arn: &str, at: &str) -> Result<Option<ResourceRecord>> {
        let row = sqlx::query_as::<_, StoredRecord>(&format!(
            r#"
            SELECT {RECORD_COLUMNS} FROM durable_records
            WHERE arn = $1 AND event_time <= $2
            ORDER BY event_time DESC
            LIMIT 1
            "#
        ))
        .bind(arn)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(StoredRecord::into_record))
    }

    async fn get(&self, arn: &str, event_time: &str) -> Result<Option<ResourceRecord>> {
        let row = sqlx::query_as::<_, StoredRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM durable_records WHERE arn = $1 AND event_time = $2"
        ))
        .bind(arn)
        .bind(event_time)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(StoredRecord::into_record))
    }

    async fn count(&self, arn: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM durable_records WHERE arn = $1")
            .bind(arn)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
