//! External describe collaborator.
//!
//! Resolving the full configuration of a resource is delegated to an
//! external describe service. A vanished resource (404) and an
//! inaccessible one (403) are both "skip, do not write" outcomes for the
//! collector; only the logging severity differs.

use crate::error::Result;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;

/// Outcome of a describe call.
#[derive(Debug, Clone, PartialEq)]
pub enum DescribeOutcome {
    Found(Value),
    NotFound,
    AccessDenied,
}

/// Resolve the current full configuration of one resource.
#[async_trait]
pub trait Describe: Send + Sync {
    async fn describe(
        &self,
        account_id: &str,
        region: &str,
        resource_key: &Value,
    ) -> Result<DescribeOutcome>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DescribeRequest<'a> {
    account_id: &'a str,
    region: &'a str,
    resource_key: &'a Value,
}

/// Describe backed by an HTTP service.
pub struct HttpDescriber {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDescriber {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl Describe for HttpDescriber {
    async fn describe(
        &self,
        account_id: &str,
        region: &str,
        resource_key: &Value,
    ) -> Result<DescribeOutcome> {
        let response = self
            .client
            .post(&self.base_url)
            .json(&DescribeRequest {
                account_id,
                region,
                resource_key,
            })
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(DescribeOutcome::NotFound),
            StatusCode::FORBIDDEN => Ok(DescribeOutcome::AccessDenied),
            _ => {
                // Any other failure is systemic and fails the batch.
                let configuration = response.error_for_status()?.json().await?;
                Ok(DescribeOutcome::Found(configuration))
            }
        }
    }
}
