//! Publishing to the next-stage channel.
//!
//! Cross-stage communication is channel-based, so delivery failures are
//! normally handled by host-level redelivery. The only in-process retry
//! loop in the system sits here, at the publish boundary: a bounded
//! number of immediate attempts with exponential backoff before giving
//! up and failing the batch.

use crate::error::{AppError, Result};
use async_trait::async_trait;
use historical_engine::StreamRecord;
use std::time::Duration;

const PUBLISH_ATTEMPTS: u32 = 4;
const BACKOFF_BASE: Duration = Duration::from_millis(100);
const BACKOFF_CAP: Duration = Duration::from_secs(1);

/// Forward a (possibly shrunk) stream record onto the next stage.
#[async_trait]
pub trait Publish: Send + Sync {
    async fn publish(&self, record: &StreamRecord) -> Result<()>;
}

/// Publisher backed by an HTTP channel endpoint.
pub struct HttpPublisher {
    client: reqwest::Client,
    url: String,
}

impl HttpPublisher {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl Publish for HttpPublisher {
    async fn publish(&self, record: &StreamRecord) -> Result<()> {
        let mut backoff = BACKOFF_BASE;

        for attempt in 1..=PUBLISH_ATTEMPTS {
            let result = self.client.post(&self.url).json(record).send().await;

            match result {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response) => {
                    tracing::warn!(
                        attempt,
                        status = %response.status(),
                        "Publish attempt rejected"
                    );
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Publish attempt failed");
                }
            }

            if attempt < PUBLISH_ATTEMPTS {
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(BACKOFF_CAP);
            }
        }

        Err(AppError::PublishExhausted(format!(
            "{} attempts against {}",
            PUBLISH_ATTEMPTS, self.url
        )))
    }
}
