use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use super::models::AnalyticsEvent;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("request to ingestion endpoint failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("ingestion endpoint responded with status {0}")]
    Status(u16),
}

/// Destination for analytics events
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn send(&self, event: &AnalyticsEvent) -> Result<(), SinkError>;
}

/// Posts each event as JSON to a fixed ingestion URL
pub struct HttpEventSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpEventSink {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl EventSink for HttpEventSink {
    async fn send(&self, event: &AnalyticsEvent) -> Result<(), SinkError> {
        let response = self.client.post(&self.endpoint).json(event).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::Status(status.as_u16()));
        }

        Ok(())
    }
}
