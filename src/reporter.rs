//! Delivery of snapshots to the remote collector

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use tracing::{instrument, trace};

use crate::{
    MetricsSnapshot,
    error::{MonitorError, MonitorResult},
};

/// Anything that can ship a snapshot somewhere
#[async_trait]
pub trait Reporter: Send + Sync {
    async fn send(&self, snapshot: &MetricsSnapshot) -> MonitorResult<()>;
}

/// Reporter that POSTs every snapshot as JSON to the collector endpoint
///
/// The HTTP client is built once and reused for every cycle. Only a `200 OK`
/// counts as delivered.
#[derive(Clone)]
pub struct HttpReporter {
    client: Client,
    endpoint: Url,
    auth_key: String,
}

impl HttpReporter {
    pub fn new(
        endpoint: Url,
        auth_key: impl Into<String>,
        timeout: Duration,
    ) -> MonitorResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            MonitorError::InvalidConfig(format!("failed to build HTTP client: {e}"))
        })?;

        Ok(Self {
            client,
            endpoint,
            auth_key: auth_key.into(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl std::fmt::Debug for HttpReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpReporter")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Reporter for HttpReporter {
    #[instrument(skip_all, fields(endpoint = %self.endpoint))]
    async fn send(&self, snapshot: &MetricsSnapshot) -> MonitorResult<()> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.auth_key)
            .json(snapshot)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(MonitorError::UnexpectedStatus(status.as_u16()));
        }

        trace!("collector accepted snapshot from {}", snapshot.timestamp);
        Ok(())
    }
}
