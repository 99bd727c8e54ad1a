//! Composite-key link resolution against one regional replica
//!
//! The lookup is the only awaited step on the redirect path, so it runs under
//! a deadline. A resolution miss is `Ok(None)`; infrastructure trouble is a
//! [`ResolveError`] the caller logs separately before degrading to not-found.

use std::time::Duration;
use thiserror::Error;

use crate::models::LinkRecord;
use crate::region::RegionEndpoint;
use crate::storage::LinkKey;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("lookup in region '{region}' timed out after {timeout:?}")]
    Timeout { region: String, timeout: Duration },
    #[error("lookup in region '{region}' failed: {error:#}")]
    Backend { region: String, error: anyhow::Error },
}

impl ResolveError {
    /// Short label for logs and response headers
    pub fn kind(&self) -> &'static str {
        match self {
            ResolveError::Timeout { .. } => "timeout",
            ResolveError::Backend { .. } => "backend",
        }
    }

    pub fn region(&self) -> &str {
        match self {
            ResolveError::Timeout { region, .. } | ResolveError::Backend { region, .. } => region,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LinkResolver {
    timeout: Duration,
}

impl LinkResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Look up the first usable record for `key` in `endpoint`.
    ///
    /// Rows without a destination URL count as not found.
    pub async fn resolve(
        &self,
        endpoint: &RegionEndpoint,
        key: &LinkKey,
    ) -> Result<Option<LinkRecord>, ResolveError> {
        let lookup = endpoint.store.find_link(key);

        match tokio::time::timeout(self.timeout, lookup).await {
            Ok(Ok(link)) => Ok(link.filter(LinkRecord::is_usable)),
            Ok(Err(error)) => Err(ResolveError::Backend {
                region: endpoint.name.clone(),
                error,
            }),
            Err(_) => Err(ResolveError::Timeout {
                region: endpoint.name.clone(),
                timeout: self.timeout,
            }),
        }
    }
}
