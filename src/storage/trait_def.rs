use crate::models::LinkRecord;
use crate::storage::LinkKey;
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("link id already exists")]
    Conflict,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Read access to one replica of the link dataset.
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Initialize the storage (create the links table and its indexes)
    async fn init(&self) -> Result<()>;

    /// Find the first row matching every column of the composite key
    async fn find_link(&self, key: &LinkKey) -> Result<Option<LinkRecord>>;

    /// Insert a row as the management application would; used for seeding and fixtures
    async fn insert(&self, link: &LinkRecord) -> StorageResult<()>;
}
