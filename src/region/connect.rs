use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use super::{GeoPoint, RegionEndpoint, RegionRegistry};
use crate::config::{DatabaseBackend, RegionConfig, RegionsConfig};
use crate::storage::{LinkStore, PostgresStorage, SqliteStorage};

/// Open a store for every configured region and build the registry.
pub async fn connect_regions(config: &RegionsConfig, max_connections: u32) -> Result<RegionRegistry> {
    let mut endpoints = Vec::with_capacity(config.regions.len());

    for region in &config.regions {
        let store = connect_store(region, max_connections)
            .await
            .with_context(|| format!("failed to connect region '{}'", region.name))?;

        info!(
            region = %region.name,
            backend = ?region.backend(),
            lazy = region.lazy,
            latitude = region.latitude,
            longitude = region.longitude,
            "Region configured"
        );

        endpoints.push(RegionEndpoint::new(
            region.name.clone(),
            store,
            GeoPoint::new(region.latitude, region.longitude),
        ));
    }

    Ok(RegionRegistry::new(endpoints, &config.default_region)?)
}

async fn connect_store(region: &RegionConfig, max_connections: u32) -> Result<Arc<dyn LinkStore>> {
    let store: Arc<dyn LinkStore> = match (region.backend(), region.lazy) {
        (DatabaseBackend::Sqlite, false) => {
            Arc::new(SqliteStorage::new(&region.url, max_connections).await?)
        }
        (DatabaseBackend::Sqlite, true) => {
            Arc::new(SqliteStorage::new_lazy(&region.url, max_connections)?)
        }
        (DatabaseBackend::Postgres, false) => {
            Arc::new(PostgresStorage::new(&region.url, max_connections).await?)
        }
        (DatabaseBackend::Postgres, true) => {
            Arc::new(PostgresStorage::new_lazy(&region.url, max_connections)?)
        }
    };
    Ok(store)
}
