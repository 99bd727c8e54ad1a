use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::geo::{GeoPoint, IntoCoordinate};
use crate::storage::LinkStore;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegionError {
    #[error("at least one region must be configured")]
    Empty,
    #[error("region '{0}' is configured more than once")]
    Duplicate(String),
    #[error("default region '{0}' is not among the configured regions")]
    UnknownDefault(String),
}

/// One regional replica and its fixed location.
#[derive(Clone)]
pub struct RegionEndpoint {
    pub name: String,
    pub store: Arc<dyn LinkStore>,
    pub location: GeoPoint,
}

impl RegionEndpoint {
    pub fn new(name: impl Into<String>, store: Arc<dyn LinkStore>, location: GeoPoint) -> Self {
        Self {
            name: name.into(),
            store,
            location,
        }
    }
}

impl fmt::Debug for RegionEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionEndpoint")
            .field("name", &self.name)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

/// Process-wide, read-only set of regional replicas.
///
/// Endpoints are kept ordered by name, so ties in [`RegionRegistry::closest`]
/// resolve the same way on every deployment regardless of config order.
#[derive(Debug, Clone)]
pub struct RegionRegistry {
    endpoints: Vec<RegionEndpoint>,
    default_index: usize,
}

// Construction rejects an empty set, so there is no `is_empty`.
#[allow(clippy::len_without_is_empty)]
impl RegionRegistry {
    pub fn new(mut endpoints: Vec<RegionEndpoint>, default_region: &str) -> Result<Self, RegionError> {
        if endpoints.is_empty() {
            return Err(RegionError::Empty);
        }

        let mut seen = HashSet::new();
        for endpoint in &endpoints {
            if !seen.insert(endpoint.name.as_str()) {
                return Err(RegionError::Duplicate(endpoint.name.clone()));
            }
        }

        endpoints.sort_by(|a, b| a.name.cmp(&b.name));

        let default_index = endpoints
            .iter()
            .position(|e| e.name == default_region)
            .ok_or_else(|| RegionError::UnknownDefault(default_region.to_string()))?;

        Ok(Self {
            endpoints,
            default_index,
        })
    }

    /// A registry with a single region, which is also the default.
    pub fn single(endpoint: RegionEndpoint) -> Self {
        Self {
            endpoints: vec![endpoint],
            default_index: 0,
        }
    }

    pub fn default_region(&self) -> &RegionEndpoint {
        &self.endpoints[self.default_index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegionEndpoint> {
        self.endpoints.iter()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// The endpoint nearest to the given coordinates.
    ///
    /// Unparsable coordinates are read as `0`. The first endpoint wins ties.
    pub fn closest(&self, longitude: impl IntoCoordinate, latitude: impl IntoCoordinate) -> &RegionEndpoint {
        let origin = GeoPoint::lenient(longitude, latitude);

        let mut best = &self.endpoints[0];
        let mut best_distance = origin.distance_km(&best.location);

        for endpoint in &self.endpoints[1..] {
            let distance = origin.distance_km(&endpoint.location);
            if distance < best_distance {
                best = endpoint;
                best_distance = distance;
            }
        }

        best
    }

    /// Pick the endpoint for a request.
    ///
    /// Local requests, requests without geolocation and single-region
    /// deployments all use the default region.
    pub fn route(&self, geo: Option<GeoPoint>, is_local: bool) -> &RegionEndpoint {
        if is_local || self.endpoints.len() == 1 {
            return self.default_region();
        }

        match geo {
            Some(point) => self.closest(point.longitude, point.latitude),
            None => self.default_region(),
        }
    }
}
