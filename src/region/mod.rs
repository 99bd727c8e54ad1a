//! Regional replica selection
//!
//! Each region is a read replica of the link dataset pinned to a fixed
//! location. Requests are served by the replica nearest to the visitor.

pub mod connect;
pub mod geo;
pub mod registry;

pub use connect::connect_regions;
pub use geo::{haversine_km, GeoPoint, IntoCoordinate, EARTH_RADIUS_KM};
pub use registry::{RegionEndpoint, RegionError, RegionRegistry};
