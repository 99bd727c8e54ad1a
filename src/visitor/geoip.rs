//! GeoIP lookup service using a MaxMind GeoLite2/GeoIP2 City MMDB
//!
//! Used when the edge in front of the service does not already supply
//! geolocation headers.

use anyhow::{Context, Result};
use maxminddb::{geoip2, Mmap, Reader};
use std::net::IpAddr;
use std::sync::Arc;

use super::context::VisitorGeo;

/// Thread-safe, memory-mapped City database reader
#[derive(Clone)]
pub struct GeoIpService {
    city_reader: Option<Arc<Reader<Mmap>>>,
}

impl GeoIpService {
    /// Create a new GeoIP service from an optional City database path
    pub fn new(city_path: Option<&str>) -> Result<Self> {
        let city_reader = if let Some(path) = city_path {
            let reader = unsafe { Reader::open_mmap(path) }
                .with_context(|| format!("Failed to open GeoIP City database at {}", path))?;
            Some(Arc::new(reader))
        } else {
            None
        };

        Ok(Self { city_reader })
    }

    pub fn is_enabled(&self) -> bool {
        self.city_reader.is_some()
    }

    /// Lookup coordinates and place names for an IP address
    ///
    /// Returns an empty `VisitorGeo` when the address is unknown or no
    /// database is loaded.
    pub fn lookup(&self, ip: IpAddr) -> VisitorGeo {
        let mut geo = VisitorGeo::default();

        let Some(reader) = self.city_reader.as_ref() else {
            return geo;
        };

        if let Ok(result) = reader.lookup(ip) {
            if let Ok(Some(city)) = result.decode::<geoip2::City>() {
                geo.latitude = city.location.latitude;
                geo.longitude = city.location.longitude;
                geo.country = city.country.iso_code.map(|s| s.to_string());
                geo.region = city
                    .subdivisions
                    .first()
                    .and_then(|subdivision| subdivision.iso_code)
                    .map(|s| s.to_string());
                geo.city = city.city.names.english.map(|s| s.to_string());
            }
        }

        geo
    }
}
