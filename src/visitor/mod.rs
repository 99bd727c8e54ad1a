//! Per-request visitor context
//!
//! Routing keys come from the hostname and path (or query parameters when
//! running on localhost); visitor metadata comes from proxy headers, edge
//! geolocation headers or a GeoIP database, and the user agent.

pub mod client_ip;
pub mod context;
pub mod extractor;
pub mod geoip;
pub mod user_agent;

pub use client_ip::{anonymize_ip, extract_client_ip};
pub use context::{Platform, RoutingKeys, VisitorContext, VisitorGeo};
pub use extractor::VisitorContextExtractor;
pub use geoip::GeoIpService;
pub use user_agent::{DeviceType, UserAgentInfo};
