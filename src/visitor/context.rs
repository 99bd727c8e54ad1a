use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use super::user_agent::UserAgentInfo;
use crate::region::GeoPoint;
use crate::storage::LinkKey;

/// Visitor platform used to pick a deep-link strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
    #[default]
    Web,
}

impl Platform {
    /// Classify from parsed OS and browser names and the raw user agent.
    pub fn detect(os: Option<&str>, browser: Option<&str>, user_agent: &str) -> Self {
        let os = os.unwrap_or_default().to_lowercase();
        let browser = browser.unwrap_or_default().to_lowercase();
        let ua = user_agent.to_lowercase();

        if os.contains("ios")
            || browser.contains("mobile safari")
            || ua.contains("iphone")
            || ua.contains("ipad")
        {
            Platform::Ios
        } else if os.contains("android") {
            Platform::Android
        } else {
            Platform::Web
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
            Platform::Web => "web",
        }
    }
}

/// Geographic information about the visitor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisitorGeo {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
}

impl VisitorGeo {
    /// Coordinates, when both halves are known.
    pub fn point(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint::new(latitude, longitude)),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &VisitorGeo::default()
    }
}

/// Routing keys derived from hostname, path or local query parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingKeys {
    pub handle: Option<String>,
    pub slug: Option<String>,
    pub app: Option<String>,
    pub app_route: Option<String>,
    pub app_id: Option<String>,
}

impl RoutingKeys {
    /// The composite lookup key, or `None` without a tenant handle.
    pub fn link_key(&self) -> Option<LinkKey> {
        let handle = self.handle.as_deref()?;

        Some(match self.slug.as_deref() {
            Some(slug) => LinkKey::for_slug(handle, slug),
            None => LinkKey::for_app_route(
                handle,
                self.app.as_deref(),
                self.app_route.as_deref(),
                self.app_id.as_deref(),
            ),
        })
    }
}

/// Everything known about one inbound request. Built at request start and
/// dropped when the response is sent.
#[derive(Debug, Clone, Default)]
pub struct VisitorContext {
    pub keys: RoutingKeys,
    pub origin: String,
    pub pathname: String,
    pub request_url: String,
    pub is_local: bool,

    pub ip: Option<IpAddr>,
    pub geo: VisitorGeo,
    pub user_agent: Option<String>,
    pub agent: UserAgentInfo,
    pub platform: Platform,
    pub is_bot: bool,
}

impl VisitorContext {
    pub fn has_handle(&self) -> bool {
        self.keys.handle.is_some()
    }

    /// True when the path has at least one segment beyond `/`.
    pub fn has_path(&self) -> bool {
        self.pathname.split('/').any(|segment| !segment.is_empty())
    }

    pub fn first_segment(&self) -> Option<&str> {
        self.pathname.split('/').find(|segment| !segment.is_empty())
    }
}
