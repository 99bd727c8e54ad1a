use axum::extract::Query;
use axum::http::{header, HeaderMap, Uri};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use super::client_ip::extract_client_ip;
use super::context::{Platform, RoutingKeys, VisitorContext, VisitorGeo};
use super::geoip::GeoIpService;
use super::user_agent;
use crate::config::{TrustedProxyMode, VisitorConfig};
use crate::region::IntoCoordinate;

/// Header names an edge network uses to pass visitor geolocation along.
struct GeoHeaders {
    latitude: &'static str,
    longitude: &'static str,
    city: &'static str,
    region: &'static str,
    country: &'static str,
}

const GEO_HEADER_SETS: &[GeoHeaders] = &[
    GeoHeaders {
        latitude: "x-vercel-ip-latitude",
        longitude: "x-vercel-ip-longitude",
        city: "x-vercel-ip-city",
        region: "x-vercel-ip-country-region",
        country: "x-vercel-ip-country",
    },
    GeoHeaders {
        latitude: "cf-iplatitude",
        longitude: "cf-iplongitude",
        city: "cf-ipcity",
        region: "cf-region-code",
        country: "cf-ipcountry",
    },
];

/// Turns an inbound request into a [`VisitorContext`].
pub struct VisitorContextExtractor {
    config: VisitorConfig,
    geoip: Option<Arc<GeoIpService>>,
}

impl VisitorContextExtractor {
    pub fn new(config: VisitorConfig, geoip: Option<Arc<GeoIpService>>) -> Self {
        Self { config, geoip }
    }

    pub fn parse(&self, uri: &Uri, headers: &HeaderMap, socket_ip: IpAddr) -> VisitorContext {
        let proto = self.protocol(uri, headers);
        let host = self.host(uri, headers);
        let hostname = strip_port(&host).to_lowercase();
        let is_local = proto == "http" && hostname == "localhost";

        let origin = format!("{proto}://{host}");
        let pathname = uri.path().to_string();
        let request_url = match uri.path_and_query() {
            Some(pq) => format!("{origin}{pq}"),
            None => format!("{origin}{pathname}"),
        };

        let keys = if is_local {
            let params = Query::<HashMap<String, String>>::try_from_uri(uri)
                .map(|Query(params)| params)
                .unwrap_or_default();
            let handle = params.get("handle").cloned();
            let tld = params.get("tld").map(String::as_str).unwrap_or_default();
            self.routing_keys(handle, tld, &pathname)
        } else {
            let handle = handle_from_hostname(&hostname);
            let tld = hostname.rsplit('.').next().unwrap_or_default();
            self.routing_keys(handle, tld, &pathname)
        };

        let ip = extract_client_ip(headers, socket_ip, &self.config);
        let geo = geo_from_headers(headers)
            .or_else(|| {
                self.geoip
                    .as_ref()
                    .filter(|service| service.is_enabled())
                    .map(|service| service.lookup(ip))
            })
            .unwrap_or_default();

        let user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        let agent = user_agent::parse(user_agent.as_deref().unwrap_or_default());
        let platform = Platform::detect(
            agent.os.as_deref(),
            agent.browser.as_deref(),
            user_agent.as_deref().unwrap_or_default(),
        );
        let is_bot = agent.is_bot;

        VisitorContext {
            keys,
            origin,
            pathname,
            request_url,
            is_local,
            ip: Some(ip),
            geo,
            user_agent,
            agent,
            platform,
            is_bot,
        }
    }

    fn routing_keys(&self, handle: Option<String>, tld: &str, pathname: &str) -> RoutingKeys {
        let handle = handle.filter(|h| !h.is_empty());
        let app_routing = self
            .config
            .app_routing_suffixes
            .iter()
            .any(|suffix| suffix.eq_ignore_ascii_case(tld));

        if app_routing {
            let mut segments = pathname
                .split('/')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string);

            RoutingKeys {
                handle,
                slug: None,
                app: segments.next(),
                app_route: segments.next(),
                app_id: segments.next(),
            }
        } else {
            let has_path = pathname.split('/').any(|segment| !segment.is_empty());
            RoutingKeys {
                handle,
                slug: has_path.then(|| pathname.to_string()),
                ..Default::default()
            }
        }
    }

    fn protocol(&self, uri: &Uri, headers: &HeaderMap) -> String {
        let forwarded = (self.config.trusted_proxy_mode != TrustedProxyMode::None)
            .then(|| first_header_value(headers, "x-forwarded-proto"))
            .flatten();

        forwarded
            .or_else(|| uri.scheme_str().map(str::to_string))
            .unwrap_or_else(|| "http".to_string())
            .to_lowercase()
    }

    fn host(&self, uri: &Uri, headers: &HeaderMap) -> String {
        let forwarded = (self.config.trusted_proxy_mode != TrustedProxyMode::None)
            .then(|| first_header_value(headers, "x-forwarded-host"))
            .flatten();

        forwarded
            .or_else(|| first_header_value(headers, header::HOST.as_str()))
            .or_else(|| uri.authority().map(|a| a.as_str().to_string()))
            .unwrap_or_else(|| "localhost".to_string())
    }
}

fn first_header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    host.split(':').next().unwrap_or(host)
}

/// Tenant handle: the first label of a hostname with at least three labels.
fn handle_from_hostname(hostname: &str) -> Option<String> {
    if hostname.parse::<IpAddr>().is_ok() {
        return None;
    }

    let labels: Vec<&str> = hostname.split('.').collect();
    if labels.len() < 3 {
        return None;
    }

    match labels[0] {
        "" | "www" => None,
        handle => Some(handle.to_string()),
    }
}

fn geo_from_headers(headers: &HeaderMap) -> Option<VisitorGeo> {
    let read = |name: &str| first_header_value(headers, name);

    GEO_HEADER_SETS.iter().find_map(|set| {
        let latitude = read(set.latitude);
        let longitude = read(set.longitude);
        let city = read(set.city);
        let region = read(set.region);
        let country = read(set.country);

        if latitude.is_none() && longitude.is_none() && country.is_none() {
            return None;
        }

        Some(VisitorGeo {
            latitude: latitude.map(IntoCoordinate::into_coordinate),
            longitude: longitude.map(IntoCoordinate::into_coordinate),
            city,
            region,
            country,
        })
    })
}
