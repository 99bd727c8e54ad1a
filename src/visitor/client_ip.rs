//! Client IP extraction from HTTP headers with trust validation
//!
//! - Cloudflare mode reads `CF-Connecting-IP`
//! - Standard mode reads RFC 7239 `Forwarded`, then `X-Forwarded-For`,
//!   walking the chain right to left past trusted proxies
//! - Otherwise the socket peer address is used

use axum::http::HeaderMap;
use ipnet::IpNet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tracing::warn;

use crate::config::{TrustedProxyMode, VisitorConfig};

/// Extract the client IP address according to the trust configuration
pub fn extract_client_ip(headers: &HeaderMap, socket_addr: IpAddr, config: &VisitorConfig) -> IpAddr {
    match config.trusted_proxy_mode {
        TrustedProxyMode::Cloudflare => extract_cloudflare_ip(headers).unwrap_or_else(|| {
            warn!("CF-Connecting-IP header missing in Cloudflare mode, using socket address");
            socket_addr
        }),
        TrustedProxyMode::Standard => extract_standard_ip(headers, config).unwrap_or(socket_addr),
        TrustedProxyMode::None => socket_addr,
    }
}

fn extract_cloudflare_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("cf-connecting-ip")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
}

fn extract_standard_ip(headers: &HeaderMap, config: &VisitorConfig) -> Option<IpAddr> {
    let chain = forwarded_chain(headers).or_else(|| x_forwarded_for_chain(headers))?;
    select_from_chain(&chain, config)
}

/// `for=` addresses from the RFC 7239 Forwarded header, client first
fn forwarded_chain(headers: &HeaderMap) -> Option<Vec<IpAddr>> {
    let forwarded = headers.get("forwarded")?.to_str().ok()?;

    let chain: Vec<IpAddr> = forwarded
        .split(',')
        .flat_map(|element| element.split(';'))
        .filter_map(|param| {
            let param = param.trim();
            let (name, value) = param.split_once('=')?;
            name.eq_ignore_ascii_case("for").then(|| parse_forwarded_node(value))?
        })
        .collect();

    (!chain.is_empty()).then_some(chain)
}

/// Parse a Forwarded node: `192.0.2.60`, `"192.0.2.60:4711"` or `"[2001:db8::1]:4711"`
fn parse_forwarded_node(value: &str) -> Option<IpAddr> {
    let value = value.trim().trim_matches('"');

    if let Some(rest) = value.strip_prefix('[') {
        return rest.split(']').next()?.parse().ok();
    }
    if let Ok(ip) = value.parse::<IpAddr>() {
        return Some(ip);
    }

    value.rsplit_once(':')?.0.parse::<Ipv4Addr>().ok().map(IpAddr::V4)
}

fn x_forwarded_for_chain(headers: &HeaderMap) -> Option<Vec<IpAddr>> {
    let xff = headers.get("x-forwarded-for")?.to_str().ok()?;

    let chain: Vec<IpAddr> = xff
        .split(',')
        .filter_map(|s| s.trim().parse::<IpAddr>().ok())
        .collect();

    (!chain.is_empty()).then_some(chain)
}

/// Pick the client address from a proxy chain ordered client first.
fn select_from_chain(chain: &[IpAddr], config: &VisitorConfig) -> Option<IpAddr> {
    // Skip a fixed number of trusted hops from the right
    if let Some(num_trusted) = config.num_trusted_proxies {
        if chain.len() > num_trusted {
            return Some(chain[chain.len() - num_trusted - 1]);
        }
        return chain.first().copied();
    }

    // First address from the right that is not a trusted proxy
    if !config.trusted_proxies.is_empty() {
        return chain
            .iter()
            .rev()
            .find(|ip| !is_trusted(ip, &config.trusted_proxies))
            .or_else(|| chain.first())
            .copied();
    }

    chain.last().copied()
}

fn is_trusted(ip: &IpAddr, trusted: &[IpNet]) -> bool {
    trusted.iter().any(|net| net.contains(ip))
}

/// Anonymize an IP address by truncating to network prefix
///
/// - IPv4: Truncate to /24 (zero last octet)
/// - IPv6: Truncate to /48 (zero last 80 bits)
pub fn anonymize_ip(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V4(addr) => {
            let octets = addr.octets();
            IpAddr::V4(Ipv4Addr::new(octets[0], octets[1], octets[2], 0))
        }
        IpAddr::V6(addr) => {
            let segments = addr.segments();
            IpAddr::V6(Ipv6Addr::new(
                segments[0],
                segments[1],
                segments[2],
                0,
                0,
                0,
                0,
                0,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn create_config(mode: TrustedProxyMode) -> VisitorConfig {
        VisitorConfig {
            trusted_proxy_mode: mode,
            ..VisitorConfig::default()
        }
    }

    fn socket() -> IpAddr {
        "192.168.1.1".parse().unwrap()
    }

    #[test]
    fn test_extract_client_ip_none_mode() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.1"));
        let config = create_config(TrustedProxyMode::None);

        assert_eq!(extract_client_ip(&headers, socket(), &config), socket());
    }

    #[test]
    fn test_extract_cloudflare_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("cf-connecting-ip", HeaderValue::from_static("203.0.113.1"));
        let config = create_config(TrustedProxyMode::Cloudflare);

        let result = extract_client_ip(&headers, socket(), &config);
        assert_eq!(result, "203.0.113.1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_cloudflare_mode_falls_back_to_socket() {
        let config = create_config(TrustedProxyMode::Cloudflare);
        assert_eq!(extract_client_ip(&HeaderMap::new(), socket(), &config), socket());
    }

    #[test]
    fn test_extract_x_forwarded_for_basic() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.1, 198.51.100.1"),
        );
        let config = create_config(TrustedProxyMode::Standard);

        let result = extract_client_ip(&headers, socket(), &config);
        // Rightmost IP in the absence of trust configuration
        assert_eq!(result, "198.51.100.1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_x_forwarded_for_skips_trusted_cidrs() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.2, 10.0.0.3"),
        );
        let config = VisitorConfig {
            trusted_proxy_mode: TrustedProxyMode::Standard,
            trusted_proxies: vec!["10.0.0.0/8".parse().unwrap()],
            ..VisitorConfig::default()
        };

        let result = extract_client_ip(&headers, socket(), &config);
        assert_eq!(result, "203.0.113.7".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_x_forwarded_for_trusted_hop_count() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("198.51.100.9, 203.0.113.7, 10.0.0.3"),
        );
        let config = VisitorConfig {
            trusted_proxy_mode: TrustedProxyMode::Standard,
            num_trusted_proxies: Some(1),
            ..VisitorConfig::default()
        };

        let result = extract_client_ip(&headers, socket(), &config);
        assert_eq!(result, "203.0.113.7".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_forwarded_header_with_port_and_ipv6() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "forwarded",
            HeaderValue::from_static("for=\"[2001:db8::1]:4711\";proto=https, for=192.0.2.43:80"),
        );
        let config = VisitorConfig {
            trusted_proxy_mode: TrustedProxyMode::Standard,
            trusted_proxies: vec!["192.0.2.0/24".parse().unwrap()],
            ..VisitorConfig::default()
        };

        let result = extract_client_ip(&headers, socket(), &config);
        assert_eq!(result, "2001:db8::1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_anonymize_ipv4() {
        let ip: IpAddr = "192.168.1.100".parse().unwrap();
        assert_eq!(anonymize_ip(ip), "192.168.1.0".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_anonymize_ipv6() {
        let ip: IpAddr = "2001:db8::1234:5678".parse().unwrap();
        assert_eq!(anonymize_ip(ip), "2001:db8::".parse::<IpAddr>().unwrap());
    }
}
