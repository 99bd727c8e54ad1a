use anyhow::{bail, Context};
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub regions: RegionsConfig,
    pub redirect_server: ServerConfig,
    pub redirect: RedirectConfig,
    pub visitor: VisitorConfig,
    pub analytics: AnalyticsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub max_connections: u32,
    /// Create the links table on every eager region at startup
    pub init_schema: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
}

impl DatabaseBackend {
    fn from_url(url: &str) -> Self {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            DatabaseBackend::Postgres
        } else {
            DatabaseBackend::Sqlite
        }
    }
}

/// The static set of regional replicas
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionsConfig {
    pub default_region: String,
    pub regions: Vec<RegionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    pub name: String,
    pub url: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Defer connecting until the first lookup routed to this region
    #[serde(default)]
    pub lazy: bool,
    /// Backend for this region; inferred from the URL scheme when absent
    #[serde(default)]
    pub backend: Option<DatabaseBackend>,
}

impl RegionConfig {
    pub fn backend(&self) -> DatabaseBackend {
        self.backend
            .unwrap_or_else(|| DatabaseBackend::from_url(&self.url))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MobileRedirectMode {
    /// Always redirect to the flat destination URL
    #[default]
    Flat,
    /// Prefer native app schemes with a browser fallback
    AppScheme,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectConfig {
    /// Where tenant root requests (`acme.example.com/`) are sent
    pub landing_url: String,
    /// Optional HTML file served with 404 responses
    pub not_found_page: Option<String>,
    pub redirect_status: u16,
    pub lookup_timeout_ms: u64,
    /// First path segments that are never treated as links
    pub reserved_prefixes: Vec<String>,
    pub mobile_redirect: MobileRedirectMode,
    /// Intermediate open-app page, absolute or relative to the request origin
    pub open_app_url: String,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            landing_url: "https://example.com".to_string(),
            not_found_page: None,
            redirect_status: 307,
            lookup_timeout_ms: 1500,
            reserved_prefixes: default_reserved_prefixes(),
            mobile_redirect: MobileRedirectMode::Flat,
            open_app_url: "/_open".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustedProxyMode {
    /// Use the socket peer address only
    #[default]
    None,
    /// Trust `CF-Connecting-IP`
    Cloudflare,
    /// Trust `Forwarded` / `X-Forwarded-For` subject to the proxy list or hop count
    Standard,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitorConfig {
    pub trusted_proxy_mode: TrustedProxyMode,
    #[serde(default)]
    pub trusted_proxies: Vec<IpNet>,
    pub num_trusted_proxies: Option<usize>,
    /// Domain suffixes whose paths carry `app/route/id` instead of a flat slug
    pub app_routing_suffixes: Vec<String>,
    pub geoip_city_db_path: Option<String>,
}

impl Default for VisitorConfig {
    fn default() -> Self {
        Self {
            trusted_proxy_mode: TrustedProxyMode::None,
            trusted_proxies: Vec::new(),
            num_trusted_proxies: None,
            app_routing_suffixes: vec!["link".to_string()],
            geoip_city_db_path: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    pub enabled: bool,
    pub endpoint: Option<String>,
    pub timeout_ms: u64,
    pub ip_anonymization: bool,
}

fn default_reserved_prefixes() -> Vec<String> {
    ["api", "_static", "_open", "health", "favicon.ico", "robots.txt"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

/// A positive duration in milliseconds; zero or garbage falls back to `default`.
fn env_millis(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .unwrap_or(default)
}

fn env_list(name: &str) -> Option<Vec<String>> {
    std::env::var(name).ok().map(|v| {
        v.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
}

fn parse_trusted_proxy(value: &str) -> anyhow::Result<IpNet> {
    if let Ok(ip) = value.parse::<IpAddr>() {
        return Ok(IpNet::from(ip));
    }
    value
        .parse::<IpNet>()
        .with_context(|| format!("invalid entry in TRUSTED_PROXIES: '{value}'"))
}

/// Load the region set from a TOML/JSON/YAML file
pub fn load_regions_file(path: &str) -> anyhow::Result<RegionsConfig> {
    let settings = ::config::Config::builder()
        .add_source(::config::File::with_name(path))
        .build()
        .with_context(|| format!("failed to read regions file '{path}'"))?;

    settings
        .try_deserialize::<RegionsConfig>()
        .with_context(|| format!("invalid regions file '{path}'"))
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend_str =
            std::env::var("DATABASE_BACKEND").unwrap_or_else(|_| "sqlite".to_string());

        let backend = match backend_str.to_lowercase().as_str() {
            "postgres" | "postgresql" => DatabaseBackend::Postgres,
            _ => DatabaseBackend::Sqlite,
        };

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()
            .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?;

        let regions = match std::env::var("REGIONS_FILE") {
            Ok(path) => load_regions_file(&path)?,
            Err(_) => {
                let database_url = std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://./linkedge.db?mode=rwc".to_string());
                let name = std::env::var("DEFAULT_REGION").unwrap_or_else(|_| "local".to_string());

                RegionsConfig {
                    default_region: name.clone(),
                    regions: vec![RegionConfig {
                        name,
                        url: database_url,
                        latitude: 0.0,
                        longitude: 0.0,
                        lazy: false,
                        backend: Some(backend),
                    }],
                }
            }
        };

        let redirect_host =
            std::env::var("REDIRECT_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let redirect_port = std::env::var("REDIRECT_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()?;

        let redirect_defaults = RedirectConfig::default();

        let redirect_status = std::env::var("REDIRECT_STATUS")
            .ok()
            .map(|v| v.parse::<u16>())
            .transpose()
            .context("REDIRECT_STATUS must be a number")?
            .unwrap_or(redirect_defaults.redirect_status);
        if !matches!(redirect_status, 301 | 302 | 303 | 307 | 308) {
            bail!("REDIRECT_STATUS must be one of 301, 302, 303, 307, 308 (got {redirect_status})");
        }

        let lookup_timeout_ms =
            env_millis("LOOKUP_TIMEOUT_MS", redirect_defaults.lookup_timeout_ms);

        let mobile_redirect = match std::env::var("MOBILE_REDIRECT")
            .unwrap_or_else(|_| "flat".to_string())
            .to_lowercase()
            .as_str()
        {
            "flat" => MobileRedirectMode::Flat,
            "app-scheme" | "app_scheme" => MobileRedirectMode::AppScheme,
            other => {
                tracing::warn!(
                    "Unknown MOBILE_REDIRECT '{other}', falling back to 'flat'. Supported values: flat, app-scheme"
                );
                MobileRedirectMode::Flat
            }
        };

        let redirect = RedirectConfig {
            landing_url: std::env::var("LANDING_URL").unwrap_or(redirect_defaults.landing_url),
            not_found_page: std::env::var("NOT_FOUND_PAGE").ok(),
            redirect_status,
            lookup_timeout_ms,
            reserved_prefixes: env_list("RESERVED_PREFIXES")
                .unwrap_or(redirect_defaults.reserved_prefixes),
            mobile_redirect,
            open_app_url: std::env::var("OPEN_APP_URL").unwrap_or(redirect_defaults.open_app_url),
        };

        let trusted_proxy_mode = match std::env::var("TRUSTED_PROXY_MODE")
            .unwrap_or_else(|_| "none".to_string())
            .to_lowercase()
            .as_str()
        {
            "none" => TrustedProxyMode::None,
            "cloudflare" => TrustedProxyMode::Cloudflare,
            "standard" => TrustedProxyMode::Standard,
            other => {
                tracing::warn!(
                    "Unknown TRUSTED_PROXY_MODE '{other}', falling back to 'none'. Supported values: none, cloudflare, standard"
                );
                TrustedProxyMode::None
            }
        };

        let trusted_proxies = env_list("TRUSTED_PROXIES")
            .unwrap_or_default()
            .iter()
            .map(|entry| parse_trusted_proxy(entry))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let num_trusted_proxies = std::env::var("NUM_TRUSTED_PROXIES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok());

        let visitor = VisitorConfig {
            trusted_proxy_mode,
            trusted_proxies,
            num_trusted_proxies,
            app_routing_suffixes: env_list("APP_ROUTING_SUFFIXES")
                .unwrap_or_else(|| VisitorConfig::default().app_routing_suffixes),
            geoip_city_db_path: std::env::var("GEOIP_CITY_DB_PATH").ok(),
        };

        let analytics_endpoint = std::env::var("ANALYTICS_ENDPOINT").ok();
        let analytics = AnalyticsConfig {
            enabled: env_flag("ANALYTICS_ENABLED", analytics_endpoint.is_some()),
            endpoint: analytics_endpoint,
            timeout_ms: env_millis("ANALYTICS_TIMEOUT_MS", 3000),
            ip_anonymization: env_flag("ANALYTICS_IP_ANONYMIZATION", false),
        };

        if analytics.enabled && analytics.endpoint.is_none() {
            bail!("ANALYTICS_ENDPOINT must be set when ANALYTICS_ENABLED=true");
        }

        Ok(Config {
            database: DatabaseConfig {
                backend,
                max_connections,
                init_schema: env_flag("DATABASE_INIT_SCHEMA", false),
            },
            regions,
            redirect_server: ServerConfig {
                host: redirect_host,
                port: redirect_port,
            },
            redirect,
            visitor,
            analytics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_backend_inferred_from_url() {
        let region = RegionConfig {
            name: "iad".to_string(),
            url: "postgres://replica.iad/links".to_string(),
            latitude: 38.9,
            longitude: -77.0,
            lazy: true,
            backend: None,
        };
        assert_eq!(region.backend(), DatabaseBackend::Postgres);

        let region = RegionConfig {
            url: "sqlite::memory:".to_string(),
            ..region
        };
        assert_eq!(region.backend(), DatabaseBackend::Sqlite);
    }

    #[test]
    fn test_zero_millis_falls_back_to_default() {
        let name = "LINKEDGE_TEST_TIMEOUT_MS";

        std::env::set_var(name, "0");
        assert_eq!(env_millis(name, 3000), 3000);

        std::env::set_var(name, "soon");
        assert_eq!(env_millis(name, 3000), 3000);

        std::env::set_var(name, "250");
        assert_eq!(env_millis(name, 3000), 250);

        std::env::remove_var(name);
        assert_eq!(env_millis(name, 3000), 3000);
    }

    #[test]
    fn test_trusted_proxy_entries() {
        assert_eq!(
            parse_trusted_proxy("10.0.0.1").unwrap(),
            "10.0.0.1/32".parse::<IpNet>().unwrap()
        );
        assert_eq!(
            parse_trusted_proxy("10.0.0.0/8").unwrap(),
            "10.0.0.0/8".parse::<IpNet>().unwrap()
        );
        assert!(parse_trusted_proxy("proxy.internal").is_err());
    }

    #[test]
    fn test_load_regions_file() {
        let path = std::env::temp_dir().join(format!("linkedge-regions-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
default_region = "iad"

[[regions]]
name = "iad"
url = "postgres://replica.iad/links"
latitude = 38.9
longitude = -77.0
lazy = true

[[regions]]
name = "fra"
url = "sqlite::memory:"
latitude = 50.1
longitude = 8.7
"#
        )
        .unwrap();

        let regions = load_regions_file(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(regions.default_region, "iad");
        assert_eq!(regions.regions.len(), 2);
        assert!(regions.regions[0].lazy);
        assert!(!regions.regions[1].lazy);
        assert_eq!(regions.regions[1].backend(), DatabaseBackend::Sqlite);
    }
}
