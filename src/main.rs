use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use linkedge::analytics::{AnalyticsReporter, HttpEventSink};
use linkedge::config::{Config, TrustedProxyMode};
use linkedge::redirect::{create_redirect_router, RedirectState};
use linkedge::region::connect_regions;
use linkedge::visitor::{GeoIpService, VisitorContextExtractor};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    // Connect regional replicas
    let regions = connect_regions(&config.regions, config.database.max_connections).await?;
    info!(
        "🌍 {} region(s) configured, default '{}'",
        regions.len(),
        regions.default_region().name
    );

    if config.database.init_schema {
        let lazy: Vec<&str> = config
            .regions
            .regions
            .iter()
            .filter(|r| r.lazy)
            .map(|r| r.name.as_str())
            .collect();
        for endpoint in regions.iter().filter(|e| !lazy.contains(&e.name.as_str())) {
            info!(region = %endpoint.name, "Initializing database schema...");
            endpoint.store.init().await?;
        }
    }

    // Initialize GeoIP fallback
    let geoip = match config.visitor.geoip_city_db_path.as_deref() {
        Some(path) => {
            let service = GeoIpService::new(Some(path))?;
            info!("📍 GeoIP City database loaded from {}", path);
            Some(Arc::new(service))
        }
        None => {
            info!("📍 GeoIP disabled, relying on edge geolocation headers");
            None
        }
    };

    // Initialize analytics delivery
    let reporter = match (config.analytics.enabled, config.analytics.endpoint.as_deref()) {
        (true, Some(endpoint)) => {
            let timeout = Duration::from_millis(config.analytics.timeout_ms);
            let sink = HttpEventSink::new(endpoint, timeout)?;
            info!("📊 Analytics events are sent to {}", endpoint);
            AnalyticsReporter::new(Arc::new(sink), timeout, config.analytics.ip_anonymization)
        }
        _ => {
            info!("📊 Analytics reporting is disabled");
            AnalyticsReporter::disabled()
        }
    };

    if config.visitor.trusted_proxy_mode == TrustedProxyMode::None {
        warn!("TRUSTED_PROXY_MODE=none: forwarded headers are ignored, the socket peer is the client");
    }

    let extractor = VisitorContextExtractor::new(config.visitor.clone(), geoip);
    let state = RedirectState::new(Arc::new(regions), &config.redirect, extractor, reporter)?;
    let redirect_router = create_redirect_router(Arc::new(state));

    // Start redirect server
    let redirect_addr = format!(
        "{}:{}",
        config.redirect_server.host, config.redirect_server.port
    );
    let redirect_listener = tokio::net::TcpListener::bind(&redirect_addr).await?;
    info!("🚀 Redirect server listening on http://{}", redirect_addr);

    axum::serve(
        redirect_listener,
        redirect_router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
