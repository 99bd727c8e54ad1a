use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use linkedge::config::Config;
use linkedge::region::{connect_regions, GeoPoint};
use linkedge::resolver::LinkResolver;
use linkedge::storage::LinkKey;

#[derive(Parser)]
#[command(name = "linkedge-admin")]
#[command(about = "Linkedge region and link inspection CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the links table on every configured region
    Init,
    /// Show which region serves the given coordinates
    Closest {
        #[arg(long, allow_hyphen_values = true)]
        latitude: String,
        #[arg(long, allow_hyphen_values = true)]
        longitude: String,
    },
    /// Resolve a link key against the region that would serve it
    Lookup {
        #[arg(long)]
        handle: String,
        /// Path of a flat link, e.g. `/promo`
        #[arg(long)]
        slug: Option<String>,
        #[arg(long)]
        app: Option<String>,
        #[arg(long)]
        app_route: Option<String>,
        #[arg(long)]
        app_id: Option<String>,
        /// Visitor latitude used to pick the region
        #[arg(long, allow_hyphen_values = true)]
        latitude: Option<f64>,
        /// Visitor longitude used to pick the region
        #[arg(long, allow_hyphen_values = true)]
        longitude: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let regions = connect_regions(&config.regions, config.database.max_connections).await?;

    match cli.command {
        Commands::Init => {
            for endpoint in regions.iter() {
                endpoint.store.init().await?;
                println!("✓ Initialized schema in region '{}'", endpoint.name);
            }
        }
        Commands::Closest {
            latitude,
            longitude,
        } => {
            let endpoint = regions.closest(longitude.as_str(), latitude.as_str());
            let visitor = GeoPoint::lenient(longitude.as_str(), latitude.as_str());
            println!(
                "{} ({:.0} km away)",
                endpoint.name,
                visitor.distance_km(&endpoint.location)
            );
        }
        Commands::Lookup {
            handle,
            slug,
            app,
            app_route,
            app_id,
            latitude,
            longitude,
        } => {
            let key = match (slug, app) {
                (Some(slug), None) => LinkKey::for_slug(&handle, &slug),
                (None, app) => LinkKey::for_app_route(
                    &handle,
                    app.as_deref(),
                    app_route.as_deref(),
                    app_id.as_deref(),
                ),
                (Some(_), Some(_)) => bail!("--slug cannot be combined with --app"),
            };

            let geo = latitude
                .zip(longitude)
                .map(|(latitude, longitude)| GeoPoint::new(latitude, longitude));
            let endpoint = regions.route(geo, false);
            let resolver = LinkResolver::new(Duration::from_millis(
                config.redirect.lookup_timeout_ms,
            ));

            println!("Key: {}", key);
            println!("Region: {}", endpoint.name);
            match resolver.resolve(endpoint, &key).await? {
                Some(link) => println!("{}", serde_json::to_string_pretty(&link)?),
                None => println!("⚠ No usable link for this key"),
            }
        }
    }

    Ok(())
}
