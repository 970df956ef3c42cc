use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use campus_listings::listings::{FilterSpec, LocationMode};
use campus_listings::location::{PositionProvider, StaticPositionProvider};
use campus_listings::models::CategoryFilter;
use campus_listings::{AppState, Config};

/// Browse campus marketplace listings near you
#[derive(Debug, Parser)]
#[command(name = "campus-listings", version)]
struct Cli {
    /// Category bucket (rideshare, pick-drop, jobs, marketplace, accommodation, currency-exchange)
    #[arg(long)]
    category: Option<CategoryFilter>,

    /// Only listings whose city contains this text (overrides GPS filtering)
    #[arg(long)]
    city: Option<String>,

    /// Search radius in kilometers
    #[arg(long)]
    radius: Option<f64>,

    #[arg(long)]
    min_price: Option<f64>,

    #[arg(long)]
    max_price: Option<f64>,

    /// Text to look for in titles and descriptions
    #[arg(long)]
    search: Option<String>,

    /// Current latitude, used as the device position
    #[arg(long, requires = "lng", allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Current longitude, used as the device position
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lng: Option<f64>,

    /// Resolve the location even if a cached one is still fresh
    #[arg(long)]
    refresh_location: bool,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

impl Cli {
    /// An explicit position always replaces the cached one
    fn wants_fresh_location(&self) -> bool {
        self.lat.is_some() || self.refresh_location
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let provider: Arc<dyn PositionProvider> = match (cli.lat, cli.lng) {
        (Some(lat), Some(lng)) => Arc::new(StaticPositionProvider::at(lat, lng)),
        _ => Arc::new(StaticPositionProvider::unsupported()),
    };
    let state = AppState::from_config(&config, provider)?;

    state.location.init().await;
    if cli.wants_fresh_location() {
        if let Err(e) = state.location.update_location(true).await {
            warn!(error = %e, "Location unavailable, falling back to city filtering");
        }
    }
    if let Some(radius) = cli.radius {
        state.location.update_radius(radius).await;
    }

    if let Err(e) = state.listings.refresh().await {
        warn!(error = %e, "Could not fetch listings");
    }

    let spec = FilterSpec {
        category: cli.category,
        city: cli.city,
        radius_km: None,
        search: cli.search,
        price_min: cli.min_price,
        price_max: cli.max_price,
    };
    let outcome = state.visible_listings(&spec).await;
    let location = state.location.snapshot().await;

    match outcome.mode {
        LocationMode::Nearby => info!(
            "Showing nearby results ({}km radius around {})",
            location.radius_km,
            location.address.as_deref().unwrap_or("your location")
        ),
        LocationMode::City => info!("Showing results matching the city filter"),
        LocationMode::Unfiltered => info!("Showing all locations"),
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome.listings)?);
        return Ok(());
    }

    if outcome.listings.is_empty() {
        println!("No posts found. Try adjusting your filters or expanding your search radius.");
        return Ok(());
    }

    for (i, view) in outcome.listings.iter().enumerate() {
        let listing = &view.listing;
        println!("{}. {} [{}]", i + 1, listing.title, listing.category.label());
        match &listing.price {
            Some(price) => println!("   {} {} ({})", price.amount, price.currency, price.unit),
            None => println!("   No price"),
        }
        match view.display_distance() {
            Some(km) => println!("   {} • {}km away", listing.location.city, km),
            None => println!("   {}", listing.location.city),
        }
        if let Some(path) = listing.detail_path() {
            println!("   {}", path);
        }
        println!();
    }

    Ok(())
}
