//! Census feed demo runner.
//!
//! ## Purpose
//! Exercises the full client path end to end: log in, infer the facility
//! selection for the role, refresh the census feed once and print the rows.
//!
//! ## Intended use
//! Useful for development and smoke-testing against a live backend. The
//! `census` CLI (in `crates/census-cli`) offers the individual operations.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use census_client::{
    infer_selection_at_login, login, ApiClient, CensusFeed, ClientConfig, FacilityContext,
    FacilityPreferences,
};
use census_core::event_summary;

/// Main entry point for the census feed runner.
///
/// # Environment Variables
/// - `CENSUS_API_BASE_URL`: backend base URL (default: "http://localhost:3000/api")
/// - `CENSUS_EMAIL` / `CENSUS_PASSWORD`: login credentials
/// - `CENSUS_STATE_FILE`: facility preference file (default: "census_state.json")
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration is invalid, or
/// - login is rejected.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("census_client=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let base_url =
        std::env::var("CENSUS_API_BASE_URL").unwrap_or_else(|_| "http://localhost:3000/api".into());
    let email = std::env::var("CENSUS_EMAIL")
        .map_err(|_| anyhow::anyhow!("CENSUS_EMAIL is not set"))?;
    let password = std::env::var("CENSUS_PASSWORD")
        .map_err(|_| anyhow::anyhow!("CENSUS_PASSWORD is not set"))?;
    let state_file =
        std::env::var("CENSUS_STATE_FILE").unwrap_or_else(|_| "census_state.json".into());

    tracing::info!("-- Starting census feed against {}", base_url);

    let config = ClientConfig::new(base_url)?;
    let preferences = FacilityPreferences::new(state_file);
    let scope = Arc::new(FacilityContext::new());

    let api = Arc::new(ApiClient::new(config));
    api.attach_scope(scope.clone());

    let response = login(&api, &email, &password).await?;
    tracing::info!("logged in: {}", response.message);

    infer_selection_at_login(&api, &preferences, &scope).await;
    match scope.selected() {
        Some(facility_id) => tracing::info!("scoped to facility {facility_id}"),
        None => tracing::info!("showing all facilities"),
    }

    let feed = CensusFeed::new(api, scope);
    let snapshot = feed.refresh().await;

    if snapshot.has_error() {
        tracing::warn!("some census data failed to load; showing what arrived");
    }

    if snapshot.rows.is_empty() {
        println!("No records found.");
        return Ok(());
    }

    println!("Census ({} rows):", snapshot.rows.len());
    for row in &snapshot.rows {
        let insurance = snapshot
            .coverage_for(row.patient.patient_id)
            .and_then(|c| c.payers.first())
            .map(|p| p.payer_name.clone())
            .unwrap_or_else(|| "No Insurance".into());
        println!(
            "  {} | {} | {} | {}",
            row.patient.display_name(),
            row.event.event_type,
            insurance,
            row.event.timestamp,
        );
    }

    if !snapshot.live_updates.is_empty() {
        println!("\nLive updates:");
        for event in &snapshot.live_updates {
            println!("  {}", event_summary(event));
        }
    }

    Ok(())
}
